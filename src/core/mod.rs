//! Runtime core: configuration, dispatch and the shared context.
//!
//! - [`config`]: global settings and their defaults;
//! - [`dispatcher`]: the resource-arbitrating dispatch loop;
//! - [`runtime`]: context object tying registry, dispatcher, bus and modes together;
//! - [`builder`]: wires a [`Runtime`] with its subscribers.

mod builder;
mod config;
mod dispatcher;
mod runtime;

pub use builder::RuntimeBuilder;
pub use config::Config;
pub use dispatcher::{Allocation, Dispatcher};
pub use runtime::Runtime;
