//! # Reactive values.
//!
//! Observable cells, settable variables, combinators and polled sources. Task
//! finish conditions and the mode state machine are both built on this layer.
//!
//! - [`Observable`] read-only shared cell with change notification
//! - [`Variable`] settable cell (derefs to `Observable`)
//! - [`ObserverHandle`] disposable observer registration
//! - [`all`] / [`any`] n-ary boolean combinators

mod combinators;
mod handle;
mod observable;
mod sampled;

pub use combinators::{all, any};
pub use handle::ObserverHandle;
pub use observable::{Observable, Value, Variable};
