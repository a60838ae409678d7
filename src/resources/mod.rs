//! # Resources.
//!
//! - [`Resource`] / [`ResourceRef`] exclusive handle with an idle task
//! - [`ResourceHooks`] lifecycle hooks broadcast by the runtime
//! - [`ResourceSet`] / [`ResourceId`] what a task requires
//! - [`ResourceRegistry`] ordered registry, sealed on activation

mod registry;
mod resource;
mod set;

pub use registry::ResourceRegistry;
pub use resource::{Resource, ResourceHooks, ResourceRef};
pub use set::{ResourceId, ResourceSet};
