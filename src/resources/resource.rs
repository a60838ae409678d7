//! # Exclusive resources.
//!
//! A [`Resource`] is an exclusive handle that at most one task may drive at a
//! time. It is created once at composition time and lives for the whole run.
//! Whenever no task owns it, the dispatcher runs its **idle task**.
//!
//! ## Rules
//! - The idle task can be replaced only until the resource is sealed (dispatcher activation).
//! - The idle task must require the resource itself.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::set::{ResourceId, ResourceSet};
use crate::error::RuntimeError;
use crate::tasks::{EmptyTask, TaskRef};

/// Hooks the runtime invokes on every registered resource.
///
/// All methods default to no-ops. They are called in registration order.
pub trait ResourceHooks: Send + Sync + 'static {
    /// Deferred initialization, run once while the runtime activates.
    fn late_init(&self) {}

    /// Run on entering the autonomous mode.
    fn auto_reset(&self) {}

    /// Run on entering the teleoperated mode.
    fn teleop_reset(&self) {}

    /// Run on entering the disabled mode; should bring outputs to a safe zero.
    fn zero_outputs(&self) {}
}

struct NoHooks;

impl ResourceHooks for NoHooks {}

/// Shared handle to a [`Resource`].
pub type ResourceRef = Arc<Resource>;

/// An exclusive resource with a default idle task.
pub struct Resource {
    id: ResourceId,
    name: Arc<str>,
    idle: RwLock<TaskRef>,
    hooks: Arc<dyn ResourceHooks>,
    sealed: AtomicBool,
}

impl Resource {
    /// Creates a resource without hooks.
    pub fn new(name: impl Into<Arc<str>>) -> ResourceRef {
        Self::with_hooks(name, NoHooks)
    }

    /// Creates a resource whose lifecycle hooks are forwarded to `hooks`.
    ///
    /// # Example
    /// ```
    /// use taskdispatch::{Resource, ResourceHooks};
    ///
    /// struct Elevator;
    /// impl ResourceHooks for Elevator {
    ///     fn zero_outputs(&self) { /* stop the motor */ }
    /// }
    ///
    /// let elevator = Resource::with_hooks("elevator", Elevator);
    /// assert_eq!(elevator.name(), "elevator");
    /// assert!(elevator.idle_task().required().contains(elevator.id()));
    /// ```
    pub fn with_hooks(name: impl Into<Arc<str>>, hooks: impl ResourceHooks) -> ResourceRef {
        let id = ResourceId::next();
        let name: Arc<str> = name.into();
        let own = ResourceSet::single(id, Arc::clone(&name));
        let idle = EmptyTask::spec(&own)
            .named(format!("{name}.idle"))
            .build();

        Arc::new(Self {
            id,
            name,
            idle: RwLock::new(idle),
            hooks: Arc::new(hooks),
            sealed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A set holding just this resource.
    pub fn as_set(&self) -> ResourceSet {
        ResourceSet::single(self.id, Arc::clone(&self.name))
    }

    /// The task run while nothing else owns this resource.
    pub fn idle_task(&self) -> TaskRef {
        Arc::clone(&self.idle.read())
    }

    /// Replaces the idle task.
    ///
    /// Fails with [`RuntimeError::AlreadyActivated`] once the dispatcher is active, and
    /// with [`RuntimeError::IdleTaskMismatch`] if `task` does not require this resource.
    pub fn set_idle_task(&self, task: TaskRef) -> Result<(), RuntimeError> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(RuntimeError::AlreadyActivated);
        }
        if !task.required().contains(self.id) {
            return Err(RuntimeError::IdleTaskMismatch {
                task: task.name().to_string(),
                resource: self.name.to_string(),
            });
        }
        *self.idle.write() = task;
        Ok(())
    }

    pub fn hooks(&self) -> &dyn ResourceHooks {
        self.hooks.as_ref()
    }

    pub(crate) fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("idle", &self.idle.read().name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_idle_task_requires_resource() {
        let arm = Resource::new("arm");
        let idle = arm.idle_task();
        assert_eq!(idle.name(), "arm.idle");
        assert!(idle.required().contains(arm.id()));
        assert_eq!(idle.required().len(), 1);
    }

    #[test]
    fn test_idle_task_must_require_resource() {
        let arm = Resource::new("arm");
        let claw = Resource::new("claw");
        let err = arm.set_idle_task(claw.idle_task()).unwrap_err();
        assert_eq!(err.as_label(), "runtime_idle_task_mismatch");

        let hold = EmptyTask::spec(&arm.as_set()).named("hold-arm").build();
        assert!(arm.set_idle_task(hold).is_ok());
        assert_eq!(arm.idle_task().name(), "hold-arm");
    }

    #[test]
    fn test_sealed_resource_rejects_idle_change() {
        let arm = Resource::new("arm");
        arm.seal();
        let hold = EmptyTask::spec(&arm.as_set()).build();
        assert_eq!(arm.set_idle_task(hold), Err(RuntimeError::AlreadyActivated));
    }
}
