//! Registry of every resource known to the runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::resource::{ResourceHooks, ResourceRef};
use crate::error::RuntimeError;

/// Ordered, append-only collection of resources.
///
/// Registration closes when the dispatcher activates; the order of registration
/// is the order of idle-task rescans and hook broadcasts.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: Mutex<Vec<ResourceRef>>,
    sealed: AtomicBool,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resource`. Re-adding the same resource is ignored.
    pub fn add(&self, resource: ResourceRef) -> Result<(), RuntimeError> {
        if self.is_sealed() {
            return Err(RuntimeError::RegistrationClosed {
                resource: resource.name().to_string(),
            });
        }
        let mut resources = self.resources.lock();
        if resources.iter().any(|r| Arc::ptr_eq(r, &resource)) {
            warn!(resource = resource.name(), "resource registered twice; ignoring");
            return Ok(());
        }
        debug!(resource = resource.name(), "resource registered");
        resources.push(resource);
        Ok(())
    }

    /// Closes registration and freezes every resource's idle task.
    pub(crate) fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
        for resource in self.list() {
            resource.seal();
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Snapshot in registration order.
    pub fn list(&self) -> Vec<ResourceRef> {
        self.resources.lock().clone()
    }

    pub fn get(&self, name: &str) -> Option<ResourceRef> {
        self.resources
            .lock()
            .iter()
            .find(|r| r.name() == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.resources.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.lock().is_empty()
    }

    /// Calls `hook` on every resource, in registration order.
    ///
    /// The registry lock is not held while hooks run.
    pub(crate) fn broadcast(&self, label: &'static str, hook: impl Fn(&dyn ResourceHooks)) {
        for resource in self.list() {
            debug!(resource = resource.name(), hook = label, "running resource hook");
            hook(resource.hooks());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Resource;

    #[test]
    fn test_registration_closes_on_seal() {
        let registry = ResourceRegistry::new();
        registry.add(Resource::new("drive")).unwrap();
        registry.seal();

        let err = registry.add(Resource::new("arm")).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::RegistrationClosed {
                resource: "arm".into()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_add_is_ignored() {
        let registry = ResourceRegistry::new();
        let drive = Resource::new("drive");
        registry.add(Arc::clone(&drive)).unwrap();
        registry.add(Arc::clone(&drive)).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("drive").is_some());
        assert!(registry.get("arm").is_none());
    }

    #[test]
    fn test_broadcast_runs_in_registration_order() {
        struct Named(&'static str, Arc<Mutex<Vec<&'static str>>>);
        impl ResourceHooks for Named {
            fn late_init(&self) {
                self.1.lock().push(self.0);
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ResourceRegistry::new();
        for name in ["drive", "arm", "claw"] {
            registry
                .add(Resource::with_hooks(name, Named(name, Arc::clone(&log))))
                .unwrap();
        }
        registry.broadcast("late_init", |h| h.late_init());
        assert_eq!(*log.lock(), vec!["drive", "arm", "claw"]);
    }
}
