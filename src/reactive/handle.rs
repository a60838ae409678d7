//! Disposable registration handles for observers.

use std::fmt;
use std::sync::Weak;

/// Implemented by every observable node so a handle can unregister itself
/// without knowing the node's value type.
pub(crate) trait Detach: Send + Sync {
    /// Removes the observer registered under `id` (no-op if already gone).
    fn detach(&self, id: u64);

    /// Returns true while the observer `id` is still registered.
    fn is_attached(&self, id: u64) -> bool;
}

/// Placeholder target for handles that were never attached.
struct Inert;

impl Detach for Inert {
    fn detach(&self, _id: u64) {}

    fn is_attached(&self, _id: u64) -> bool {
        false
    }
}

/// Handle to an observer registered on an [`Observable`](crate::Observable).
///
/// Disposing stops all further notifications to that observer; notifications
/// already delivered are unaffected. Dropping the handle does **not** dispose
/// the observer: registrations are persistent until explicitly disposed.
///
/// Handles are cheap to clone; every clone refers to the same registration.
#[derive(Clone)]
pub struct ObserverHandle {
    target: Weak<dyn Detach>,
    id: u64,
}

impl ObserverHandle {
    pub(crate) fn new(target: Weak<dyn Detach>, id: u64) -> Self {
        Self { target, id }
    }

    /// A handle that refers to nothing; disposing it is a no-op.
    pub fn detached() -> Self {
        let target: Weak<dyn Detach> = Weak::<Inert>::new();
        Self { target, id: 0 }
    }

    /// Unregisters the observer. Idempotent.
    pub fn dispose(&self) {
        if let Some(target) = self.target.upgrade() {
            target.detach(self.id);
        }
    }

    /// Returns true if the observer is no longer registered.
    pub fn is_disposed(&self) -> bool {
        match self.target.upgrade() {
            Some(target) => !target.is_attached(self.id),
            None => true,
        }
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
