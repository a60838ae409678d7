//! Waits until a condition holds.

use crate::reactive::Observable;
use crate::tasks::empty::EmptyTask;
use crate::tasks::spec::TaskSpec;

/// A task with no body whose finish condition is exactly the given condition.
///
/// ```
/// use taskdispatch::{Variable, WaitForTask};
///
/// let ready = Variable::new(false);
/// let wait = WaitForTask::until(&ready).build();
/// assert!(!wait.finish_condition().get());
/// ready.set(true);
/// assert!(wait.finish_condition().get());
/// ```
pub struct WaitForTask;

impl WaitForTask {
    pub fn until(condition: impl Into<Observable<bool>>) -> TaskSpec {
        TaskSpec::new(EmptyTask)
            .named("wait_for")
            .with_frequency(0)
            .finish_exactly(condition)
    }

    /// Polls `source` at `frequency` Hz.
    pub fn polling<F>(frequency: u32, source: F) -> TaskSpec
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::until(Observable::sampled(frequency, source))
    }
}
