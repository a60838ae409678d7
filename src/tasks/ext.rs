//! Decorator shortcuts on [`TaskRef`].

use std::time::Duration;

use crate::reactive::Observable;
use crate::tasks::runner::TaskRef;
use crate::tasks::timeout::TimeoutTask;
use crate::tasks::with_exit::WithExitTask;

/// Wraps a built task in a decorator.
///
/// ```
/// use std::time::Duration;
/// use taskdispatch::{DelayTask, TaskExt, Variable};
///
/// let abort = Variable::new(false);
/// let task = DelayTask::new(Duration::from_secs(3))
///     .into_spec()
///     .build()
///     .with_timeout(Duration::from_secs(1))
///     .with_exit(&abort);
/// assert_eq!(task.name(), "delay.timeout.with_exit");
/// ```
pub trait TaskExt {
    fn with_timeout(&self, duration: Duration) -> TaskRef;

    fn with_exit(&self, exit: impl Into<Observable<bool>>) -> TaskRef;
}

impl TaskExt for TaskRef {
    fn with_timeout(&self, duration: Duration) -> TaskRef {
        TimeoutTask::new(self.clone(), duration).into_spec().build()
    }

    fn with_exit(&self, exit: impl Into<Observable<bool>>) -> TaskRef {
        WithExitTask::new(self.clone(), exit).into_spec().build()
    }
}
