//! One-shot side effect.

use std::borrow::Cow;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::spec::TaskSpec;
use crate::tasks::task::Task;

/// Runs a closure once in `initialize` and is immediately finished.
///
/// ```
/// use taskdispatch::InstantTask;
///
/// let task = InstantTask::new("reset-gyro", || Ok(())).into_spec().build();
/// assert!(task.finish_condition().get());
/// assert_eq!(task.frequency(), 0);
/// ```
pub struct InstantTask<F> {
    name: Cow<'static, str>,
    action: F,
}

impl<F> InstantTask<F>
where
    F: Fn() -> Result<(), TaskError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<Cow<'static, str>>, action: F) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }

    /// Spec with a constant `true` finish condition and no periodic execution.
    pub fn into_spec(self) -> TaskSpec {
        TaskSpec::new(self).with_frequency(0).finish_exactly(true)
    }
}

#[async_trait]
impl<F> Task for InstantTask<F>
where
    F: Fn() -> Result<(), TaskError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), TaskError> {
        (self.action)()
    }
}
