//! Waits for a duration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::countdown::Countdown;
use crate::tasks::spec::TaskSpec;
use crate::tasks::task::Task;

/// Duration evaluated at every start.
pub type DurationSource = Arc<dyn Fn() -> Duration + Send + Sync>;

/// Finishes once a duration has elapsed since `initialize`.
///
/// ```
/// use std::time::Duration;
/// use taskdispatch::DelayTask;
///
/// let wait = DelayTask::new(Duration::from_millis(500)).into_spec().build();
/// assert_eq!(wait.name(), "delay");
/// assert_eq!(wait.frequency(), 0);
/// ```
pub struct DelayTask {
    duration: DurationSource,
    countdown: Countdown,
}

impl DelayTask {
    pub fn new(duration: Duration) -> Self {
        Self::from_source(move || duration)
    }

    /// The duration is read from `source` each time the task starts.
    pub fn from_source<F>(source: F) -> Self
    where
        F: Fn() -> Duration + Send + Sync + 'static,
    {
        Self {
            duration: Arc::new(source),
            countdown: Countdown::new(),
        }
    }

    pub fn into_spec(self) -> TaskSpec {
        let elapsed = self.countdown.elapsed();
        TaskSpec::new(self).with_frequency(0).finish_exactly(elapsed)
    }
}

#[async_trait]
impl Task for DelayTask {
    fn name(&self) -> &str {
        "delay"
    }

    async fn initialize(&self) -> Result<(), TaskError> {
        self.countdown.arm((self.duration)());
        Ok(())
    }

    async fn dispose(&self) -> Result<(), TaskError> {
        self.countdown.disarm().await;
        Ok(())
    }
}

impl fmt::Debug for DelayTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayTask").finish_non_exhaustive()
    }
}
