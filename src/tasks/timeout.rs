//! Bounds an inner task by a duration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::reactive::Variable;
use crate::tasks::countdown::Countdown;
use crate::tasks::delay::DurationSource;
use crate::tasks::runner::TaskRef;
use crate::tasks::spec::TaskSpec;
use crate::tasks::task::Task;

/// Runs `inner` and a countdown; finishes on whichever ends first.
pub struct TimeoutTask {
    inner: TaskRef,
    duration: DurationSource,
    countdown: Countdown,
    inner_done: Variable<bool>,
    name: String,
}

impl TimeoutTask {
    pub fn new(inner: TaskRef, duration: Duration) -> Self {
        Self::from_source(inner, move || duration)
    }

    /// The limit is read from `source` each time the task starts.
    pub fn from_source<F>(inner: TaskRef, source: F) -> Self
    where
        F: Fn() -> Duration + Send + Sync + 'static,
    {
        let name = format!("{}.timeout", inner.name());
        Self {
            inner,
            duration: Arc::new(source),
            countdown: Countdown::new(),
            inner_done: Variable::new(false),
            name,
        }
    }

    pub fn into_spec(self) -> TaskSpec {
        let finish = self.countdown.elapsed().or(&self.inner_done);
        let required = self.inner.required().clone();
        TaskSpec::new(self)
            .requires_all(&required)
            .with_frequency(0)
            .finish_exactly(finish)
    }
}

#[async_trait]
impl Task for TimeoutTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), TaskError> {
        self.inner_done.set(false);
        self.countdown.arm((self.duration)());
        let done = self.inner_done.clone();
        self.inner
            .start(move || {
                done.set(true);
            })
            .await;
        Ok(())
    }

    async fn dispose(&self) -> Result<(), TaskError> {
        self.countdown.disarm().await;
        self.inner.stop().await
    }
}
