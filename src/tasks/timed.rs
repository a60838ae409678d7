//! # Tasks that need the elapsed time between ticks.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::TaskError;
use crate::tasks::task::Task;

/// Like [`Task`], but `execute` receives the time since the previous tick.
#[async_trait]
pub trait TimedTask: Send + Sync + 'static {
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    async fn initialize(&self) -> Result<(), TaskError> {
        Ok(())
    }

    /// `delta` is measured from the previous tick, or from the end of `initialize`
    /// for the first tick of a run.
    async fn timed_execute(&self, delta: Duration) -> Result<(), TaskError>;

    async fn dispose(&self) -> Result<(), TaskError> {
        Ok(())
    }
}

/// Adapts a [`TimedTask`] into a [`Task`].
pub struct Timed<B> {
    inner: B,
    last: Mutex<Option<Instant>>,
}

impl<B: TimedTask> Timed<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: TimedTask> Task for Timed<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn initialize(&self) -> Result<(), TaskError> {
        self.inner.initialize().await?;
        *self.last.lock() = Some(Instant::now());
        Ok(())
    }

    async fn execute(&self) -> Result<(), TaskError> {
        let now = Instant::now();
        let delta = self
            .last
            .lock()
            .replace(now)
            .map_or(Duration::ZERO, |prev| now.saturating_duration_since(prev));
        self.inner.timed_execute(delta).await
    }

    async fn dispose(&self) -> Result<(), TaskError> {
        *self.last.lock() = None;
        self.inner.dispose().await
    }
}
