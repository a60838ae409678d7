//! # Task hooks.
//!
//! The [`Task`] trait is the body of a schedulable unit of work. The runtime never
//! drives a body directly: a [`TaskSpec`](crate::TaskSpec) wraps it together with
//! its required resources, finish condition and frequency, and
//! [`TaskRunner`](crate::TaskRunner) owns the lifecycle.
//!
//! ```text
//! start ─► initialize ─► [finish already true? ─► done]
//!                        └► execute every 1/frequency s ... ─► stop ─► dispose
//! ```

use async_trait::async_trait;

use crate::error::TaskError;

/// # Lifecycle hooks of a task body.
///
/// Every hook defaults to a no-op. Hooks should return promptly: `execute` runs
/// once per tick and the runner waits for an in-flight tick before `dispose`.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use taskdispatch::{Task, TaskError};
///
/// struct Intake;
///
/// #[async_trait]
/// impl Task for Intake {
///     fn name(&self) -> &str { "intake" }
///
///     async fn execute(&self) -> Result<(), TaskError> {
///         // drive the roller
///         Ok(())
///     }
///
///     async fn dispose(&self) -> Result<(), TaskError> {
///         // stop the roller
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Human-readable name used in logs and events.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Runs once per start, before any `execute`.
    async fn initialize(&self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Runs once per tick while the task is running.
    async fn execute(&self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Runs once per stop, after the periodic loop has ended.
    async fn dispose(&self) -> Result<(), TaskError> {
        Ok(())
    }
}
