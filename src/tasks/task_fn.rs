//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn() -> Fut` used as the `execute` hook,
//! producing a fresh future per tick. Shared state lives in whatever the closure
//! captures (typically `Arc<...>` or a [`Variable`](crate::Variable)).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use taskdispatch::{TaskError, TaskFn, TaskSpec};
//!
//! let ticks = Arc::new(AtomicU32::new(0));
//! let t = Arc::clone(&ticks);
//! let task = TaskSpec::new(TaskFn::new("count", move || {
//!     let t = Arc::clone(&t);
//!     async move {
//!         t.fetch_add(1, Ordering::Relaxed);
//!         Ok::<_, TaskError>(())
//!     }
//! }))
//! .build();
//!
//! assert_eq!(task.name(), "count");
//! ```

use std::borrow::Cow;
use std::future::Future;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::spec::TaskSpec;
use crate::tasks::task::Task;

/// Function-backed task; the closure is the `execute` hook.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> TaskFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    /// Shortcut for `TaskSpec::new(TaskFn::new(name, f))`.
    pub fn spec(name: impl Into<Cow<'static, str>>, f: F) -> TaskSpec {
        TaskSpec::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<(), TaskError> {
        (self.f)().await
    }
}
