//! Ends an inner task early on an external condition.

use async_trait::async_trait;

use crate::error::TaskError;
use crate::reactive::{Observable, Variable};
use crate::tasks::runner::TaskRef;
use crate::tasks::spec::TaskSpec;
use crate::tasks::task::Task;

/// Runs `inner`; finishes when it finishes or when `exit` becomes true.
pub struct WithExitTask {
    inner: TaskRef,
    exit: Observable<bool>,
    inner_done: Variable<bool>,
    name: String,
}

impl WithExitTask {
    pub fn new(inner: TaskRef, exit: impl Into<Observable<bool>>) -> Self {
        let name = format!("{}.with_exit", inner.name());
        Self {
            inner,
            exit: exit.into(),
            inner_done: Variable::new(false),
            name,
        }
    }

    pub fn into_spec(self) -> TaskSpec {
        let finish = self.exit.or(&self.inner_done);
        let required = self.inner.required().clone();
        TaskSpec::new(self)
            .requires_all(&required)
            .with_frequency(0)
            .finish_exactly(finish)
    }
}

#[async_trait]
impl Task for WithExitTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), TaskError> {
        self.inner_done.set(false);
        let done = self.inner_done.clone();
        self.inner
            .start(move || {
                done.set(true);
            })
            .await;
        Ok(())
    }

    async fn dispose(&self) -> Result<(), TaskError> {
        self.inner.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceSet;
    use crate::tasks::EmptyTask;

    #[tokio::test]
    async fn test_exit_condition_ends_task() {
        let inner = EmptyTask::spec(&ResourceSet::new()).build();
        let exit = Variable::new(false);
        let task = WithExitTask::new(inner.clone(), &exit).into_spec().build();

        task.start(|| {}).await;
        assert!(inner.is_running());
        assert!(!task.finish_condition().get());

        exit.set(true);
        assert!(task.finish_condition().get());
        task.stop().await.unwrap();
        assert!(!inner.is_running());
    }
}
