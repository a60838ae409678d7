//! # Branching task.
//!
//! [`ConditionalTask`] evaluates a boolean source once, in `initialize`, and runs
//! the matching branch. With no matching branch it finishes immediately.
//!
//! ## Rules
//! - Required resources are the union of both branches, so the dispatcher
//!   preempts for either branch up front.
//! - The chosen branch is stopped in `dispose`; its fault is returned from there.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::TaskError;
use crate::reactive::{Observable, Variable};
use crate::resources::ResourceSet;
use crate::tasks::runner::TaskRef;
use crate::tasks::spec::TaskSpec;
use crate::tasks::task::Task;

type Condition = Arc<dyn Fn() -> bool + Send + Sync>;

/// Runs `on_true` or `on_false` depending on a condition sampled at start.
///
/// ```
/// use taskdispatch::{ConditionalTask, DelayTask, Variable};
/// use std::time::Duration;
///
/// let has_piece = Variable::new(true);
/// let score = DelayTask::new(Duration::from_millis(200)).into_spec().build();
///
/// let branch = ConditionalTask::from_observable(&has_piece)
///     .when_true(score)
///     .into_spec()
///     .build();
/// assert_eq!(branch.name(), "conditional");
/// ```
pub struct ConditionalTask {
    condition: Condition,
    on_true: Option<TaskRef>,
    on_false: Option<TaskRef>,
    selected: Mutex<Option<TaskRef>>,
    done: Variable<bool>,
}

impl ConditionalTask {
    pub fn new<F>(condition: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            condition: Arc::new(condition),
            on_true: None,
            on_false: None,
            selected: Mutex::new(None),
            done: Variable::new(false),
        }
    }

    /// Uses the current value of `condition` at start.
    pub fn from_observable(condition: &Observable<bool>) -> Self {
        let condition = condition.clone();
        Self::new(move || condition.get())
    }

    pub fn when_true(mut self, task: TaskRef) -> Self {
        self.on_true = Some(task);
        self
    }

    pub fn when_false(mut self, task: TaskRef) -> Self {
        self.on_false = Some(task);
        self
    }

    pub fn into_spec(self) -> TaskSpec {
        let mut required = ResourceSet::new();
        for branch in self.on_true.iter().chain(self.on_false.iter()) {
            required.extend(branch.required());
        }
        let done = self.done.observable();
        TaskSpec::new(self)
            .requires_all(&required)
            .with_frequency(0)
            .finish_exactly(done)
    }
}

#[async_trait]
impl Task for ConditionalTask {
    fn name(&self) -> &str {
        "conditional"
    }

    async fn initialize(&self) -> Result<(), TaskError> {
        self.done.set(false);
        let branch = if (self.condition)() {
            self.on_true.clone()
        } else {
            self.on_false.clone()
        };
        *self.selected.lock() = branch.clone();

        match branch {
            Some(task) => {
                let done = self.done.clone();
                task.start(move || {
                    done.set(true);
                })
                .await;
            }
            None => {
                self.done.set(true);
            }
        }
        Ok(())
    }

    async fn dispose(&self) -> Result<(), TaskError> {
        let selected = self.selected.lock().take();
        match selected {
            Some(task) => task.stop().await,
            None => Ok(()),
        }
    }
}
