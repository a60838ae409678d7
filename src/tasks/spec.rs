//! # Task specification.
//!
//! [`TaskSpec`] bundles a task body with everything the runtime needs to schedule
//! it: the resources it requires, its finish condition and its execution frequency.
//! [`TaskSpec::build`] freezes the spec into a [`TaskRef`].
//!
//! ## Rules
//! - Required resources are immutable once built.
//! - The finish condition starts as "never"; `finish_when` ORs conditions in.
//! - Frequency defaults to [`DEFAULT_FREQUENCY`]; `0` disables periodic `execute`.

use std::sync::Arc;

use crate::reactive::Observable;
use crate::resources::{Resource, ResourceSet};
use crate::tasks::finish::FinishCondition;
use crate::tasks::runner::{TaskRef, TaskRunner};
use crate::tasks::task::Task;

/// Execution frequency (Hz) used when none is configured.
pub const DEFAULT_FREQUENCY: u32 = 50;

/// Builder-style description of a task.
///
/// ## Example
/// ```
/// use taskdispatch::{Resource, TaskFn, TaskSpec, TaskError, Variable};
///
/// let drive = Resource::new("drive");
/// let at_target = Variable::new(false);
///
/// let task = TaskSpec::new(TaskFn::new("drive-forward", || async { Ok::<(), TaskError>(()) }))
///     .requires(&drive)
///     .finish_when(&at_target)
///     .with_frequency(20)
///     .build();
///
/// assert_eq!(task.name(), "drive-forward");
/// assert_eq!(task.frequency(), 20);
/// assert!(task.required().contains(drive.id()));
/// ```
#[derive(Clone)]
pub struct TaskSpec {
    body: Arc<dyn Task>,
    name: Option<String>,
    required: ResourceSet,
    finish: FinishCondition,
    frequency: Option<u32>,
}

impl TaskSpec {
    /// Creates a spec around `body`.
    pub fn new(body: impl Task) -> Self {
        Self::from_arc(Arc::new(body))
    }

    /// Creates a spec around an already shared body.
    pub fn from_arc(body: Arc<dyn Task>) -> Self {
        Self {
            body,
            name: None,
            required: ResourceSet::new(),
            finish: FinishCondition::default(),
            frequency: None,
        }
    }

    /// Overrides the body's name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds `resource` to the required set.
    pub fn requires(mut self, resource: &Resource) -> Self {
        self.required.extend(&resource.as_set());
        self
    }

    /// Adds every resource of `set` to the required set.
    pub fn requires_all(mut self, set: &ResourceSet) -> Self {
        self.required.extend(set);
        self
    }

    /// Sets the execution frequency in Hz (`0` disables `execute`).
    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// ORs `condition` into the finish condition.
    pub fn finish_when(mut self, condition: impl Into<Observable<bool>>) -> Self {
        self.finish += condition;
        self
    }

    /// Replaces the finish condition.
    pub fn finish_exactly(mut self, condition: impl Into<Observable<bool>>) -> Self {
        self.finish.set(condition);
        self
    }

    pub fn finish_condition(&self) -> &FinishCondition {
        &self.finish
    }

    pub fn finish_condition_mut(&mut self) -> &mut FinishCondition {
        &mut self.finish
    }

    pub fn required(&self) -> &ResourceSet {
        &self.required
    }

    /// The configured frequency, if any.
    pub fn frequency(&self) -> Option<u32> {
        self.frequency
    }

    /// Effective name (override or the body's own name).
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.body.name())
    }

    /// Fills the frequency if the spec left it unset.
    pub(crate) fn or_frequency(mut self, frequency: u32) -> Self {
        self.frequency.get_or_insert(frequency);
        self
    }

    /// Freezes the spec into a runnable task.
    pub fn build(self) -> TaskRef {
        let name = self.name().to_string();
        Arc::new(TaskRunner::new(
            name,
            self.body,
            self.required,
            self.finish.observable(),
            self.frequency.unwrap_or(DEFAULT_FREQUENCY),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::EmptyTask;

    #[test]
    fn test_defaults() {
        let task = TaskSpec::new(EmptyTask).build();
        assert_eq!(task.name(), "EmptyTask");
        assert_eq!(task.frequency(), DEFAULT_FREQUENCY);
        assert!(task.required().is_empty());
        assert!(!task.finish_condition().get());
    }

    #[test]
    fn test_or_frequency_keeps_explicit_value() {
        let spec = TaskSpec::new(EmptyTask).with_frequency(0).or_frequency(25);
        assert_eq!(spec.frequency(), Some(0));
        let spec = TaskSpec::new(EmptyTask).or_frequency(25);
        assert_eq!(spec.frequency(), Some(25));
    }

    #[test]
    fn test_requires_accumulates() {
        let a = Resource::new("a");
        let b = Resource::new("b");
        let spec = TaskSpec::new(EmptyTask).requires(&a).requires(&b).requires(&a);
        assert_eq!(spec.required().len(), 2);
    }
}
