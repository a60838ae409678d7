//! Do-nothing task; the default idle task of every resource.

use async_trait::async_trait;

use crate::resources::ResourceSet;
use crate::tasks::spec::TaskSpec;
use crate::tasks::task::Task;

/// Holds its resources, never finishes, never executes.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyTask;

impl EmptyTask {
    /// Spec requiring `required`, with periodic execution disabled.
    pub fn spec(required: &ResourceSet) -> TaskSpec {
        TaskSpec::new(EmptyTask)
            .requires_all(required)
            .with_frequency(0)
    }
}

#[async_trait]
impl Task for EmptyTask {}
