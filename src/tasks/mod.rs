//! # Tasks.
//!
//! - [`Task`] lifecycle hooks of a task body
//! - [`TaskSpec`] body + required resources + finish condition + frequency
//! - [`TaskRunner`] / [`TaskRef`] built task that owns its lifecycle
//! - [`FinishCondition`] OR-composable "done" condition
//!
//! Leaf and decorator bodies: [`TaskFn`], [`InstantTask`], [`EmptyTask`],
//! [`Timed`], [`DelayTask`], [`ConditionalTask`], [`TimeoutTask`],
//! [`WithExitTask`], [`WaitForTask`]. Composites: [`GroupBuilder`],
//! [`sequential`], [`parallel`], [`StateGroupBuilder`].

mod conditional;
mod countdown;
mod delay;
mod empty;
mod ext;
mod finish;
mod group;
mod instant;
mod runner;
mod spec;
mod state_group;
mod task;
mod task_fn;
mod timed;
mod timeout;
mod wait_for;
mod with_exit;

pub use conditional::ConditionalTask;
pub use delay::{DelayTask, DurationSource};
pub use empty::EmptyTask;
pub use ext::TaskExt;
pub use finish::FinishCondition;
pub use group::{GroupBuilder, GroupKind, GroupTask, parallel, sequential};
pub use instant::InstantTask;
pub use runner::{Lifecycle, TaskId, TaskRef, TaskRunner};
pub use spec::{DEFAULT_FREQUENCY, TaskSpec};
pub use state_group::StateGroupBuilder;
pub use task::Task;
pub use task_fn::TaskFn;
pub use timed::{Timed, TimedTask};
pub use timeout::TimeoutTask;
pub use wait_for::WaitForTask;
pub use with_exit::WithExitTask;
