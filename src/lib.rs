//! # taskdispatch
//!
//! **Taskdispatch** is a cooperative task-scheduling core for robot programs.
//!
//! Tasks declare the exclusive resources they need (drivetrain, arm, intake ...).
//! A single dispatcher arbitrates those resources: starting a task preempts
//! whatever currently holds one of its resources, and every resource nobody
//! holds falls back to its idle task. Tasks finish when a reactive condition
//! becomes true, and compose into sequential, parallel, timed and conditional
//! groups.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Variable / sampled source ──► Observable<bool> ──► finish condition
//!                                                        │
//!     ┌──────────────┐   ┌──────────────┐   ┌────────────▼─┐
//!     │   TaskSpec   │   │   TaskSpec   │   │   TaskSpec   │
//!     │ requires: A  │   │ requires: B  │   │ requires: A,B│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ build()          ▼                  ▼
//!        TaskRunner         TaskRunner         TaskRunner
//!            │                  │                  │
//!            └──────── start / stop (enqueue) ─────┘
//!                               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Runtime (context object)                                         │
//! │  - ResourceRegistry (registration order, sealed on activate)      │
//! │  - Dispatcher (serialized loop, allocation table, idle tasks)     │
//! │  - StateMachine<Mode> (enter/leave/transition/while callbacks)    │
//! │  - Bus + SubscriberSet (events fan-out)                           │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//!                    Bus (broadcast channel)
//!                                ▼
//!                        subscriber listener
//!                      ┌─────────┼─────────┐
//!                      ▼         ▼         ▼
//!                   worker1   worker2   workerN
//! ```
//!
//! ### Task lifecycle
//! ```text
//! Idle ─► Initializing ─► Running ─► Disposing ─► Idle
//!            │               │
//!            │               ├─ finish condition true  ─► on_finished()
//!            │               └─ execute() every 1/frequency s (cancellable)
//!            └─ finish condition already true ─► on_finished(), no execute loop
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                           |
//! |-------------------|---------------------------------------------------------------|----------------------------------------------|
//! | **Reactive**      | Observable values, variables, boolean combinators.            | [`Observable`], [`Variable`], [`all`], [`any`] |
//! | **Resources**     | Exclusive resources with idle tasks and lifecycle hooks.      | [`Resource`], [`ResourceHooks`]              |
//! | **Tasks**         | Lifecycle hooks, finish conditions, leaf and composite tasks. | [`Task`], [`TaskSpec`], [`TaskRef`]          |
//! | **Dispatch**      | Preemptive resource arbitration.                              | [`Dispatcher`], [`Runtime`]                  |
//! | **Modes**         | Mode state machine driving resource hooks.                    | [`StateMachine`], [`Mode`]                   |
//! | **Subscriber API**| Hook into dispatcher events.                                  | [`Subscribe`], [`Event`]                     |
//! | **Errors**        | Typed errors for composition and task hooks.                  | [`RuntimeError`], [`TaskError`]              |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskdispatch::{Config, DelayTask, Resource, RuntimeBuilder, TaskExt, sequential};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = RuntimeBuilder::new(Config::default()).build();
//!
//!     let arm = Resource::new("arm");
//!     runtime.add_resource(&arm)?;
//!
//!     let raise = runtime.task(DelayTask::new(Duration::from_millis(20)).into_spec().requires(&arm));
//!     let hold = runtime.task(DelayTask::new(Duration::from_millis(20)).into_spec().requires(&arm));
//!     let routine = sequential(vec![raise, hold]).with_timeout(Duration::from_secs(1));
//!
//!     runtime.activate()?;
//!     runtime.start(&routine)?;
//!     runtime.sync().await?;
//!     assert!(runtime.dispatcher().is_allocated(&routine));
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod machine;
mod periodic;
mod reactive;
mod resources;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::core::{Allocation, Config, Dispatcher, Runtime, RuntimeBuilder};
pub use error::{RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use machine::{MachineState, Mode, StateMachine};
pub use reactive::{Observable, ObserverHandle, Value, Variable, all, any};
pub use resources::{Resource, ResourceHooks, ResourceId, ResourceRef, ResourceRegistry, ResourceSet};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    ConditionalTask, DEFAULT_FREQUENCY, DelayTask, DurationSource, EmptyTask, FinishCondition,
    GroupBuilder, GroupKind, GroupTask, InstantTask, Lifecycle, StateGroupBuilder, Task, TaskExt,
    TaskFn, TaskId, TaskRef, TaskRunner, TaskSpec, Timed, TimedTask, TimeoutTask, WaitForTask,
    WithExitTask, parallel, sequential,
};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
