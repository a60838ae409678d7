//! # Composite tasks.
//!
//! A group runs its members through a private actor loop, spawned in
//! `initialize` and torn down in `dispose`:
//!
//! ```text
//! initialize ──► spawn loop ──► enqueue Start(first) / Start(every member)
//!
//! loop (one event at a time):
//!   Start(t) ──► running += t ──► t.start(cb: enqueue Stop(t))
//!   Stop(t)  ──► t ∉ running? ignore
//!            ──► t.stop(), running -= t
//!                 ├─ Sequential: start next, or finish when none left
//!                 └─ Parallel:   finish when running is empty
//!
//! dispose ──► cancel loop ──► join ──► stop members still running
//! ```
//!
//! ## Rules
//! - Parallel members must require pairwise-disjoint resources; this is checked
//!   at construction and reported as [`RuntimeError::ResourceConflict`].
//! - A member fault finishes the group and is returned from `dispose`.
//! - An empty group finishes immediately.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::select;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{RuntimeError, TaskError};
use crate::reactive::Variable;
use crate::resources::ResourceSet;
use crate::tasks::runner::{TaskId, TaskRef};
use crate::tasks::spec::TaskSpec;
use crate::tasks::task::Task;

/// How a group schedules its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// One member at a time, in order.
    Sequential,
    /// Every member at once.
    Parallel,
}

enum GroupEvent {
    Start(TaskRef),
    Stop(TaskId),
}

struct GroupLoop {
    token: CancellationToken,
    join: JoinHandle<Vec<TaskRef>>,
}

/// Body of a composite task.
pub struct GroupTask {
    kind: GroupKind,
    name: String,
    members: Vec<TaskRef>,
    finished: Variable<bool>,
    fault: Arc<Mutex<Option<TaskError>>>,
    running: Mutex<Option<GroupLoop>>,
}

impl GroupTask {
    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn members(&self) -> &[TaskRef] {
        &self.members
    }
}

/// Builder for sequential and parallel groups.
///
/// ```
/// use std::time::Duration;
/// use taskdispatch::{DelayTask, GroupBuilder, GroupKind};
///
/// let group = GroupBuilder::new(GroupKind::Sequential)
///     .named("score")
///     .push(DelayTask::new(Duration::from_millis(10)).into_spec().build())
///     .push(DelayTask::new(Duration::from_millis(20)).into_spec().build())
///     .build()
///     .unwrap();
/// assert_eq!(group.name(), "score");
/// ```
pub struct GroupBuilder {
    kind: GroupKind,
    name: Option<String>,
    members: Vec<TaskRef>,
}

impl GroupBuilder {
    pub fn new(kind: GroupKind) -> Self {
        Self {
            kind,
            name: None,
            members: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn push(mut self, task: TaskRef) -> Self {
        self.members.push(task);
        self
    }

    pub fn extend(mut self, tasks: impl IntoIterator<Item = TaskRef>) -> Self {
        self.members.extend(tasks);
        self
    }

    /// Validates the members and returns the group's spec.
    pub fn into_spec(self) -> Result<TaskSpec, RuntimeError> {
        if self.kind == GroupKind::Parallel {
            check_disjoint(&self.members)?;
        }
        Ok(self.assemble())
    }

    pub fn build(self) -> Result<TaskRef, RuntimeError> {
        Ok(self.into_spec()?.build())
    }

    fn assemble(self) -> TaskSpec {
        let mut required = ResourceSet::new();
        for member in &self.members {
            required.extend(member.required());
        }
        let name = self.name.unwrap_or_else(|| default_name(self.kind, &self.members));
        let finished = Variable::new(false);
        let body = GroupTask {
            kind: self.kind,
            name,
            members: self.members,
            finished: finished.clone(),
            fault: Arc::new(Mutex::new(None)),
            running: Mutex::new(None),
        };

        TaskSpec::new(body)
            .requires_all(&required)
            .with_frequency(0)
            .finish_exactly(finished)
    }
}

/// Runs `tasks` one after another.
pub fn sequential(tasks: impl IntoIterator<Item = TaskRef>) -> TaskRef {
    GroupBuilder::new(GroupKind::Sequential)
        .extend(tasks)
        .assemble()
        .build()
}

/// Runs `tasks` at once; fails if two of them require the same resource.
pub fn parallel(tasks: impl IntoIterator<Item = TaskRef>) -> Result<TaskRef, RuntimeError> {
    GroupBuilder::new(GroupKind::Parallel).extend(tasks).build()
}

fn check_disjoint(members: &[TaskRef]) -> Result<(), RuntimeError> {
    for (i, first) in members.iter().enumerate() {
        for second in &members[i + 1..] {
            if let Some(resource) = first.required().first_shared(second.required()) {
                return Err(RuntimeError::ResourceConflict {
                    first: first.name().to_string(),
                    second: second.name().to_string(),
                    resource: resource.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn default_name(kind: GroupKind, members: &[TaskRef]) -> String {
    let names: Vec<&str> = members.iter().map(|m| m.name()).collect();
    let prefix = match kind {
        GroupKind::Sequential => "sequential",
        GroupKind::Parallel => "parallel",
    };
    format!("{prefix}[{}]", names.join(", "))
}

#[async_trait]
impl Task for GroupTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), TaskError> {
        *self.fault.lock() = None;
        if self.members.is_empty() {
            self.finished.set(true);
            return Ok(());
        }
        self.finished.set(false);

        let (tx, rx) = unbounded_channel();
        let mut pending: VecDeque<TaskRef> = self.members.iter().cloned().collect();
        let initial: Vec<TaskRef> = match self.kind {
            GroupKind::Sequential => pending.pop_front().into_iter().collect(),
            GroupKind::Parallel => pending.drain(..).collect(),
        };
        for task in initial {
            let _ = tx.send(GroupEvent::Start(task));
        }

        let token = CancellationToken::new();
        let worker = GroupWorker {
            kind: self.kind,
            name: self.name.clone(),
            pending,
            running: Vec::new(),
            finished: self.finished.clone(),
            fault: Arc::clone(&self.fault),
            tx,
        };
        let join = tokio::spawn(worker.run(rx, token.clone()));

        if let Some(previous) = self.running.lock().replace(GroupLoop { token, join }) {
            warn!(group = %self.name, "group initialized twice; cancelling stale loop");
            previous.token.cancel();
        }
        Ok(())
    }

    async fn dispose(&self) -> Result<(), TaskError> {
        let running = self.running.lock().take();
        let mut leftovers = Vec::new();
        if let Some(GroupLoop { token, join }) = running {
            token.cancel();
            match join.await {
                Ok(tasks) => leftovers = tasks,
                Err(err) => warn!(group = %self.name, error = %err, "group loop died"),
            }
        }

        let mut outcome = self.fault.lock().take().map_or(Ok(()), Err);
        for task in leftovers {
            debug!(group = %self.name, task = task.name(), "stopping member");
            outcome = outcome.and(task.stop().await);
        }
        outcome
    }
}

impl fmt::Debug for GroupTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupTask")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("members", &self.members.len())
            .finish()
    }
}

struct GroupWorker {
    kind: GroupKind,
    name: String,
    pending: VecDeque<TaskRef>,
    running: Vec<TaskRef>,
    finished: Variable<bool>,
    fault: Arc<Mutex<Option<TaskError>>>,
    tx: UnboundedSender<GroupEvent>,
}

impl GroupWorker {
    /// Processes events until cancelled; returns the members still running.
    async fn run(
        mut self,
        mut rx: UnboundedReceiver<GroupEvent>,
        token: CancellationToken,
    ) -> Vec<TaskRef> {
        loop {
            let event = select! {
                biased;
                _ = token.cancelled() => break,
                ev = rx.recv() => match ev {
                    Some(ev) => ev,
                    None => break,
                },
            };
            match event {
                GroupEvent::Start(task) => self.start(task).await,
                GroupEvent::Stop(id) => self.stop(id).await,
            }
        }
        self.running
    }

    async fn start(&mut self, task: TaskRef) {
        debug!(group = %self.name, task = task.name(), "starting member");
        self.running.push(Arc::clone(&task));
        let tx = self.tx.clone();
        let id = task.id();
        task.start(move || {
            let _ = tx.send(GroupEvent::Stop(id));
        })
        .await;
    }

    async fn stop(&mut self, id: TaskId) {
        let Some(pos) = self.running.iter().position(|t| t.id() == id) else {
            return;
        };
        let task = self.running.remove(pos);
        debug!(group = %self.name, task = task.name(), "member finished");

        if let Err(err) = task.stop().await {
            warn!(group = %self.name, task = task.name(), error = %err, "member failed; finishing group");
            self.fault.lock().get_or_insert(err);
            self.pending.clear();
            self.finished.set(true);
            return;
        }

        match self.kind {
            GroupKind::Sequential => match self.pending.pop_front() {
                Some(next) => {
                    let _ = self.tx.send(GroupEvent::Start(next));
                }
                None => {
                    self.finished.set(true);
                }
            },
            GroupKind::Parallel => {
                if self.running.is_empty() {
                    self.finished.set(true);
                }
            }
        }
    }
}
