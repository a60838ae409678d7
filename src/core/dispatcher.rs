//! # Dispatcher: arbitrates exclusive resources between tasks.
//!
//! The dispatcher is a single serialized actor. Callers enqueue commands; one
//! loop owns the allocation table and processes them in FIFO order.
//!
//! ## Architecture
//! ```text
//! start(t) / stop(t) / request_rescan() / sync()
//!        │
//!        ▼
//!   [unbounded queue] ──► dispatch loop
//!                            ├─► Start(t): stop every allocation that holds one of
//!                            │             t's resources (or t itself), allocate t,
//!                            │             t.start(cb: enqueue Stop(t))
//!                            ├─► Stop(t):  t allocated? t.stop(), deallocate
//!                            ├─► Rescan
//!                            ├─► Sync(ack)
//!                            └─► after every command:
//!                                  rescan → start idle task of each uncovered resource
//!                                  publish allocation snapshot
//!                                  ack Sync
//! ```
//!
//! ## Rules
//! - After each processed command the allocated resource sets are pairwise
//!   disjoint and every registered resource is covered.
//! - Preemption is last-writer-wins; displaced tasks are not queued.
//! - A preempted task is fully disposed before the new task initializes.
//! - `Stop` for a task that is not allocated is ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::select;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::resources::{ResourceId, ResourceRegistry, ResourceSet};
use crate::tasks::{TaskId, TaskRef};

/// A running task together with the resources it holds.
#[derive(Clone, Debug)]
pub struct Allocation {
    pub task: TaskRef,
    pub resources: ResourceSet,
}

enum Command {
    Start(TaskRef),
    Stop(TaskId),
    Rescan,
    Sync(oneshot::Sender<()>),
}

/// Handle to the dispatch loop.
pub struct Dispatcher {
    tx: UnboundedSender<Command>,
    rx: Mutex<Option<UnboundedReceiver<Command>>>,
    registry: Arc<ResourceRegistry>,
    bus: Bus,
    debug: bool,
    activated: AtomicBool,
    token: CancellationToken,
    snapshot: Arc<RwLock<Vec<Allocation>>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Creates an inactive dispatcher over `registry`.
    ///
    /// With `debug` set, tasks may be enqueued before activation; they are
    /// processed once the loop starts.
    pub fn new(registry: Arc<ResourceRegistry>, bus: Bus, debug: bool) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            registry,
            bus,
            debug,
            activated: AtomicBool::new(false),
            token: CancellationToken::new(),
            snapshot: Arc::new(RwLock::new(Vec::new())),
            join: Mutex::new(None),
        }
    }

    /// Seals the resource registry and starts the dispatch loop.
    ///
    /// The loop immediately starts the idle task of every registered resource.
    /// Must be called from within a tokio runtime.
    pub fn activate(&self) -> Result<(), RuntimeError> {
        let rx = self
            .rx
            .lock()
            .take()
            .ok_or(RuntimeError::AlreadyActivated)?;
        self.registry.seal();

        let worker = DispatchLoop {
            table: Vec::new(),
            registry: Arc::clone(&self.registry),
            bus: self.bus.clone(),
            tx: self.tx.clone(),
            snapshot: Arc::clone(&self.snapshot),
        };
        let join = tokio::spawn(worker.run(rx, self.token.clone()));
        *self.join.lock() = Some(join);
        self.activated.store(true, Ordering::Release);

        info!(resources = self.registry.len(), "dispatcher activated");
        self.bus.publish(Event::new(EventKind::DispatcherActivated));
        Ok(())
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Acquire)
    }

    /// Enqueues a start request.
    ///
    /// Fails with [`RuntimeError::NotActivated`] before [`activate`](Self::activate)
    /// unless the dispatcher runs in debug mode.
    pub fn start(&self, task: &TaskRef) -> Result<(), RuntimeError> {
        if !self.is_activated() && !self.debug {
            warn!(task = task.name(), "start rejected: dispatcher not activated");
            return Err(RuntimeError::NotActivated {
                task: task.name().to_string(),
            });
        }
        self.send(Command::Start(Arc::clone(task)))
    }

    /// Enqueues a stop request; a task that is not allocated is left alone.
    pub fn stop(&self, task: &TaskRef) -> Result<(), RuntimeError> {
        self.send(Command::Stop(task.id()))
    }

    /// Enqueues a rescan of uncovered resources.
    pub fn request_rescan(&self) -> Result<(), RuntimeError> {
        self.send(Command::Rescan)
    }

    /// Waits until every command enqueued before this call was processed.
    pub async fn sync(&self) -> Result<(), RuntimeError> {
        if !self.is_activated() {
            return Err(RuntimeError::NotActivated {
                task: "sync".to_string(),
            });
        }
        let (ack, done) = oneshot::channel();
        self.send(Command::Sync(ack))?;
        done.await.map_err(|_| RuntimeError::Closed)
    }

    /// Snapshot of the allocation table, in allocation order.
    pub fn allocations(&self) -> Vec<Allocation> {
        self.snapshot.read().clone()
    }

    /// Task currently holding `resource`, if any.
    pub fn owner_of(&self, resource: ResourceId) -> Option<TaskRef> {
        self.snapshot
            .read()
            .iter()
            .find(|a| a.resources.contains(resource))
            .map(|a| Arc::clone(&a.task))
    }

    pub fn is_allocated(&self, task: &TaskRef) -> bool {
        self.snapshot.read().iter().any(|a| a.task.id() == task.id())
    }

    /// Cancels the loop, which then stops every allocated task.
    ///
    /// Waits up to `grace` for the loop to finish.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.token.cancel();

        let join = self.join.lock().take();
        let Some(join) = join else {
            return Ok(());
        };

        match tokio::time::timeout(grace, join).await {
            Ok(joined) => {
                if let Err(err) = joined {
                    warn!(error = %err, "dispatch loop died");
                }
                info!("all tasks stopped within grace");
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck: Vec<String> = self
                    .allocations()
                    .iter()
                    .map(|a| a.task.name().to_string())
                    .collect();
                warn!(?stuck, ?grace, "grace exceeded during shutdown");
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded)
                        .with_grace(grace)
                        .with_reason(stuck.join(", ")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }

    fn send(&self, cmd: Command) -> Result<(), RuntimeError> {
        self.tx.send(cmd).map_err(|_| RuntimeError::Closed)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct DispatchLoop {
    table: Vec<Allocation>,
    registry: Arc<ResourceRegistry>,
    bus: Bus,
    tx: UnboundedSender<Command>,
    snapshot: Arc<RwLock<Vec<Allocation>>>,
}

impl DispatchLoop {
    async fn run(mut self, mut rx: UnboundedReceiver<Command>, token: CancellationToken) {
        self.settle().await;

        loop {
            let cmd = select! {
                biased;
                _ = token.cancelled() => break,
                cmd = rx.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => break,
                },
            };

            let ack = match cmd {
                Command::Start(task) => {
                    self.start_task(task).await;
                    None
                }
                Command::Stop(id) => {
                    self.stop_task(id).await;
                    None
                }
                Command::Rescan => None,
                Command::Sync(ack) => Some(ack),
            };
            self.settle().await;
            if let Some(ack) = ack {
                let _ = ack.send(());
            }
        }

        self.stop_all().await;
        debug!("dispatch loop exited");
    }

    async fn start_task(&mut self, task: TaskRef) {
        let mut victims = Vec::new();
        let mut i = 0;
        while i < self.table.len() {
            let held = &self.table[i];
            if held.task.id() == task.id() || held.resources.intersects(task.required()) {
                victims.push(self.table.remove(i));
            } else {
                i += 1;
            }
        }

        for victim in victims {
            if victim.task.id() == task.id() {
                debug!(task = task.name(), "restarting allocated task");
            } else {
                let contested = victim
                    .resources
                    .first_shared(task.required())
                    .unwrap_or_default()
                    .to_string();
                debug!(task = victim.task.name(), by = task.name(), resource = %contested, "preempting");
                self.bus.publish(
                    Event::new(EventKind::TaskPreempted)
                        .with_task(victim.task.name())
                        .with_reason(task.name())
                        .with_resource(contested),
                );
            }
            self.stop_allocation(victim).await;
        }

        self.table.push(Allocation {
            task: Arc::clone(&task),
            resources: task.required().clone(),
        });
        self.publish_snapshot();

        debug!(task = task.name(), "starting");
        self.bus.publish(
            Event::new(EventKind::TaskStarting)
                .with_task(task.name())
                .with_resource(task.required().names().join(", ")),
        );
        let tx = self.tx.clone();
        let id = task.id();
        task.start(move || {
            let _ = tx.send(Command::Stop(id));
        })
        .await;
    }

    async fn stop_task(&mut self, id: TaskId) {
        let Some(pos) = self.table.iter().position(|a| a.task.id() == id) else {
            return;
        };
        let allocation = self.table.remove(pos);
        self.stop_allocation(allocation).await;
    }

    async fn stop_allocation(&mut self, allocation: Allocation) {
        let task = allocation.task;
        self.publish_snapshot();
        if let Err(err) = task.stop().await {
            if err.is_fatal() {
                error!(task = task.name(), error = %err, "task ended with a fatal fault");
            } else {
                warn!(task = task.name(), error = %err, "task ended with a fault");
            }
            self.bus.publish(
                Event::new(EventKind::TaskFailed)
                    .with_task(task.name())
                    .with_reason(err.as_message()),
            );
        }
        debug!(task = task.name(), "stopped");
        self.bus
            .publish(Event::new(EventKind::TaskStopped).with_task(task.name()));
    }

    /// Starts idle tasks until every registered resource is covered.
    async fn settle(&mut self) {
        let resources = self.registry.list();
        // an idle task may require several resources and displace another idle task
        for _ in 0..=resources.len() {
            let mut changed = false;
            for resource in &resources {
                if self.is_covered(resource.id()) {
                    continue;
                }
                let idle = resource.idle_task();
                debug!(task = idle.name(), resource = resource.name(), "starting idle task");
                self.bus.publish(
                    Event::new(EventKind::IdleTaskStarted)
                        .with_task(idle.name())
                        .with_resource(resource.name()),
                );
                self.start_task(idle).await;
                changed = true;
            }
            if !changed {
                self.publish_snapshot();
                return;
            }
        }
        warn!("idle tasks keep displacing each other; coverage incomplete");
        self.publish_snapshot();
    }

    async fn stop_all(&mut self) {
        while let Some(allocation) = self.table.pop() {
            self.stop_allocation(allocation).await;
        }
        self.publish_snapshot();
    }

    fn is_covered(&self, resource: ResourceId) -> bool {
        self.table.iter().any(|a| a.resources.contains(resource))
    }

    fn publish_snapshot(&self) {
        *self.snapshot.write() = self.table.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Resource;
    use crate::tasks::EmptyTask;

    fn setup(names: &[&str]) -> (Arc<ResourceRegistry>, Vec<crate::resources::ResourceRef>) {
        let registry = Arc::new(ResourceRegistry::new());
        let resources: Vec<_> = names.iter().map(|n| Resource::new(*n)).collect();
        for r in &resources {
            registry.add(Arc::clone(r)).unwrap();
        }
        (registry, resources)
    }

    #[tokio::test]
    async fn test_start_before_activation_is_rejected() {
        let (registry, resources) = setup(&["drive"]);
        let dispatcher = Dispatcher::new(registry, Bus::new(16), false);
        let task = EmptyTask::spec(&resources[0].as_set()).named("t").build();

        let err = dispatcher.start(&task).unwrap_err();
        assert_eq!(err, RuntimeError::NotActivated { task: "t".into() });
        assert!(matches!(
            dispatcher.sync().await,
            Err(RuntimeError::NotActivated { .. })
        ));
    }

    #[tokio::test]
    async fn test_activation_covers_every_resource() {
        let (registry, resources) = setup(&["drive", "arm"]);
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Bus::new(16), false);
        dispatcher.activate().unwrap();
        dispatcher.sync().await.unwrap();

        for r in &resources {
            let owner = dispatcher.owner_of(r.id()).expect("covered");
            assert_eq!(owner.id(), r.idle_task().id());
        }
        assert_eq!(dispatcher.activate(), Err(RuntimeError::AlreadyActivated));
        assert!(registry.is_sealed());
        dispatcher.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_debug_mode_buffers_early_starts() {
        let (registry, resources) = setup(&["drive"]);
        let dispatcher = Dispatcher::new(registry, Bus::new(16), true);
        let task = EmptyTask::spec(&resources[0].as_set()).named("early").build();

        dispatcher.start(&task).unwrap();
        dispatcher.activate().unwrap();
        dispatcher.sync().await.unwrap();
        assert!(dispatcher.is_allocated(&task));
        dispatcher.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_of_unallocated_task_is_ignored() {
        let (registry, resources) = setup(&["drive"]);
        let dispatcher = Dispatcher::new(registry, Bus::new(16), false);
        dispatcher.activate().unwrap();
        let task = EmptyTask::spec(&resources[0].as_set()).build();

        dispatcher.stop(&task).unwrap();
        dispatcher.sync().await.unwrap();
        assert_eq!(dispatcher.allocations().len(), 1);
        dispatcher.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_everything() {
        let (registry, resources) = setup(&["drive", "arm"]);
        let dispatcher = Dispatcher::new(registry, Bus::new(16), false);
        dispatcher.activate().unwrap();
        dispatcher.sync().await.unwrap();
        let idle = resources[0].idle_task();
        assert!(idle.is_running());

        dispatcher.shutdown(Duration::from_secs(1)).await.unwrap();
        assert!(!idle.is_running());
        assert!(dispatcher.allocations().is_empty());
        assert_eq!(dispatcher.sync().await, Err(RuntimeError::Closed));
    }
}
