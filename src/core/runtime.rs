//! # Runtime: the context object owning every shared piece of the dispatcher.
//!
//! The [`Runtime`] owns the configuration, the event bus and its
//! [`SubscriberSet`], the resource registry, the [`Dispatcher`] and the mode
//! [`StateMachine`]. It is created once by [`RuntimeBuilder`](crate::RuntimeBuilder)
//! and passed around as `Arc<Runtime>`.
//!
//! ## Startup
//! ```text
//! add_resource(r) ...                       (registration phase)
//!        │
//! activate()
//!   ├─► late_init hooks (registration order)
//!   ├─► dispatcher.activate(): seal registry, start idle tasks
//!   └─► initialized = true
//!        │
//! set_mode(m) ...                           (mode feed)
//!   └─► state machine
//!         ├─ enter Autonomous → auto_reset hooks
//!         ├─ enter Teleop     → teleop_reset hooks
//!         ├─ enter Disabled   → zero_outputs hooks
//!         └─ any change       → publish ModeChanged
//! ```
//!
//! ## Event flow
//! ```text
//! dispatcher / runtime ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::core::{Allocation, Config, Dispatcher};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::machine::{Mode, StateMachine};
use crate::reactive::{Observable, Value, Variable};
use crate::resources::{ResourceRef, ResourceRegistry};
use crate::subscribers::SubscriberSet;
use crate::tasks::{TaskRef, TaskSpec};

/// Shared runtime context.
pub struct Runtime {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    registry: Arc<ResourceRegistry>,
    dispatcher: Dispatcher,
    mode: Variable<Mode>,
    machine: StateMachine<Mode>,
    initialized: AtomicBool,
}

impl Runtime {
    pub(crate) fn new_internal(cfg: Config, bus: Bus, subs: Arc<SubscriberSet>) -> Self {
        let registry = Arc::new(ResourceRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), bus.clone(), cfg.debug);
        let mode = Variable::new(Mode::None);
        let machine = StateMachine::new(&mode);

        let runtime = Self {
            cfg,
            bus,
            subs,
            registry,
            dispatcher,
            mode,
            machine,
            initialized: AtomicBool::new(false),
        };
        runtime.wire_mode_hooks();
        runtime.subscriber_listener();
        runtime
    }

    fn wire_mode_hooks(&self) {
        let registry = Arc::clone(&self.registry);
        self.machine.on_enter([Mode::Autonomous], move |_| {
            registry.broadcast("auto_reset", |h| h.auto_reset());
        });
        let registry = Arc::clone(&self.registry);
        self.machine.on_enter([Mode::Teleop], move |_| {
            registry.broadcast("teleop_reset", |h| h.teleop_reset());
        });
        let registry = Arc::clone(&self.registry);
        self.machine.on_enter([Mode::Disabled], move |_| {
            registry.broadcast("zero_outputs", |h| h.zero_outputs());
        });

        let bus = self.bus.clone();
        self.machine
            .on_transition([Mode::Any], [Mode::Any], move |from, to| {
                info!(?from, ?to, "mode changed");
                bus.publish(
                    Event::new(EventKind::ModeChanged).with_reason(format!("{from:?} -> {to:?}")),
                );
            });
    }

    /// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
    fn subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Registers a resource; only allowed before [`activate`](Self::activate).
    pub fn add_resource(&self, resource: &ResourceRef) -> Result<(), RuntimeError> {
        self.registry.add(Arc::clone(resource))?;
        info!(resource = resource.name(), "resource registered");
        self.bus
            .publish(Event::new(EventKind::ResourceRegistered).with_resource(resource.name()));
        Ok(())
    }

    /// Runs `late_init` hooks, then activates the dispatcher.
    pub fn activate(&self) -> Result<(), RuntimeError> {
        if self.dispatcher.is_activated() {
            return Err(RuntimeError::AlreadyActivated);
        }
        self.registry.broadcast("late_init", |h| h.late_init());
        self.dispatcher.activate()?;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Builds a task, applying [`Config::default_frequency`] when the spec has none.
    ///
    /// Tasks are meant to be composed during setup; building one after activation
    /// logs a warning unless [`Config::debug`] is set.
    pub fn task(&self, spec: TaskSpec) -> TaskRef {
        if self.is_initialized() && !self.cfg.debug {
            warn!(task = spec.name(), "task built after the runtime was initialized");
        }
        spec.or_frequency(self.cfg.default_frequency).build()
    }

    /// An external source polled at [`Config::sample_frequency`].
    pub fn sample<T, F>(&self, f: F) -> Observable<T>
    where
        T: Value,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Observable::sampled(self.cfg.sample_frequency, f)
    }

    pub fn start(&self, task: &TaskRef) -> Result<(), RuntimeError> {
        self.dispatcher.start(task)
    }

    pub fn stop(&self, task: &TaskRef) -> Result<(), RuntimeError> {
        self.dispatcher.stop(task)
    }

    /// Waits until the dispatcher processed everything enqueued so far.
    pub async fn sync(&self) -> Result<(), RuntimeError> {
        self.dispatcher.sync().await
    }

    pub fn allocations(&self) -> Vec<Allocation> {
        self.dispatcher.allocations()
    }

    /// Pushes the externally classified mode; returns true if it changed.
    pub fn set_mode(&self, mode: Mode) -> bool {
        self.mode.set(mode)
    }

    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    pub fn state_machine(&self) -> &StateMachine<Mode> {
        &self.machine
    }

    /// Stops every allocated task, waiting at most [`Config::grace`].
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        info!(grace = ?self.cfg.grace, "runtime shutting down");
        self.dispatcher.shutdown(self.cfg.grace).await
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("mode", &self.mode())
            .field("resources", &self.registry.len())
            .field("subscribers", &self.subs.len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
