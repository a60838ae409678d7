//! # State machine driven by an observable state value.
//!
//! ```text
//! state changes from → to
//!   ├─► while loops stop       (set no longer holds `to`; waits for an in-flight tick)
//!   ├─► leave callbacks        (registered set holds `from`, not `to`)
//!   ├─► transition callbacks   (from-set holds `from`, to-set holds `to`)
//!   ├─► enter callbacks        (registered set holds `to`, not `from`)
//!   └─► while loops start      (set now holds `to`)
//! ```
//!
//! Registration expands wildcard states through [`MachineState::expand`].
//! Callbacks run synchronously on the thread that changed the state, outside
//! every internal lock. Enter callbacks do not fire for the initial state.
//!
//! A while callback must not change the observed state from its own tick while
//! another thread is changing it too: both sides would wait on each other.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TaskError;
use crate::machine::MachineState;
use crate::periodic;
use crate::reactive::{Observable, ObserverHandle};

type StateFn<S> = Arc<dyn Fn(S) + Send + Sync>;
type TransitionFn<S> = Arc<dyn Fn(S, S) + Send + Sync>;
type TickFn = Arc<dyn Fn() + Send + Sync>;

struct WhileLoop<S> {
    states: HashSet<S>,
    frequency: u32,
    tick: TickFn,
    /// Held for the duration of every tick.
    gate: Arc<ReentrantMutex<()>>,
    running: Option<CancellationToken>,
}

impl<S: MachineState> WhileLoop<S> {
    fn ensure_running(&mut self) {
        if self.running.is_some() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(frequency = self.frequency, "no tokio runtime; while loop not started");
            return;
        };
        let token = CancellationToken::new();
        let tick = Arc::clone(&self.tick);
        let gate = Arc::clone(&self.gate);
        let cancelled = token.clone();
        runtime.spawn(periodic::run(self.frequency, token.clone(), move || {
            let _tick = gate.lock();
            if !cancelled.is_cancelled() {
                tick();
            }
            std::future::ready(Ok::<(), TaskError>(()))
        }));
        self.running = Some(token);
    }

    /// Cancels the loop. The returned gate is free once no tick is in flight.
    fn stop(&mut self) -> Option<Arc<ReentrantMutex<()>>> {
        let token = self.running.take()?;
        token.cancel();
        Some(Arc::clone(&self.gate))
    }
}

struct Inner<S> {
    state: Observable<S>,
    current: Mutex<S>,
    enter: Mutex<Vec<(HashSet<S>, StateFn<S>)>>,
    leave: Mutex<Vec<(HashSet<S>, StateFn<S>)>>,
    transitions: Mutex<Vec<(HashSet<S>, HashSet<S>, TransitionFn<S>)>>,
    whiles: Mutex<Vec<WhileLoop<S>>>,
    listener: Mutex<Option<ObserverHandle>>,
}

impl<S: MachineState> Inner<S> {
    fn step(&self, to: S) {
        let from = std::mem::replace(&mut *self.current.lock(), to);
        if from == to {
            return;
        }
        debug!(?from, ?to, "state changed");

        let stopped: Vec<_> = self
            .whiles
            .lock()
            .iter_mut()
            .filter(|w| !w.states.contains(&to))
            .filter_map(WhileLoop::stop)
            .collect();
        for gate in stopped {
            drop(gate.lock());
        }

        let leave: Vec<_> = self
            .leave
            .lock()
            .iter()
            .filter(|(states, _)| states.contains(&from) && !states.contains(&to))
            .map(|(_, f)| Arc::clone(f))
            .collect();
        for f in leave {
            f(to);
        }

        let transitions: Vec<_> = self
            .transitions
            .lock()
            .iter()
            .filter(|(src, dst, _)| src.contains(&from) && dst.contains(&to))
            .map(|(_, _, f)| Arc::clone(f))
            .collect();
        for f in transitions {
            f(from, to);
        }

        let enter: Vec<_> = self
            .enter
            .lock()
            .iter()
            .filter(|(states, _)| states.contains(&to) && !states.contains(&from))
            .map(|(_, f)| Arc::clone(f))
            .collect();
        for f in enter {
            f(from);
        }

        for w in self.whiles.lock().iter_mut() {
            if w.states.contains(&to) {
                w.ensure_running();
            }
        }
    }
}

impl<S> Drop for Inner<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.dispose();
        }
        for w in self.whiles.get_mut().iter_mut() {
            if let Some(token) = w.running.take() {
                token.cancel();
            }
        }
    }
}

/// Reacts to changes of an observable state with enter/leave/transition/while callbacks.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use taskdispatch::{Mode, StateMachine, Variable};
///
/// let mode = Variable::new(Mode::Disabled);
/// let machine = StateMachine::new(&mode);
///
/// let entered = Arc::new(AtomicUsize::new(0));
/// let e = Arc::clone(&entered);
/// machine.on_enter([Mode::Teleop], move |_from| {
///     e.fetch_add(1, Ordering::SeqCst);
/// });
///
/// mode.set(Mode::Teleop);
/// assert_eq!(entered.load(Ordering::SeqCst), 1);
/// assert_eq!(machine.current(), Mode::Teleop);
/// ```
pub struct StateMachine<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for StateMachine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: MachineState> StateMachine<S> {
    pub fn new(state: impl Into<Observable<S>>) -> Self {
        let state: Observable<S> = state.into();
        let inner = Arc::new(Inner {
            current: Mutex::new(state.get()),
            state: state.clone(),
            enter: Mutex::new(Vec::new()),
            leave: Mutex::new(Vec::new()),
            transitions: Mutex::new(Vec::new()),
            whiles: Mutex::new(Vec::new()),
            listener: Mutex::new(None),
        });

        let weak: Weak<Inner<S>> = Arc::downgrade(&inner);
        let handle = state.on_change(move |to| {
            if let Some(inner) = weak.upgrade() {
                inner.step(*to);
            }
        });
        *inner.listener.lock() = Some(handle);
        Self { inner }
    }

    /// The state as last observed by the machine.
    pub fn current(&self) -> S {
        *self.inner.current.lock()
    }

    /// The observed state value.
    pub fn state(&self) -> &Observable<S> {
        &self.inner.state
    }

    /// Calls `f(from)` whenever the state moves into `states`.
    pub fn on_enter<I, F>(&self, states: I, f: F)
    where
        I: IntoIterator<Item = S>,
        F: Fn(S) + Send + Sync + 'static,
    {
        self.inner.enter.lock().push((expand(states), Arc::new(f)));
    }

    /// Calls `f(to)` whenever the state moves out of `states`.
    pub fn on_leave<I, F>(&self, states: I, f: F)
    where
        I: IntoIterator<Item = S>,
        F: Fn(S) + Send + Sync + 'static,
    {
        self.inner.leave.lock().push((expand(states), Arc::new(f)));
    }

    /// Calls `f(from, to)` for every change from a state in `from` to a state in `to`.
    pub fn on_transition<I, J, F>(&self, from: I, to: J, f: F)
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = S>,
        F: Fn(S, S) + Send + Sync + 'static,
    {
        self.inner
            .transitions
            .lock()
            .push((expand(from), expand(to), Arc::new(f)));
    }

    /// Calls `f` at `frequency` Hz while the state is in `states`.
    ///
    /// Starts right away if the machine is already in one of `states`.
    pub fn on_while<I, F>(&self, states: I, frequency: u32, f: F)
    where
        I: IntoIterator<Item = S>,
        F: Fn() + Send + Sync + 'static,
    {
        let mut w = WhileLoop {
            states: expand(states),
            frequency,
            tick: Arc::new(f),
            gate: Arc::new(ReentrantMutex::new(())),
            running: None,
        };
        if w.states.contains(&self.current()) {
            w.ensure_running();
        }
        self.inner.whiles.lock().push(w);
    }
}

impl<S: MachineState> fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current())
            .finish()
    }
}

fn expand<S: MachineState>(states: impl IntoIterator<Item = S>) -> HashSet<S> {
    states.into_iter().flat_map(MachineState::expand).collect()
}
