//! # Observable cells and settable variables.
//!
//! [`Observable<T>`] is a shared, thread-safe cell that notifies observers
//! whenever its value changes. It comes in three flavours that share one
//! notification path:
//!
//! - **stored**: created by [`Variable::new`] / [`Observable::constant`];
//! - **derived**: created by [`Observable::map`] / [`Observable::combine`] and the
//!   boolean/numeric combinators; recomputed synchronously on any input change;
//! - **sampled**: created by [`Observable::sampled`]; a background task polls a
//!   producer closure and commits the result.
//!
//! ## Rules
//! - A commit only notifies when the new value differs (`PartialEq`) from the old one.
//! - Observers run synchronously, in registration order, before the commit returns.
//! - Commits to one cell are serialized; an observer may commit again on the same thread.
//! - Derived and sampled cells are **lazy**: nothing is subscribed or sampled until
//!   the cell is first read or observed. Re-entrant activation is a no-op, which
//!   is what makes forward and self-referential wiring safe.
//!
//! ```text
//!  Variable::set(v) ──► commit(v) ── changed? ──► observer 1 ──► derived.recompute() ──► commit ...
//!                                               ├► observer 2
//!                                               └► observer N
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};

use super::handle::{Detach, ObserverHandle};
use super::sampled;
use crate::periodic;

/// Bound shared by every value stored in an observable cell.
pub trait Value: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + PartialEq + Send + Sync + 'static {}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Compute<T> = Arc<dyn Fn() -> T + Send + Sync>;
type Hook = Box<dyn FnOnce() + Send>;

/// Type-erased input of a derived cell.
pub(crate) trait Upstream: Send + Sync {
    /// Registers `wake` to be called after every change of this input.
    fn watch(&self, wake: Arc<dyn Fn() + Send + Sync>) -> ObserverHandle;
}

enum Kind<T> {
    Stored,
    Derived {
        compute: Compute<T>,
        inputs: Vec<Arc<dyn Upstream>>,
    },
    Sampled {
        sample: Compute<T>,
        period: Option<Duration>,
    },
}

pub(crate) struct Node<T> {
    /// `None` only for derived/sampled cells that were never evaluated.
    value: Mutex<Option<T>>,
    observers: Mutex<Vec<(u64, Listener<T>)>>,
    next_id: AtomicU64,
    /// Serializes commits (and recomputations) of this cell.
    commit: ReentrantMutex<()>,
    kind: Kind<T>,
    activated: AtomicBool,
    first_use: Mutex<Option<Hook>>,
    upstream: Mutex<Vec<ObserverHandle>>,
}

impl<T> Drop for Node<T> {
    fn drop(&mut self) {
        for handle in self.upstream.get_mut().drain(..) {
            handle.dispose();
        }
    }
}

impl<T: Value> Detach for Node<T> {
    fn detach(&self, id: u64) {
        self.observers.lock().retain(|(oid, _)| *oid != id);
    }

    fn is_attached(&self, id: u64) -> bool {
        self.observers.lock().iter().any(|(oid, _)| *oid == id)
    }
}

/// Read-only, observable view of a value.
///
/// Cloning an `Observable` yields another handle to the **same** cell.
pub struct Observable<T> {
    node: Arc<Node<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: Value> Observable<T> {
    fn from_kind(initial: Option<T>, kind: Kind<T>, activated: bool) -> Self {
        Self {
            node: Arc::new(Node {
                value: Mutex::new(initial),
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                commit: ReentrantMutex::new(()),
                kind,
                activated: AtomicBool::new(activated),
                first_use: Mutex::new(None),
                upstream: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn from_node(node: Arc<Node<T>>) -> Self {
        Self { node }
    }

    fn stored(value: T) -> Self {
        Self::from_kind(Some(value), Kind::Stored, false)
    }

    /// A value that never changes.
    pub fn constant(value: T) -> Self {
        Self::from_kind(Some(value), Kind::Stored, true)
    }

    /// A value materialized from a polled producer.
    ///
    /// Once the cell is first read or observed, `sample` is evaluated immediately and
    /// then re-evaluated every `1 / frequency` seconds by a background task; each result
    /// is committed like an ordinary change. `frequency = 0` samples once and never
    /// refreshes. The sampler stops when the cell is dropped.
    pub fn sampled<F>(frequency: u32, sample: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_kind(
            None,
            Kind::Sampled {
                sample: Arc::new(sample),
                period: periodic::period(frequency),
            },
            false,
        )
    }

    pub(crate) fn derive<F>(inputs: Vec<Arc<dyn Upstream>>, compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_kind(
            None,
            Kind::Derived {
                compute: Arc::new(compute),
                inputs,
            },
            false,
        )
    }

    /// Derives a cell from this one.
    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Value,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        Observable::derive(vec![Arc::new(self.clone())], move || f(&source.get()))
    }

    /// Derives a cell from this one and `other`.
    pub fn combine<U, R, F>(&self, other: &Observable<U>, f: F) -> Observable<R>
    where
        U: Value,
        R: Value,
        F: Fn(&T, &U) -> R + Send + Sync + 'static,
    {
        let (a, b) = (self.clone(), other.clone());
        Observable::derive(
            vec![Arc::new(self.clone()), Arc::new(other.clone())],
            move || f(&a.get(), &b.get()),
        )
    }

    /// Returns the current value.
    ///
    /// Derived cells are evaluated from their inputs on every read, so a read made
    /// while a change is still propagating through a diamond never sees a stale branch.
    pub fn get(&self) -> T {
        self.activate();
        match &self.node.kind {
            Kind::Derived { compute, .. } => compute(),
            Kind::Sampled { sample, .. } => {
                if let Some(value) = self.peek() {
                    return value;
                }
                let fresh = sample();
                self.node.value.lock().get_or_insert(fresh).clone()
            }
            Kind::Stored => match self.peek() {
                Some(value) => value,
                None => unreachable!("stored cells are created with a value"),
            },
        }
    }

    /// Registers a persistent observer called with every new value.
    pub fn on_change<F>(&self, listener: F) -> ObserverHandle
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.activate();
        let id = self.node.next_id.fetch_add(1, Ordering::Relaxed);
        self.node.observers.lock().push((id, Arc::new(listener)));
        let target: Weak<dyn Detach> = Arc::downgrade(&self.node) as Weak<Node<T>>;
        ObserverHandle::new(target, id)
    }

    /// Registers a persistent observer filtered by `predicate`.
    ///
    /// `listener` runs right away if the current value satisfies `predicate`, and then
    /// on every change to a satisfying value.
    pub fn invoke_when<P, F>(&self, predicate: P, listener: F) -> ObserverHandle
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let _serial = self.node.commit.lock();
        let current = self.get();
        if predicate(&current) {
            listener(&current);
        }
        self.on_change(move |value| {
            if predicate(value) {
                listener(value);
            }
        })
    }

    /// Registers a listener fired at most once, the first time the value satisfies
    /// `predicate` (at registration or on a later change). It then disposes itself.
    pub fn invoke_once_when<P, F>(&self, predicate: P, listener: F) -> ObserverHandle
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let _serial = self.node.commit.lock();
        let current = self.get();
        if predicate(&current) {
            listener(current);
            return ObserverHandle::detached();
        }
        self.once(predicate, listener)
    }

    /// Registers a listener fired on the next change only.
    pub fn invoke_once_on_change<F>(&self, listener: F) -> ObserverHandle
    where
        F: FnOnce(T) + Send + 'static,
    {
        let _serial = self.node.commit.lock();
        self.once(|_| true, listener)
    }

    fn once<P, F>(&self, predicate: P, listener: F) -> ObserverHandle
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let pending = Mutex::new(Some(listener));
        let own: Arc<Mutex<Option<ObserverHandle>>> = Arc::new(Mutex::new(None));
        let own_in_listener = Arc::clone(&own);

        let handle = self.on_change(move |value| {
            if !predicate(value) {
                return;
            }
            let Some(listener) = pending.lock().take() else {
                return;
            };
            if let Some(handle) = own_in_listener.lock().take() {
                handle.dispose();
            }
            listener(value.clone());
        });
        *own.lock() = Some(handle.clone());
        handle
    }

    /// Number of registered observers (diagnostics).
    pub fn observer_count(&self) -> usize {
        self.node.observers.lock().len()
    }

    /// Returns true if both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Observable<T>) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Re-evaluates a derived or sampled cell and commits the result.
    pub(crate) fn refresh(&self) {
        let _serial = self.node.commit.lock();
        let fresh = match &self.node.kind {
            Kind::Derived { compute, .. } | Kind::Sampled {
                sample: compute, ..
            } => compute(),
            Kind::Stored => return,
        };
        self.commit(fresh);
    }

    /// Stores `value` and notifies observers if it changed. Returns true on change.
    pub(crate) fn commit(&self, value: T) -> bool {
        let _serial = self.node.commit.lock();
        {
            let mut slot = self.node.value.lock();
            if slot.as_ref() == Some(&value) {
                return false;
            }
            *slot = Some(value.clone());
        }
        let observers: Vec<Listener<T>> = self
            .node
            .observers
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for observer in observers {
            observer(&value);
        }
        true
    }

    /// First evaluation of a lazy cell. Nothing has changed yet, so nobody is notified.
    fn seed(&self) {
        let _serial = self.node.commit.lock();
        if self.node.value.lock().is_some() {
            return;
        }
        let fresh = match &self.node.kind {
            Kind::Derived { compute, .. } | Kind::Sampled {
                sample: compute, ..
            } => compute(),
            Kind::Stored => return,
        };
        self.node.value.lock().get_or_insert(fresh);
    }

    fn peek(&self) -> Option<T> {
        self.node.value.lock().clone()
    }

    fn activate(&self) {
        if self.node.activated.swap(true, Ordering::AcqRel) {
            return;
        }
        let hook = self.node.first_use.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        match &self.node.kind {
            Kind::Stored => {}
            Kind::Derived { inputs, .. } => {
                for input in inputs {
                    // inputs must not keep their dependents alive
                    let me: Weak<Node<T>> = Arc::downgrade(&self.node);
                    let handle = input.watch(Arc::new(move || {
                        if let Some(node) = me.upgrade() {
                            Observable::from_node(node).refresh();
                        }
                    }));
                    self.node.upstream.lock().push(handle);
                }
                self.seed();
            }
            Kind::Sampled { period, .. } => {
                self.seed();
                if let Some(period) = *period {
                    sampled::spawn_sampler(Arc::downgrade(&self.node), period);
                }
            }
        }
    }
}

impl<T: Value> Upstream for Observable<T> {
    fn watch(&self, wake: Arc<dyn Fn() + Send + Sync>) -> ObserverHandle {
        self.on_change(move |_| wake())
    }
}

impl<T: Value> From<T> for Observable<T> {
    fn from(value: T) -> Self {
        Observable::constant(value)
    }
}

impl<T: Value> From<&Observable<T>> for Observable<T> {
    fn from(value: &Observable<T>) -> Self {
        value.clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable")
            .field(&*self.node.value.lock())
            .finish()
    }
}

/// A settable [`Observable`].
///
/// Derefs to [`Observable<T>`], so every read/observe method is available directly.
///
/// # Example
/// ```
/// use taskdispatch::Variable;
///
/// let speed = Variable::new(1.0);
/// let fast = speed.greater_than(2.0);
/// assert!(!fast.get());
///
/// speed.set(3.0);
/// assert!(fast.get());
/// ```
pub struct Variable<T> {
    inner: Observable<T>,
}

impl<T> Clone for Variable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Value> Variable<T> {
    /// Creates a variable holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Observable::stored(value),
        }
    }

    /// Commits a new value; observers run before this returns if it changed.
    pub fn set(&self, value: T) -> bool {
        self.inner.commit(value)
    }

    /// Computes the next value from the current one and commits it.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let _serial = self.inner.node.commit.lock();
        let Some(current) = self.inner.peek() else {
            return false;
        };
        self.inner.commit(f(&current))
    }

    /// Read-only handle to the same cell.
    pub fn observable(&self) -> Observable<T> {
        self.inner.clone()
    }

    /// Attaches `hook` to run when the variable is first read or observed.
    ///
    /// Runs immediately if that already happened.
    pub fn on_first_use<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.node.activated.load(Ordering::Acquire) {
            hook();
            return;
        }
        *self.inner.node.first_use.lock() = Some(Box::new(hook));
    }
}

impl<T> Deref for Variable<T> {
    type Target = Observable<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T: Value> From<Variable<T>> for Observable<T> {
    fn from(value: Variable<T>) -> Self {
        value.inner
    }
}

impl<T: Value> From<&Variable<T>> for Observable<T> {
    fn from(value: &Variable<T>) -> Self {
        value.inner.clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Variable")
            .field(&*self.inner.node.value.lock())
            .finish()
    }
}
