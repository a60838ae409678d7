//! Boolean and comparison combinators.
//!
//! Every combinator returns a derived [`Observable`] that recomputes synchronously
//! whenever one of its inputs changes and notifies only on an actual change.

use std::ops::Not;
use std::sync::Arc;

use super::handle::ObserverHandle;
use super::observable::{Observable, Value};

impl Observable<bool> {
    /// `self && other`.
    pub fn and(&self, other: impl Into<Observable<bool>>) -> Observable<bool> {
        self.combine(&other.into(), |a, b| *a && *b)
    }

    /// `self || other`.
    pub fn or(&self, other: impl Into<Observable<bool>>) -> Observable<bool> {
        self.combine(&other.into(), |a, b| *a || *b)
    }

    /// Fires `listener` once, as soon as the value is `true`.
    pub fn invoke_once_when_true<F>(&self, listener: F) -> ObserverHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.invoke_once_when(|v| *v, move |_| listener())
    }

    /// Fires `listener` once, as soon as the value is `false`.
    pub fn invoke_once_when_false<F>(&self, listener: F) -> ObserverHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.invoke_once_when(|v| !*v, move |_| listener())
    }

    /// Fires `listener` now if `true`, then on every change to `true`.
    pub fn invoke_when_true<F>(&self, listener: F) -> ObserverHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.invoke_when(|v| *v, move |_| listener())
    }

    /// Fires `listener` now if `false`, then on every change to `false`.
    pub fn invoke_when_false<F>(&self, listener: F) -> ObserverHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.invoke_when(|v| !*v, move |_| listener())
    }
}

impl Not for Observable<bool> {
    type Output = Observable<bool>;

    fn not(self) -> Self::Output {
        self.map(|v| !*v)
    }
}

impl Not for &Observable<bool> {
    type Output = Observable<bool>;

    fn not(self) -> Self::Output {
        self.map(|v| !*v)
    }
}

impl<T: Value> Observable<T> {
    /// `self == other`.
    pub fn equal_to(&self, other: impl Into<Observable<T>>) -> Observable<bool> {
        self.combine(&other.into(), |a, b| a == b)
    }
}

impl<T: Value + PartialOrd> Observable<T> {
    /// `self > other`.
    pub fn greater_than(&self, other: impl Into<Observable<T>>) -> Observable<bool> {
        self.combine(&other.into(), |a, b| a > b)
    }

    /// `self < other`.
    pub fn less_than(&self, other: impl Into<Observable<T>>) -> Observable<bool> {
        self.combine(&other.into(), |a, b| a < b)
    }
}

/// Logical AND over any number of conditions; `true` when empty.
pub fn all(conditions: impl IntoIterator<Item = Observable<bool>>) -> Observable<bool> {
    let inputs: Vec<Observable<bool>> = conditions.into_iter().collect();
    let upstream = inputs
        .iter()
        .map(|o| Arc::new(o.clone()) as Arc<dyn super::observable::Upstream>)
        .collect();
    Observable::derive(upstream, move || inputs.iter().all(|o| o.get()))
}

/// Logical OR over any number of conditions; `false` when empty.
pub fn any(conditions: impl IntoIterator<Item = Observable<bool>>) -> Observable<bool> {
    let inputs: Vec<Observable<bool>> = conditions.into_iter().collect();
    let upstream = inputs
        .iter()
        .map(|o| Arc::new(o.clone()) as Arc<dyn super::observable::Upstream>)
        .collect();
    Observable::derive(upstream, move || inputs.iter().any(|o| o.get()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Variable;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_and_or_truth_tables() {
        let a = Variable::new(false);
        let b = Variable::new(false);
        let and = a.and(&b);
        let or = a.or(&b);

        for (x, y) in [(false, false), (false, true), (true, false), (true, true)] {
            a.set(x);
            b.set(y);
            assert_eq!(and.get(), x && y, "and({x}, {y})");
            assert_eq!(or.get(), x || y, "or({x}, {y})");
        }
    }

    #[test]
    fn test_not_follows_input() {
        let a = Variable::new(true);
        let not_a = !a.observable();
        assert!(!not_a.get());
        a.set(false);
        assert!(not_a.get());
    }

    #[test]
    fn test_diamond_notifies_once_per_change() {
        let a = Variable::new(false);
        let left = a.map(|v| *v);
        let right = !a.observable();
        let both = left.or(&right);

        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        both.on_change(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(both.get());
        a.set(true);
        a.set(false);
        assert!(both.get());
        assert_eq!(count.load(Ordering::SeqCst), 0, "or(a, !a) is always true");
    }

    #[test]
    fn test_diamond_has_no_transient_values() {
        let a = Variable::new(false);
        let contradiction = a.map(|v| *v).and(!a.observable());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        contradiction.on_change(move |v| s.lock().push(*v));

        a.set(true);
        a.set(false);
        assert!(!contradiction.get());
        assert!(seen.lock().is_empty(), "got {:?}", seen.lock());
    }

    #[test]
    fn test_numeric_comparisons() {
        let x = Variable::new(5);
        let gt = x.greater_than(3);
        let lt = x.less_than(3);
        let eq = x.equal_to(5);
        assert!(gt.get() && !lt.get() && eq.get());

        x.set(1);
        assert!(!gt.get() && lt.get() && !eq.get());
    }

    #[test]
    fn test_compare_two_variables() {
        let x = Variable::new(1.0);
        let y = Variable::new(2.0);
        let gt = x.greater_than(&y);
        assert!(!gt.get());
        x.set(3.0);
        assert!(gt.get());
        y.set(4.0);
        assert!(!gt.get());
    }

    #[test]
    fn test_invoke_once_when_true_immediate() {
        let v = Variable::new(true);
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let handle = v.invoke_once_when_true(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handle.is_disposed());
        v.set(false);
        v.set(true);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invoke_once_when_true_deferred() {
        let v = Variable::new(false);
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let handle = v.invoke_once_when_true(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 0);
        v.set(true);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handle.is_disposed());
        v.set(false);
        v.set(true);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invoke_when_false_is_persistent() {
        let v = Variable::new(false);
        let hits = Arc::new(Mutex::new(0));
        let h = Arc::clone(&hits);
        v.invoke_when_false(move || *h.lock() += 1);
        assert_eq!(*hits.lock(), 1);
        v.set(true);
        v.set(false);
        assert_eq!(*hits.lock(), 2);
    }

    #[test]
    fn test_all_and_any() {
        let a = Variable::new(true);
        let b = Variable::new(false);
        let every = all([a.observable(), b.observable()]);
        let some = any([a.observable(), b.observable()]);
        assert!(!every.get());
        assert!(some.get());
        b.set(true);
        assert!(every.get());
        assert!(all(Vec::new()).get());
        assert!(!any(Vec::new()).get());
    }
}
