//! Finish conditions.

use std::ops::AddAssign;

use crate::reactive::Observable;

/// When a task is done.
///
/// Starts as "never". `+=` ORs another condition in; [`set`](Self::set) replaces it.
///
/// ```
/// use taskdispatch::{FinishCondition, Variable};
///
/// let at_target = Variable::new(false);
/// let cancelled = Variable::new(false);
///
/// let mut finish = FinishCondition::default();
/// finish += &at_target;
/// finish += &cancelled;
/// assert!(!finish.observable().get());
///
/// cancelled.set(true);
/// assert!(finish.observable().get());
/// ```
#[derive(Clone, Debug)]
pub struct FinishCondition {
    condition: Observable<bool>,
    never: bool,
}

impl Default for FinishCondition {
    fn default() -> Self {
        Self {
            condition: Observable::constant(false),
            never: true,
        }
    }
}

impl FinishCondition {
    /// Replaces the condition.
    pub fn set(&mut self, condition: impl Into<Observable<bool>>) {
        self.condition = condition.into();
        self.never = false;
    }

    /// ORs a polled boolean source, sampled at `frequency` Hz (`0` samples once).
    pub fn or_source<F>(&mut self, frequency: u32, source: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        *self += Observable::sampled(frequency, source);
    }

    /// Returns true while no condition was ever added.
    pub fn is_never(&self) -> bool {
        self.never
    }

    pub fn observable(&self) -> Observable<bool> {
        self.condition.clone()
    }
}

impl<R: Into<Observable<bool>>> AddAssign<R> for FinishCondition {
    fn add_assign(&mut self, rhs: R) {
        if self.never {
            self.set(rhs);
        } else {
            self.condition = self.condition.or(rhs);
        }
    }
}
