//! Identifiers and ordered sets of resources.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static RESOURCE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique resource identifier.
///
/// Ordered by creation, so a [`ResourceSet`] iterates in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u64);

impl ResourceId {
    pub(crate) fn next() -> Self {
        Self(RESOURCE_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Set of resources a task requires.
///
/// Carries names alongside ids so conflicts can be reported without a registry lookup.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    items: BTreeMap<ResourceId, Arc<str>>,
}

impl ResourceSet {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn single(id: ResourceId, name: Arc<str>) -> Self {
        let mut set = Self::new();
        set.items.insert(id, name);
        set
    }

    /// Adds every member of `other`.
    pub fn extend(&mut self, other: &ResourceSet) {
        for (id, name) in &other.items {
            self.items.insert(*id, Arc::clone(name));
        }
    }

    /// Returns `self ∪ other`.
    pub fn union(&self, other: &ResourceSet) -> ResourceSet {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    /// Returns true if both sets share at least one resource.
    pub fn intersects(&self, other: &ResourceSet) -> bool {
        self.first_shared(other).is_some()
    }

    /// Name of the first (lowest id) resource present in both sets.
    pub fn first_shared<'a>(&'a self, other: &'a ResourceSet) -> Option<&'a str> {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .items
            .iter()
            .find(|(id, _)| large.items.contains_key(id))
            .map(|(_, name)| name.as_ref())
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates `(id, name)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &str)> {
        self.items.iter().map(|(id, name)| (*id, name.as_ref()))
    }

    /// Resource names in id order.
    pub fn names(&self) -> Vec<String> {
        self.items.values().map(|n| n.to_string()).collect()
    }
}

impl fmt::Debug for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.values()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> (ResourceId, Arc<str>) {
        (ResourceId::next(), Arc::from(name))
    }

    #[test]
    fn test_intersection_reports_shared_name() {
        let (arm, arm_name) = named("arm");
        let (wrist, wrist_name) = named("wrist");
        let (drive, drive_name) = named("drive");

        let a = ResourceSet::single(arm, Arc::clone(&arm_name))
            .union(&ResourceSet::single(wrist, wrist_name));
        let mut b = ResourceSet::single(drive, drive_name);
        assert!(!a.intersects(&b));

        b.extend(&ResourceSet::single(arm, arm_name));
        assert!(a.intersects(&b));
        assert_eq!(a.first_shared(&b), Some("arm"));
    }

    #[test]
    fn test_first_shared_borrows_from_smaller_side() {
        let (arm, arm_name) = named("arm");
        let (wrist, wrist_name) = named("wrist");
        let arm_only = ResourceSet::single(arm, Arc::clone(&arm_name));
        let both = arm_only.union(&ResourceSet::single(wrist, wrist_name));

        // the larger receiver scans the smaller argument
        let shared: Option<&str> = both.first_shared(&arm_only);
        assert_eq!(shared, Some("arm"));
        assert_eq!(arm_only.first_shared(&both), shared);
    }

    #[test]
    fn test_union_keeps_order() {
        let (first, first_name) = named("first");
        let (second, second_name) = named("second");
        let a = ResourceSet::single(second, second_name);
        let b = ResourceSet::single(first, first_name);
        let all = a.union(&b);
        assert_eq!(all.names(), vec!["first".to_string(), "second".to_string()]);
        assert!(all.contains(first) && all.contains(second));
        assert!(ResourceSet::new().is_empty());
    }
}
