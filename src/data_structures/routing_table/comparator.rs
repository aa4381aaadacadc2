//! Equivalence predicates for destination handles.
//!
//! The routing table never interprets the values it stores. Whether two
//! handles name the same destination (and may therefore be collapsed into a
//! common ancestor) is decided by a [`ValueComparator`].

use std::fmt;
use std::sync::Arc;

/// Decides whether two destination handles are interchangeable.
pub trait ValueComparator<V>: Send + Sync {
    /// Returns `true` if `incoming` routes to the same destination as `existing`.
    fn equivalent(&self, existing: &V, incoming: &V) -> bool;
}

/// Shared, replaceable comparator as stored by the routing table.
pub type SharedComparator<V> = Arc<dyn ValueComparator<V>>;

/// Default comparator: handles are equivalent when they are equal.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandleEquality;

impl<V: PartialEq> ValueComparator<V> for HandleEquality {
    fn equivalent(&self, existing: &V, incoming: &V) -> bool {
        existing == incoming
    }
}

/// Adapts a closure into a [`ValueComparator`].
pub struct ComparatorFn<F>(pub F);

impl<V, F> ValueComparator<V> for ComparatorFn<F>
where
    F: Fn(&V, &V) -> bool + Send + Sync,
{
    fn equivalent(&self, existing: &V, incoming: &V) -> bool {
        (self.0)(existing, incoming)
    }
}

impl<F> fmt::Debug for ComparatorFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComparatorFn")
    }
}
