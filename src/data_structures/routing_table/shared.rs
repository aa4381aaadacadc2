//! Reader/writer wrapper around a routing table.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

use super::{RouteResult, RoutingStats, RoutingStrategy, RoutingTable};

/// A [`RoutingTable`] shared between threads.
///
/// Lookups take the read lock. Mutations take the write lock, and so does a
/// quick-cache lookup that finds the cache stale: it rebuilds the cache, then
/// downgrades to a read lock to resolve the key.
#[derive(Debug)]
pub struct SharedRoutingTable<V> {
    inner: RwLock<RoutingTable<V>>,
}

impl<V: Clone> SharedRoutingTable<V> {
    /// Wraps `table` for shared access.
    ///
    /// # Arguments
    ///
    /// * `table` - The table to share, possibly already populated
    pub fn new(table: RoutingTable<V>) -> Self {
        Self {
            inner: RwLock::new(table),
        }
    }

    /// Resolves `key` with the active strategy.
    ///
    /// # Arguments
    ///
    /// * `key` - Topic to resolve
    ///
    /// # Returns
    ///
    /// The destination for `key`, or the error [`RoutingTable::lookup`]
    /// would return.
    pub fn lookup(&self, key: &str) -> RouteResult<V> {
        let table = self.inner.read();
        if table.strategy() != RoutingStrategy::QuickCache || !table.needs_quick_match_refresh() {
            return table.resolve(key);
        }
        drop(table);

        let mut table = self.inner.write();
        // Another writer may have rebuilt the cache in the meantime.
        if table.needs_quick_match_refresh() {
            if let Err(err) = table.refresh_quick_match_cache() {
                warn!(error = %err, "Cannot generate quick-match expressions");
            }
        }
        RwLockWriteGuard::downgrade(table).resolve(key)
    }

    /// Registers `key` under the write lock. See [`RoutingTable::set_route`].
    pub fn set_route(&self, key: &str, value: V) -> RouteResult<()> {
        self.inner.write().set_route(key, value)
    }

    /// Removes the route registered for `key` under the write lock.
    pub fn remove_route(&self, key: &str) -> RouteResult<()> {
        self.inner.write().remove_route(key)
    }

    /// Removes every route to `value`.
    ///
    /// # Returns
    ///
    /// The number of registered routes removed.
    pub fn remove_all_routes_for_value(&self, value: &V) -> RouteResult<usize> {
        self.inner.write().remove_all_routes_for_value(value)
    }

    /// Lists the registered keys routed to `value`, sorted.
    pub fn find_all_routes_for_value(&self, value: &V) -> RouteResult<Vec<String>> {
        self.inner.read().find_all_routes_for_value(value)
    }

    /// Switches the lookup strategy for every reader.
    pub fn set_strategy(&self, strategy: RoutingStrategy) {
        self.inner.write().set_strategy(strategy);
    }

    /// Returns the active lookup strategy.
    pub fn strategy(&self) -> RoutingStrategy {
        self.inner.read().strategy()
    }

    /// Takes a snapshot of the table's counters.
    pub fn statistics(&self) -> RoutingStats {
        self.inner.read().statistics()
    }

    /// Locks the table for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, RoutingTable<V>> {
        self.inner.read()
    }

    /// Locks the table for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, RoutingTable<V>> {
        self.inner.write()
    }

    /// Consumes the wrapper, returning the table.
    pub fn into_inner(self) -> RoutingTable<V> {
        self.inner.into_inner()
    }
}

impl<V: Clone> From<RoutingTable<V>> for SharedRoutingTable<V> {
    fn from(table: RoutingTable<V>) -> Self {
        Self::new(table)
    }
}
