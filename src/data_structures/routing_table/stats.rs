//! Routing table statistics.

use std::fmt;

use serde::Serialize;

use super::strategy::RoutingStrategy;

/// Point-in-time counters describing a routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingStats {
    /// Occupied root directory slots
    pub root_nodes: usize,
    /// Nodes below the root directory
    pub dynamic_nodes: usize,
    /// Entries in the quick-match cache, as of its last rebuild
    pub quick_match_entries: usize,
    /// Whether the quick-match cache must be rebuilt before use
    pub quick_match_stale: bool,
    /// Active lookup strategy
    pub strategy: RoutingStrategy,
    /// Number of root directory slots
    pub root_capacity: usize,
}

impl RoutingStats {
    /// Total number of live nodes.
    pub fn total_nodes(&self) -> usize {
        self.root_nodes + self.dynamic_nodes
    }
}

impl fmt::Display for RoutingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Routing table stats: {}/{} root nodes, {} dynamic nodes, {} quick-match entries{}, strategy {}",
            self.root_nodes,
            self.root_capacity,
            self.dynamic_nodes,
            self.quick_match_entries,
            if self.quick_match_stale { " (stale)" } else { "" },
            self.strategy,
        )
    }
}
