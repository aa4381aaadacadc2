//! Data structures for the topic router.
//!
//! This module contains the routing table: the trie that resolves topics to
//! destinations, together with its cache, configuration and error types.

pub mod routing_table;

// Re-export common data structures
pub use routing_table::{
    RouteError, RouteResult, RoutingStrategy, RoutingTable, RoutingTableConfig,
    SharedRoutingTable,
};
