//! Topic Router Library
//!
//! This library contains the topic-routing core of a publish/subscribe
//! broker: the routing table that resolves hierarchical topics to
//! destinations, plus the configuration, logging and diagnostics around it.
//! It is used by the `topic_router` binary but can also be embedded by a
//! broker directly.
//!
//! # Example
//!
//! ```
//! use topic_router_lib::data_structures::RoutingTable;
//!
//! let mut table = RoutingTable::new();
//! table.set_route("device.wifi.", "wifi-manager").unwrap();
//! assert_eq!(table.lookup("device.wifi.ssid"), Ok("wifi-manager"));
//! ```

// Re-export public modules
pub mod config;
pub mod data_structures;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod route_file;

// Internal modules that are not part of the public API
#[cfg(test)]
pub(crate) mod tests;

// Feature-gated modules
#[cfg(feature = "benchmarking")]
pub mod bench;

/// Version information for the topic router.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
