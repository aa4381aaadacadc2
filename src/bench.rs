//! Benchmarking support for the topic router.
//!
//! Builds synthetic route sets shaped like a gateway's topic space: a few
//! hundred services, each owning a prefix and a handful of exact topics.

use crate::data_structures::routing_table::{RoutingStrategy, RoutingTable};

/// Number of exact topics registered per service.
const TOPICS_PER_SERVICE: usize = 4;

/// Generates `services` prefix routes and their exact topics.
///
/// Each entry pairs a topic with the index of the service owning it.
pub fn synthetic_routes(services: usize) -> Vec<(String, u32)> {
    let mut routes = Vec::with_capacity(services * (TOPICS_PER_SERVICE + 1));
    for service in 0..services {
        let owner = service as u32;
        let zone = service % 16;
        routes.push((format!("zone{zone}.svc{service}.events."), owner));
        for topic in 0..TOPICS_PER_SERVICE {
            routes.push((format!("zone{zone}.svc{service}.method{topic}"), owner));
        }
    }
    routes
}

/// Topics a broker would look up against [`synthetic_routes`].
pub fn synthetic_lookups(services: usize) -> Vec<String> {
    (0..services)
        .flat_map(|service| {
            let zone = service % 16;
            [
                format!("zone{zone}.svc{service}.events.changed.value"),
                format!("zone{zone}.svc{service}.method{}", service % TOPICS_PER_SERVICE),
            ]
        })
        .collect()
}

/// Builds a table holding [`synthetic_routes`] with the given strategy.
///
/// # Panics
///
/// Panics if the generated routes exceed the table's limits.
pub fn populated_table(services: usize, strategy: RoutingStrategy) -> RoutingTable<u32> {
    let mut table = RoutingTable::new();
    table.set_strategy(strategy);
    for (topic, owner) in synthetic_routes(services) {
        if let Err(err) = table.set_route(&topic, owner) {
            panic!("synthetic route {topic} rejected: {err}");
        }
    }
    table
}
