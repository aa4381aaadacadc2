//! Route tables loaded from TOML.
//!
//! A route file lists topic-to-destination pairs:
//!
//! ```toml
//! [[route]]
//! topic = "device.wifi."
//! destination = "wifi-manager"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data_structures::routing_table::RoutingTable;
use crate::error::RouterResult;

/// One registered route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Topic key, hierarchical or literal
    pub topic: String,
    /// Destination the topic is forwarded to
    pub destination: String,
}

/// A set of routes to register at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFile {
    #[serde(default, rename = "route")]
    pub routes: Vec<RouteSpec>,
}

impl RouteFile {
    /// Reads and parses a route file.
    pub fn load(path: &Path) -> RouterResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> RouterResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Registers every route in `table`, stopping at the first rejected one.
    ///
    /// Returns the number of routes registered.
    pub fn apply(&self, table: &mut RoutingTable<String>) -> RouterResult<usize> {
        for route in &self.routes {
            table.set_route(&route.topic, route.destination.clone())?;
            debug!(topic = %route.topic, destination = %route.destination, "Route loaded");
        }
        Ok(self.routes.len())
    }

    /// Renders the file as TOML.
    pub fn to_toml(&self) -> RouterResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;

    const ROUTES: &str = r#"
        [[route]]
        topic = "device.wifi."
        destination = "wifi-manager"

        [[route]]
        topic = "device.eth"
        destination = "net-manager"

        [[route]]
        topic = "_RTROUTED.INBOX.SUBSCRIBE"
        destination = "router"
    "#;

    #[test]
    fn test_parse_and_apply() {
        let file = RouteFile::parse(ROUTES).unwrap();
        assert_eq!(file.routes.len(), 3);

        let mut table = RoutingTable::new();
        assert_eq!(file.apply(&mut table).unwrap(), 3);
        assert_eq!(table.lookup("device.wifi.ssid").unwrap(), "wifi-manager");
        assert_eq!(table.lookup("_RTROUTED.INBOX.SUBSCRIBE").unwrap(), "router");
    }

    #[test]
    fn test_apply_reports_rejected_route() {
        let file = RouteFile {
            routes: vec![
                RouteSpec {
                    topic: "a.b".to_string(),
                    destination: "one".to_string(),
                },
                RouteSpec {
                    topic: "a.b".to_string(),
                    destination: "two".to_string(),
                },
            ],
        };
        let mut table = RoutingTable::new();
        assert!(matches!(file.apply(&mut table), Err(RouterError::Route(_))));
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            RouteFile::parse("[[route]]\ntopic = 1"),
            Err(RouterError::TomlDe(_))
        ));
    }

    #[test]
    fn test_toml_output_parses_back() {
        let file = RouteFile::parse(ROUTES).unwrap();
        let text = file.to_toml().unwrap();
        assert!(text.contains("[[route]]"));
        assert_eq!(RouteFile::parse(&text).unwrap(), file);
    }

    #[test]
    fn test_empty_file() {
        assert!(RouteFile::parse("").unwrap().routes.is_empty());
    }
}
