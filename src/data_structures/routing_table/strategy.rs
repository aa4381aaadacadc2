//! Lookup strategy selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The lookup algorithm used by [`RoutingTable::lookup`](super::RoutingTable::lookup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Walk to the node matching the full key and use its own value.
    Exhaustive,
    /// Walk the key and stop at the first node carrying a value.
    EarlyExit,
    /// Scan the sorted quick-match cache for the most specific prefix.
    #[default]
    QuickCache,
}

impl RoutingStrategy {
    /// All strategies, slowest first.
    pub const ALL: [RoutingStrategy; 3] = [
        RoutingStrategy::Exhaustive,
        RoutingStrategy::EarlyExit,
        RoutingStrategy::QuickCache,
    ];

    /// Canonical configuration name of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingStrategy::Exhaustive => "exhaustive",
            RoutingStrategy::EarlyExit => "early_exit",
            RoutingStrategy::QuickCache => "quick_cache",
        }
    }
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown routing strategy: {0}")]
pub struct ParseStrategyError(pub String);

impl FromStr for RoutingStrategy {
    type Err = ParseStrategyError;

    /// Accepts the configuration names as well as the historical
    /// `normal` / `optimization1` / `optimization2` aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exhaustive" | "normal" => Ok(RoutingStrategy::Exhaustive),
            "early_exit" | "early-exit" | "optimization1" => Ok(RoutingStrategy::EarlyExit),
            "quick_cache" | "quick-cache" | "optimization2" => Ok(RoutingStrategy::QuickCache),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("exhaustive", RoutingStrategy::Exhaustive)]
    #[test_case("normal", RoutingStrategy::Exhaustive)]
    #[test_case("early-exit", RoutingStrategy::EarlyExit)]
    #[test_case("Optimization1", RoutingStrategy::EarlyExit)]
    #[test_case("quick_cache", RoutingStrategy::QuickCache)]
    #[test_case(" optimization2 ", RoutingStrategy::QuickCache)]
    fn test_parse_strategy(name: &str, expected: RoutingStrategy) {
        assert_eq!(name.parse::<RoutingStrategy>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_strategy() {
        let err = "fastest".parse::<RoutingStrategy>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown routing strategy: fastest");
    }

    #[test]
    fn test_default_and_display() {
        assert_eq!(RoutingStrategy::default(), RoutingStrategy::QuickCache);
        for strategy in RoutingStrategy::ALL {
            assert_eq!(strategy.to_string().parse::<RoutingStrategy>().unwrap(), strategy);
        }
    }
}
