//! Routing configuration for the topic router.
//!
//! This module defines the settings of the routing table: its lookup
//! strategy and the limits fixed when the table is built.

use serde::{Deserialize, Serialize};

use super::{ConfigResult, Validate};
use crate::data_structures::routing_table::{
    RoutingStrategy, RoutingTableConfig, DEFAULT_LITERAL_MARKER, DEFAULT_MAX_KEY_LENGTH,
    DEFAULT_QUICK_MATCH_CAPACITY, DEFAULT_ROOT_CAPACITY, TOKEN_SEPARATOR,
};
use crate::error::config::ConfigError;

/// Upper bound for `root_capacity`.
const MAX_ROOT_CAPACITY: usize = 65_536;

/// Upper bound for `max_key_length`.
const MAX_KEY_LENGTH_LIMIT: usize = 65_536;

/// Routing table configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Lookup strategy (exhaustive, early_exit, quick_cache)
    pub strategy: RoutingStrategy,

    /// Number of root directory slots
    pub root_capacity: usize,

    /// Keys of this length in bytes or longer are rejected
    pub max_key_length: usize,

    /// Initial capacity of the quick-match cache
    pub quick_match_capacity: usize,

    /// First character marking a literal key
    pub literal_marker: char,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: RoutingStrategy::default(),
            root_capacity: DEFAULT_ROOT_CAPACITY,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            quick_match_capacity: DEFAULT_QUICK_MATCH_CAPACITY,
            literal_marker: DEFAULT_LITERAL_MARKER,
        }
    }
}

impl RoutingConfig {
    /// Validates the settings and converts them into a table configuration.
    pub fn table_config(&self) -> ConfigResult<RoutingTableConfig> {
        self.validate()?;
        Ok(RoutingTableConfig::new()
            .with_root_capacity(self.root_capacity)
            .with_max_key_length(self.max_key_length)
            .with_quick_match_capacity(self.quick_match_capacity)
            .with_literal_marker(self.literal_marker)
            .with_strategy(self.strategy))
    }
}

impl Validate for RoutingConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.root_capacity == 0 || self.root_capacity > MAX_ROOT_CAPACITY {
            return Err(ConfigError::ValueOutOfRange {
                key: "routing.root_capacity".to_string(),
                message: format!("must be between 1 and {MAX_ROOT_CAPACITY}"),
            });
        }

        if self.max_key_length < 2 || self.max_key_length > MAX_KEY_LENGTH_LIMIT {
            return Err(ConfigError::ValueOutOfRange {
                key: "routing.max_key_length".to_string(),
                message: format!("must be between 2 and {MAX_KEY_LENGTH_LIMIT}"),
            });
        }

        if self.literal_marker == TOKEN_SEPARATOR
            || !self.literal_marker.is_ascii_graphic()
        {
            return Err(ConfigError::ValidationError(format!(
                "Invalid literal marker: {:?}",
                self.literal_marker
            )));
        }

        Ok(())
    }
}
