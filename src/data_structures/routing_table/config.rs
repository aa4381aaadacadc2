//! Configuration for the routing table.

use super::strategy::RoutingStrategy;

/// Default number of root slots.
pub const DEFAULT_ROOT_CAPACITY: usize = 100;

/// Keys of this length or longer are rejected.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 512;

/// Initial number of quick-match entries allocated.
pub const DEFAULT_QUICK_MATCH_CAPACITY: usize = 100;

/// First byte marking a key as literal.
pub const DEFAULT_LITERAL_MARKER: char = '_';

/// Configuration for a [`RoutingTable`](super::RoutingTable).
///
/// The limits are fixed for the lifetime of a table; only the strategy can be
/// changed afterwards.
///
/// # Examples
///
/// ```
/// use topic_router_lib::data_structures::{RoutingStrategy, RoutingTable, RoutingTableConfig};
///
/// let config = RoutingTableConfig::new()
///     .with_root_capacity(16)
///     .with_strategy(RoutingStrategy::EarlyExit);
/// assert_eq!(config.root_capacity(), 16);
///
/// let mut table = RoutingTable::with_config(config);
/// table.set_route("alerts.", 1u32).unwrap();
/// assert_eq!(table.lookup("alerts.disk.full"), Ok(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTableConfig {
    /// Number of slots in the root directory
    root_capacity: usize,

    /// Exclusive upper bound on key length in bytes
    max_key_length: usize,

    /// Initial capacity of the quick-match cache
    quick_match_capacity: usize,

    /// Keys starting with this character are stored whole
    literal_marker: char,

    /// Lookup strategy selected at construction
    strategy: RoutingStrategy,
}

impl RoutingTableConfig {
    /// Create a new default configuration.
    ///
    /// Default values:
    /// - root_capacity: 100
    /// - max_key_length: 512
    /// - quick_match_capacity: 100
    /// - literal_marker: `_`
    /// - strategy: quick-cache
    pub fn new() -> Self {
        Self {
            root_capacity: DEFAULT_ROOT_CAPACITY,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            quick_match_capacity: DEFAULT_QUICK_MATCH_CAPACITY,
            literal_marker: DEFAULT_LITERAL_MARKER,
            strategy: RoutingStrategy::default(),
        }
    }

    /// Set the number of root slots.
    ///
    /// Every distinct first token (and every literal key) occupies one slot,
    /// so this bounds the number of top-level topic families.
    ///
    /// # Arguments
    ///
    /// * `root_capacity` - Number of root directory slots
    ///
    /// # Panics
    ///
    /// Panics if `root_capacity` is zero.
    pub fn with_root_capacity(mut self, root_capacity: usize) -> Self {
        assert!(root_capacity > 0, "Root capacity must be greater than 0");
        self.root_capacity = root_capacity;
        self
    }

    /// Set the exclusive upper bound on key length.
    ///
    /// # Arguments
    ///
    /// * `max_key_length` - Keys of this many bytes or more are rejected
    ///
    /// # Panics
    ///
    /// Panics if `max_key_length` is smaller than 2, which would reject every key.
    pub fn with_max_key_length(mut self, max_key_length: usize) -> Self {
        assert!(max_key_length > 1, "Maximum key length must be at least 2");
        self.max_key_length = max_key_length;
        self
    }

    /// Set the initial capacity of the quick-match cache.
    ///
    /// The cache grows past this on demand; a close estimate of the number of
    /// topmost routes avoids reallocating on every rebuild.
    pub fn with_quick_match_capacity(mut self, quick_match_capacity: usize) -> Self {
        self.quick_match_capacity = quick_match_capacity;
        self
    }

    /// Set the character marking literal keys.
    ///
    /// Keys starting with the marker are never split into tokens and only
    /// match the identical key.
    ///
    /// # Panics
    ///
    /// Panics if the marker is the token separator.
    pub fn with_literal_marker(mut self, literal_marker: char) -> Self {
        assert!(
            literal_marker != super::key::TOKEN_SEPARATOR,
            "Literal marker cannot be the token separator"
        );
        self.literal_marker = literal_marker;
        self
    }

    /// Set the initial lookup strategy.
    ///
    /// # Arguments
    ///
    /// * `strategy` - Strategy used by [`RoutingTable::lookup`](super::RoutingTable::lookup)
    pub fn with_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns the number of root slots.
    pub fn root_capacity(&self) -> usize {
        self.root_capacity
    }

    /// Returns the exclusive upper bound on key length in bytes.
    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    /// Returns the initial capacity of the quick-match cache.
    pub fn quick_match_capacity(&self) -> usize {
        self.quick_match_capacity
    }

    /// Returns the character marking literal keys.
    pub fn literal_marker(&self) -> char {
        self.literal_marker
    }

    /// Returns the lookup strategy a new table starts with.
    pub fn strategy(&self) -> RoutingStrategy {
        self.strategy
    }
}

impl Default for RoutingTableConfig {
    fn default() -> Self {
        Self::new()
    }
}
