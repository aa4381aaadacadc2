//! Topic routing table.
//!
//! This module provides the trie that maps hierarchical, dot-separated topics
//! to destination handles. A route registered for a key ending in the
//! separator (`"device.wifi."`) acts as a prefix subscription: every topic
//! below it resolves to the same destination unless a more specific route
//! takes over.
//!
//! Key features:
//! * Three interchangeable lookup strategies (see [`RoutingStrategy`])
//! * Collapsing: a node whose children all route to equivalent destinations
//!   carries that destination itself, so lookups can stop early
//! * A flattened, sorted quick-match cache rebuilt lazily after mutations
//! * Allocation and capacity are reserved before any node is touched, so a
//!   failed mutation leaves the table unchanged
//!
//! The table itself is not synchronized; see [`SharedRoutingTable`] for a
//! reader/writer wrapper.

mod comparator;
mod config;
mod error;
mod key;
mod node;
mod quick_match;
mod root_directory;
mod shared;
mod stats;
mod strategy;

use std::fmt::{self, Write as _};
use std::iter;
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use comparator::{ComparatorFn, HandleEquality, SharedComparator, ValueComparator};
pub use config::{
    RoutingTableConfig, DEFAULT_LITERAL_MARKER, DEFAULT_MAX_KEY_LENGTH,
    DEFAULT_QUICK_MATCH_CAPACITY, DEFAULT_ROOT_CAPACITY,
};
pub use error::RouteError;
pub use key::TOKEN_SEPARATOR;
pub use quick_match::{BundleMode, QuickMatchEntry};
pub use shared::SharedRoutingTable;
pub use stats::RoutingStats;
pub use strategy::{ParseStrategyError, RoutingStrategy};

use key::{copy_str, head_token, tokens, KeyKind, Segment, SegmentKind};
use node::{Node, NodeArena, NodeId};
use quick_match::{push_entry, QuickMatchCache};
use root_directory::RootDirectory;

/// Result type for routing table operations
pub type RouteResult<T> = Result<T, RouteError>;

/// Logs a broken structural invariant. Debug builds panic instead.
fn check_invariant(holds: bool, message: &'static str) -> bool {
    if !holds {
        warn!("Routing table invariant violated: {}", message);
        debug_assert!(holds, "{}", message);
    }
    holds
}

/// Where a new chain of nodes is attached.
enum Anchor {
    /// Below an existing node.
    Child(NodeId),
    /// As a new root registered under the given index key.
    Root(String),
}

/// Iterator over the nodes matching successive tokens of a key.
struct PathWalk<'t, 'k, V> {
    arena: &'t NodeArena<V>,
    next: Option<NodeId>,
    rest: &'k str,
}

impl<'t, 'k, V> PathWalk<'t, 'k, V> {
    /// The part of the key not matched by the nodes yielded so far.
    fn remaining(&self) -> &'k str {
        self.rest
    }
}

impl<'t, 'k, V> Iterator for PathWalk<'t, 'k, V> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        let arena = self.arena;
        let node = &arena[id];
        self.rest = &self.rest[node.segment.len()..];
        if !self.rest.is_empty() {
            let rest = self.rest;
            self.next = node
                .children
                .iter()
                .copied()
                .find(|&child| arena[child].segment.matches_head(rest));
        }
        Some(id)
    }
}

/// A trie of topic segments resolving keys to destination handles.
///
/// Values are opaque to the table: they are cloned into nodes and cache
/// entries and only ever compared through the table's [`ValueComparator`].
/// Cheap handles (ids, `Arc`s) are the intended payload.
///
/// The table maintains one structural invariant: a node carrying a value has
/// only descendants carrying an equivalent value. Insertion clears values on
/// the path that no longer apply uniformly; removal re-collapses parents
/// whose remaining children agree.
pub struct RoutingTable<V> {
    /// Owner of every node
    arena: NodeArena<V>,

    /// Entry points for every traversal
    roots: RootDirectory,

    /// Snapshot used by the quick-cache strategy
    quick_match: QuickMatchCache<V>,

    /// Equivalence predicate for values
    comparator: SharedComparator<V>,

    /// Limits fixed at construction
    config: RoutingTableConfig,

    /// Active lookup strategy
    strategy: RoutingStrategy,
}

impl<V: Clone + PartialEq> RoutingTable<V> {
    /// Creates an empty table with default configuration, comparing values by equality.
    pub fn new() -> Self {
        Self::with_config(RoutingTableConfig::default())
    }

    /// Creates an empty table with the given configuration, comparing values by equality.
    ///
    /// # Arguments
    ///
    /// * `config` - Limits and initial strategy for the table
    pub fn with_config(config: RoutingTableConfig) -> Self {
        Self::with_comparator(config, Arc::new(HandleEquality))
    }

    /// Installs a custom equivalence predicate, or restores equality with `None`.
    ///
    /// Every node is re-evaluated under the new predicate, deepest first:
    /// collapsed values that no longer hold are dropped, parents whose children
    /// now agree are collapsed, and a registered prefix whose more specific
    /// routes no longer agree with it is withdrawn, as on insertion.
    ///
    /// # Arguments
    ///
    /// * `comparator` - The predicate to install, `None` for handle equality
    ///
    /// # Errors
    ///
    /// [`RouteError::OutOfMemory`] if the pass cannot be prepared. The previous
    /// predicate then stays installed and the table is unchanged.
    pub fn set_value_comparator(&mut self, comparator: Option<SharedComparator<V>>) -> RouteResult<()> {
        let order = self.collect_forest()?;
        self.comparator = comparator.unwrap_or_else(|| Arc::new(HandleEquality));
        self.reoptimize(&order);
        self.quick_match.invalidate();
        debug!(nodes = order.len(), "Value comparator replaced");
        Ok(())
    }
}

impl<V: Clone + PartialEq> Default for RoutingTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> RoutingTable<V> {
    /// Creates an empty table using `comparator` to decide value equivalence.
    ///
    /// Use this for handles without `PartialEq`, or when several handles
    /// stand for the same destination.
    ///
    /// # Arguments
    ///
    /// * `config` - Limits and initial strategy for the table
    /// * `comparator` - Predicate deciding whether two values are interchangeable
    pub fn with_comparator(config: RoutingTableConfig, comparator: SharedComparator<V>) -> Self {
        Self {
            arena: NodeArena::new(),
            roots: RootDirectory::new(config.root_capacity()),
            quick_match: QuickMatchCache::new(config.quick_match_capacity()),
            comparator,
            strategy: config.strategy(),
            config,
        }
    }

    /// Configuration the table was built with.
    pub fn config(&self) -> &RoutingTableConfig {
        &self.config
    }

    /// Active lookup strategy.
    pub fn strategy(&self) -> RoutingStrategy {
        self.strategy
    }

    /// Selects the lookup strategy used by [`RoutingTable::lookup`].
    pub fn set_strategy(&mut self, strategy: RoutingStrategy) {
        if self.strategy != strategy {
            info!(from = %self.strategy, to = %strategy, "Routing strategy changed");
        }
        self.strategy = strategy;
    }

    /// Returns `true` if no route is registered.
    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    /// Registers a route from `key` to `value`.
    ///
    /// Hierarchical keys are split into tokens and materialized as a chain of
    /// nodes. Keys starting with the literal marker are stored whole; an
    /// existing literal route has its value refreshed in place.
    ///
    /// A key ending in the separator is a prefix subscription. A broker must
    /// be ready for one to be refused: when more specific routes below the
    /// prefix already lead to other destinations, the prefix could not
    /// resolve uniformly and [`RouteError::ConflictingRoute`] is returned.
    /// Registering the more specific routes after the prefix is accepted and
    /// withdraws the prefix instead.
    ///
    /// # Arguments
    ///
    /// * `key` - Topic key, hierarchical or literal
    /// * `value` - Destination handle the key resolves to
    ///
    /// # Errors
    ///
    /// * [`RouteError::InvalidKey`] for empty, oversized or malformed keys
    /// * [`RouteError::DuplicateRoute`] if the key already resolves exactly
    /// * [`RouteError::ConflictingRoute`] if the key names a branch whose
    ///   more specific routes lead elsewhere
    /// * [`RouteError::CapacityExceeded`] if a new root is needed and the
    ///   root directory is full
    /// * [`RouteError::OutOfMemory`] if an allocation fails
    ///
    /// The table is unchanged after any error.
    ///
    /// # Examples
    ///
    /// ```
    /// use topic_router_lib::data_structures::{RouteError, RoutingTable};
    ///
    /// let mut table = RoutingTable::new();
    /// table.set_route("device.wifi", "wifi-manager").unwrap();
    /// table.set_route("device.eth", "net-manager").unwrap();
    ///
    /// assert_eq!(
    ///     table.set_route("device.", "monitor"),
    ///     Err(RouteError::ConflictingRoute("device.".to_string()))
    /// );
    /// assert_eq!(table.lookup("device.wifi"), Ok("wifi-manager"));
    /// ```
    pub fn set_route(&mut self, key: &str, value: V) -> RouteResult<()> {
        let roots_before = self.roots.len();
        let nodes_before = self.arena.len();

        let result = self.key_kind(key).and_then(|kind| match kind {
            KeyKind::Literal => self.set_literal_route(key, value),
            KeyKind::Hierarchical => self.set_hierarchical_route(key, value),
        });

        match &result {
            Ok(()) => {
                self.quick_match.invalidate();
                let added_roots = self.roots.len() - roots_before;
                debug!(
                    key,
                    added_roots,
                    added_dynamic_nodes = self.arena.len() - nodes_before - added_roots,
                    "Route set"
                );
            }
            Err(err) => tracing::error!(key, error = %err, "Rejecting route"),
        }
        result
    }

    fn set_literal_route(&mut self, key: &str, value: V) -> RouteResult<()> {
        if let Some(id) = self.roots.find(key) {
            warn!(key, "Found existing literal route, setting new value");
            let node = &mut self.arena[id];
            node.value = Some(value);
            node.routed = true;
            return Ok(());
        }

        self.roots.try_reserve()?;
        self.arena.try_reserve(1)?;
        let segment = Segment::literal(key)?;
        let index_key = copy_str(key)?;

        let id = self.arena.insert(Node::new(segment, Some(value), true, None));
        self.attach_root(index_key, id)
    }

    fn set_hierarchical_route(&mut self, key: &str, value: V) -> RouteResult<()> {
        if self.exhaustive(key, KeyKind::Hierarchical).is_some() {
            return Err(RouteError::DuplicateRoute(key.to_string()));
        }

        let (path, rest) = self.trace_path(key)?;
        if rest.is_empty() {
            return self.route_existing_node(key, &path, value);
        }

        // Reserve everything the new chain needs before touching the trie.
        let count = tokens(rest).count();
        self.arena.try_reserve(count)?;
        let anchor = match path.last() {
            Some(&parent) => {
                self.arena[parent]
                    .children
                    .try_reserve(1)
                    .map_err(|_| RouteError::OutOfMemory("growing a child list"))?;
                Anchor::Child(parent)
            }
            None => {
                self.roots.try_reserve()?;
                Anchor::Root(copy_str(head_token(rest))?)
            }
        };

        let mut pending = Vec::new();
        pending
            .try_reserve_exact(count)
            .map_err(|_| RouteError::OutOfMemory("building a node chain"))?;
        for (position, token) in tokens(rest).enumerate() {
            let terminal = position + 1 == count;
            let mut node = Node::new(Segment::from_token(token)?, Some(value.clone()), terminal, None);
            if !terminal {
                node.children
                    .try_reserve_exact(1)
                    .map_err(|_| RouteError::OutOfMemory("building a node chain"))?;
            }
            pending.push(node);
        }

        let mut pending = pending.into_iter();
        let (mut parent, revise_from) = match anchor {
            Anchor::Child(parent) => {
                self.deoptimize(&path, &value);
                (parent, Some(parent))
            }
            Anchor::Root(index_key) => {
                let root = pending
                    .next()
                    .ok_or_else(|| RouteError::invalid_key(key, "empty token"))?;
                let id = self.arena.insert(root);
                self.attach_root(index_key, id)?;
                (id, None)
            }
        };

        for mut node in pending {
            node.parent = Some(parent);
            let id = self.arena.insert(node);
            self.arena[parent].children.push(id);
            parent = id;
        }

        self.revise_upstream_optimization(revise_from);
        Ok(())
    }

    /// Attaches `value` to a node that already exists for the full key.
    fn route_existing_node(&mut self, key: &str, path: &[NodeId], value: V) -> RouteResult<()> {
        let (&target, ancestors) = path
            .split_last()
            .ok_or_else(|| RouteError::not_found(key))?;

        let node = &self.arena[target];
        if !check_invariant(node.value.is_none(), "unresolved key names a valued node") {
            return Err(RouteError::DuplicateRoute(key.to_string()));
        }
        if !node.children.is_empty() && !self.children_equivalent_to(target, &value) {
            return Err(RouteError::ConflictingRoute(key.to_string()));
        }

        self.deoptimize(ancestors, &value);
        let node = &mut self.arena[target];
        node.value = Some(value);
        node.routed = true;
        let parent = node.parent;
        self.revise_upstream_optimization(parent);
        Ok(())
    }

    /// Clears values on `path` that disagree with `value`, stopping at the
    /// first equivalent one.
    fn deoptimize(&mut self, path: &[NodeId], value: &V) {
        for &id in path {
            let node = &mut self.arena[id];
            let equivalent = node
                .value
                .as_ref()
                .map(|existing| self.comparator.equivalent(existing, value));
            match equivalent {
                Some(true) => {
                    debug!(
                        segment = node.segment.as_str(),
                        "Value is equivalent, downstream tree already consistent"
                    );
                    break;
                }
                Some(false) => {
                    debug!(
                        segment = node.segment.as_str(),
                        "Value is not equivalent, cancelling optimization"
                    );
                    node.value = None;
                    node.routed = false;
                }
                None => {}
            }
        }
    }

    fn attach_root(&mut self, index_key: String, id: NodeId) -> RouteResult<()> {
        match self.roots.insert(index_key, id) {
            Ok(slot) => {
                debug!(slot, segment = self.arena[id].segment.as_str(), "Root node added");
                Ok(())
            }
            Err(err) => {
                self.arena.remove(id);
                Err(err)
            }
        }
    }

    /// Resolves `key` with the active strategy.
    ///
    /// Under [`RoutingStrategy::QuickCache`] a stale cache is rebuilt first.
    ///
    /// # Arguments
    ///
    /// * `key` - Topic to resolve
    ///
    /// # Returns
    ///
    /// * `Ok(value)` with the destination the topic resolves to
    /// * `Err(RouteError::NotFound)` if no route covers the topic
    /// * `Err(RouteError::InvalidKey)` if the topic is malformed
    pub fn lookup(&mut self, key: &str) -> RouteResult<V> {
        if self.strategy == RoutingStrategy::QuickCache {
            self.ensure_quick_match();
        }
        self.resolve(key)
    }

    /// Resolves `key` with the active strategy without mutating the table.
    ///
    /// A stale quick-match cache is bypassed in favor of the early-exit walk,
    /// which yields the same result.
    pub fn resolve(&self, key: &str) -> RouteResult<V> {
        let kind = self.key_kind(key)?;
        let value = match self.strategy {
            RoutingStrategy::Exhaustive => self.exhaustive(key, kind),
            RoutingStrategy::EarlyExit => self.early_exit(key, kind),
            RoutingStrategy::QuickCache => self.quick(key, kind),
        };
        value.cloned().ok_or_else(|| RouteError::not_found(key))
    }

    /// Resolves `key` only through the node matching it exactly.
    ///
    /// Topics below a prefix route are not resolved; use
    /// [`RoutingTable::lookup_early_exit`] for those.
    pub fn lookup_exhaustive(&self, key: &str) -> RouteResult<V> {
        let kind = self.key_kind(key)?;
        self.exhaustive(key, kind)
            .cloned()
            .ok_or_else(|| RouteError::not_found(key))
    }

    /// Resolves `key` through the first valued node on its path.
    pub fn lookup_early_exit(&self, key: &str) -> RouteResult<V> {
        let kind = self.key_kind(key)?;
        self.early_exit(key, kind)
            .cloned()
            .ok_or_else(|| RouteError::not_found(key))
    }

    /// Resolves `key` through the quick-match cache, rebuilding it if needed.
    pub fn lookup_quick(&mut self, key: &str) -> RouteResult<V> {
        let kind = self.key_kind(key)?;
        self.ensure_quick_match();
        self.quick(key, kind)
            .cloned()
            .ok_or_else(|| RouteError::not_found(key))
    }

    fn exhaustive(&self, key: &str, kind: KeyKind) -> Option<&V> {
        self.find_exact(key, kind)
            .and_then(|id| self.arena[id].value.as_ref())
    }

    fn early_exit(&self, key: &str, kind: KeyKind) -> Option<&V> {
        self.walk(key, kind)
            .find_map(|id| self.arena[id].value.as_ref())
    }

    fn quick(&self, key: &str, kind: KeyKind) -> Option<&V> {
        if self.quick_match.is_stale() {
            return self.early_exit(key, kind);
        }
        self.quick_match.find(key).map(QuickMatchEntry::value)
    }

    /// Returns `true` if the next quick-cache lookup will rebuild the cache.
    pub fn needs_quick_match_refresh(&self) -> bool {
        self.quick_match.is_stale()
    }

    /// Rebuilds the quick-match cache from the current trie.
    ///
    /// # Errors
    ///
    /// [`RouteError::OutOfMemory`] if the entries cannot be allocated. The
    /// cache stays stale and quick lookups keep falling back to early-exit.
    pub fn refresh_quick_match_cache(&mut self) -> RouteResult<()> {
        let entries = self.collect_bundle(
            self.roots.iter(),
            BundleMode::Complete,
            self.config.quick_match_capacity(),
        )?;
        self.quick_match.replace(entries);
        debug!(entries = self.quick_match.len(), "Quick-match cache rebuilt");
        Ok(())
    }

    fn ensure_quick_match(&mut self) {
        if self.quick_match.is_stale() {
            if let Err(err) = self.refresh_quick_match_cache() {
                warn!(error = %err, "Cannot generate quick-match expressions");
            }
        }
    }

    /// Removes the route registered for `key` together with every more
    /// specific route below it.
    ///
    /// Ancestors left without children and without a route of their own are
    /// removed too; a root removed this way frees its directory slot. Parents
    /// whose remaining children agree are collapsed again.
    ///
    /// # Arguments
    ///
    /// * `key` - The key exactly as it was registered
    ///
    /// # Errors
    ///
    /// [`RouteError::NotFound`] if no route was registered for `key`. A node
    /// that only carries a value collapsed from its children does not count,
    /// so removing `"a."` never takes `"a.b"` and `"a.c"` with it unless
    /// `"a."` itself was registered.
    pub fn remove_route(&mut self, key: &str) -> RouteResult<()> {
        let kind = self.key_kind(key)?;
        let target = self
            .find_exact(key, kind)
            .filter(|&id| self.arena[id].routed)
            .ok_or_else(|| RouteError::not_found(key))?;

        let removed = self.remove_subtree(target)?;
        self.quick_match.invalidate();
        debug!(key, removed_routes = removed, "Route removed");
        Ok(())
    }

    /// Removes every route whose value is equivalent to `value`.
    ///
    /// Used when a destination goes away: every subtree resolving to it is
    /// detached, then the remaining tree is re-collapsed.
    ///
    /// # Arguments
    ///
    /// * `value` - The destination being removed
    ///
    /// # Returns
    ///
    /// The number of registered routes removed, zero if none matched.
    pub fn remove_all_routes_for_value(&mut self, value: &V) -> RouteResult<usize> {
        let mut removed = 0;
        loop {
            let matches = self.topmost_matching(value)?;
            if matches.is_empty() {
                break;
            }
            for id in matches {
                let still_matches = self.arena.contains(id)
                    && self.arena[id]
                        .value
                        .as_ref()
                        .map_or(false, |existing| self.comparator.equivalent(existing, value));
                if still_matches {
                    removed += self.remove_subtree(id)?;
                }
            }
            self.quick_match.invalidate();
        }
        info!(removed_routes = removed, "Removed all routes for value");
        Ok(removed)
    }

    /// Lists the registered keys whose value is equivalent to `value`.
    ///
    /// # Arguments
    ///
    /// * `value` - The destination to search for
    ///
    /// # Returns
    ///
    /// The keys in ascending order. Nodes that only carry a collapsed value
    /// are not listed.
    pub fn find_all_routes_for_value(&self, value: &V) -> RouteResult<Vec<String>> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            let node = &self.arena[id];
            let matches = node
                .value
                .as_ref()
                .map_or(false, |existing| self.comparator.equivalent(existing, value));
            if node.routed && matches {
                found.push(self.full_path(id)?);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found.sort_unstable();
        Ok(found)
    }

    /// Returns the minimal set of paths below `expression` that resolve to
    /// distinct destinations, sorted in descending order.
    ///
    /// # Arguments
    ///
    /// * `expression` - Key naming an existing node, typically a prefix
    ///
    /// # Errors
    ///
    /// [`RouteError::NotFound`] if no node matches `expression` exactly.
    pub fn resolvable_endpoints_for(&self, expression: &str) -> RouteResult<Vec<QuickMatchEntry<V>>> {
        let kind = self.key_kind(expression)?;
        let id = self
            .find_exact(expression, kind)
            .ok_or_else(|| RouteError::not_found(expression))?;
        let mut entries = self.collect_bundle(iter::once(id), BundleMode::Trimmed, 0)?;
        entries.sort_unstable_by(quick_match::descending);
        Ok(entries)
    }

    /// Current counters.
    pub fn statistics(&self) -> RoutingStats {
        RoutingStats {
            root_nodes: self.roots.len(),
            dynamic_nodes: self.arena.len() - self.roots.len(),
            quick_match_entries: self.quick_match.len(),
            quick_match_stale: self.quick_match.is_stale(),
            strategy: self.strategy,
            root_capacity: self.roots.capacity(),
        }
    }

    /// Logs and returns the current counters.
    pub fn dump_statistics(&self) -> RoutingStats {
        let stats = self.statistics();
        info!("{}", stats);
        stats
    }

    /// Renders the trie, one node per line.
    ///
    /// Each line reads `<segment> children:N optimized? Y|N`, indented by four
    /// spaces per level with roots at level one. `Y` marks nodes carrying a
    /// value.
    pub fn trace_tree(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeId, usize)> = self.roots.iter().rev().map(|id| (id, 1)).collect();
        while let Some((id, depth)) = stack.pop() {
            let node = &self.arena[id];
            let _ = writeln!(
                out,
                "{:indent$}<{}> children:{} optimized? {}",
                "",
                node.segment.as_str(),
                node.children.len(),
                if node.value.is_some() { 'Y' } else { 'N' },
                indent = depth * 4,
            );
            stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
        }
        out
    }

    /// Rebuilds the quick-match cache if needed, logs and returns its entries.
    pub fn dump_quick_match_expressions(&mut self) -> RouteResult<&[QuickMatchEntry<V>]> {
        if self.quick_match.is_stale() {
            self.refresh_quick_match_cache()?;
        }
        info!("Begin quick match expressions:");
        for (number, entry) in self.quick_match.entries().iter().enumerate() {
            info!("Expression #{} {}", number + 1, entry.path());
        }
        info!("End quick match expressions");
        Ok(self.quick_match.entries())
    }

    fn key_kind(&self, key: &str) -> RouteResult<KeyKind> {
        key::classify(key, self.config.max_key_length(), self.config.literal_marker())
    }

    /// Starts a walk along `key` from its root.
    fn walk<'k>(&self, key: &'k str, kind: KeyKind) -> PathWalk<'_, 'k, V> {
        let head = match kind {
            KeyKind::Literal => key,
            KeyKind::Hierarchical => head_token(key),
        };
        let next = self
            .roots
            .find(head)
            .filter(|&root| self.arena[root].segment.matches_head(key));
        PathWalk {
            arena: &self.arena,
            next,
            rest: key,
        }
    }

    /// Node whose path spells exactly `key`.
    fn find_exact(&self, key: &str, kind: KeyKind) -> Option<NodeId> {
        let mut walk = self.walk(key, kind);
        let last = walk.by_ref().last()?;
        walk.remaining().is_empty().then_some(last)
    }

    /// Nodes matched by `key` and the unmatched remainder.
    fn trace_path<'k>(&self, key: &'k str) -> RouteResult<(Vec<NodeId>, &'k str)> {
        let mut path = Vec::new();
        path.try_reserve(tokens(key).count())
            .map_err(|_| RouteError::OutOfMemory("tracing a key path"))?;
        let mut walk = self.walk(key, KeyKind::Hierarchical);
        path.extend(walk.by_ref());
        Ok((path, walk.remaining()))
    }

    fn children_equivalent_to(&self, id: NodeId, value: &V) -> bool {
        self.arena[id].children.iter().all(|&child| {
            self.arena[child]
                .value
                .as_ref()
                .map_or(false, |existing| self.comparator.equivalent(existing, value))
        })
    }

    /// Value shared by every child of `id`, if they all carry an equivalent one.
    fn uniform_child_value(&self, id: NodeId) -> Option<V> {
        let mut values = self.arena[id]
            .children
            .iter()
            .map(|&child| self.arena[child].value.as_ref());
        let first = values.next()??;
        values
            .all(|value| value.map_or(false, |value| self.comparator.equivalent(first, value)))
            .then(|| first.clone())
    }

    /// Detaches and frees the subtree rooted at `target`, then repairs the
    /// ancestors. Returns the number of registered routes freed.
    fn remove_subtree(&mut self, target: NodeId) -> RouteResult<usize> {
        let doomed = self.collect_subtree(target)?;
        let parent = self.arena[target].parent;
        match parent {
            Some(parent) => self.arena[parent].children.retain(|&child| child != target),
            None => self.release_root(target),
        }

        let mut routed = 0;
        for id in doomed.into_iter().rev() {
            match self.arena.remove(id) {
                Some(node) => routed += usize::from(node.routed),
                None => {
                    check_invariant(false, "subtree node released twice");
                }
            }
        }

        self.revise_upstream_optimization(parent);
        Ok(routed)
    }

    /// Ids of `target` and all its descendants in pre-order.
    fn collect_subtree(&self, target: NodeId) -> RouteResult<Vec<NodeId>> {
        let oom = |_| RouteError::OutOfMemory("collecting a subtree");
        let mut order = Vec::new();
        let mut stack = Vec::new();
        stack.try_reserve(1).map_err(oom)?;
        stack.push(target);
        while let Some(id) = stack.pop() {
            order.try_reserve(1).map_err(oom)?;
            order.push(id);
            let children = &self.arena[id].children;
            stack.try_reserve(children.len()).map_err(oom)?;
            stack.extend(children.iter().copied());
        }
        Ok(order)
    }

    /// Ids of every node, each parent before its children.
    fn collect_forest(&self) -> RouteResult<Vec<NodeId>> {
        let mut order = Vec::new();
        order
            .try_reserve_exact(self.arena.len())
            .map_err(|_| RouteError::OutOfMemory("collecting the trie"))?;
        for root in self.roots.iter() {
            order.extend(self.collect_subtree(root)?);
        }
        Ok(order)
    }

    /// Re-derives the value of every inner node in `order` from its children,
    /// walking it backwards so children are settled before their parent.
    fn reoptimize(&mut self, order: &[NodeId]) {
        for &id in order.iter().rev() {
            let node = &self.arena[id];
            if node.children.is_empty() {
                continue;
            }
            if node.routed {
                let holds = node
                    .value
                    .as_ref()
                    .map_or(false, |value| self.children_equivalent_to(id, value));
                if holds {
                    continue;
                }
                warn!(
                    segment = node.segment.as_str(),
                    "More specific routes disagree under the new comparator, withdrawing route"
                );
            }
            let value = self.uniform_child_value(id);
            let node = &mut self.arena[id];
            node.value = value;
            node.routed = false;
        }
    }

    /// Vacates the directory slot of root `id`.
    fn release_root(&mut self, id: NodeId) {
        let segment = self.arena[id].segment.as_str();
        let released = self.roots.remove(segment) == Some(id);
        check_invariant(released, "released root missing from directory");
        debug!(segment, "Root node decommissioned");
    }

    /// Walks up from `start`, pruning structural nodes left without children
    /// and collapsing parents whose children all agree.
    fn revise_upstream_optimization(&mut self, start: Option<NodeId>) {
        let mut current = start;
        while let Some(id) = current {
            let node = &self.arena[id];
            let parent = node.parent;

            if node.children.is_empty() {
                if node.routed {
                    break;
                }
                debug!(segment = node.segment.as_str(), "Removing structural node without children");
                match parent {
                    Some(parent) => self.arena[parent].children.retain(|&child| child != id),
                    None => self.release_root(id),
                }
                self.arena.remove(id);
                current = parent;
                continue;
            }

            if node.value.is_some() {
                break;
            }
            match self.uniform_child_value(id) {
                Some(value) => {
                    debug!(
                        segment = self.arena[id].segment.as_str(),
                        "All children are equivalent, collapsing"
                    );
                    self.arena[id].value = Some(value);
                    current = parent;
                }
                None => break,
            }
        }
    }

    /// Topmost nodes whose value is equivalent to `value`.
    fn topmost_matching(&self, value: &V) -> RouteResult<Vec<NodeId>> {
        let oom = |_| RouteError::OutOfMemory("collecting matching routes");
        let mut found = Vec::new();
        let mut stack = Vec::new();
        stack.try_reserve(self.roots.len()).map_err(oom)?;
        stack.extend(self.roots.iter().rev());
        while let Some(id) = stack.pop() {
            let node = &self.arena[id];
            match &node.value {
                Some(existing) => {
                    if self.comparator.equivalent(existing, value) {
                        found.try_reserve(1).map_err(oom)?;
                        found.push(id);
                    }
                }
                None => {
                    stack.try_reserve(node.children.len()).map_err(oom)?;
                    stack.extend(node.children.iter().rev().copied());
                }
            }
        }
        Ok(found)
    }

    /// One entry per topmost valued node reachable from `start`.
    fn collect_bundle<I>(
        &self,
        start: I,
        mode: BundleMode,
        capacity: usize,
    ) -> RouteResult<Vec<QuickMatchEntry<V>>>
    where
        I: DoubleEndedIterator<Item = NodeId>,
    {
        let oom = |_| RouteError::OutOfMemory("collecting quick-match expressions");
        let mut entries = Vec::new();
        entries.try_reserve(capacity).map_err(oom)?;
        let mut stack = Vec::new();
        for id in start.rev() {
            stack.try_reserve(1).map_err(oom)?;
            stack.push(id);
        }

        while let Some(id) = stack.pop() {
            let node = &self.arena[id];
            match &node.value {
                Some(value) => {
                    let represented = mode == BundleMode::Trimmed
                        && entries
                            .iter()
                            .any(|entry: &QuickMatchEntry<V>| self.comparator.equivalent(entry.value(), value));
                    if represented {
                        continue;
                    }
                    let literal = node.segment.kind() == SegmentKind::Literal;
                    let entry = QuickMatchEntry::new(self.full_path(id)?, value.clone(), literal);
                    debug!(path = entry.path(), "Generated quick match expression");
                    push_entry(&mut entries, entry)?;
                }
                None => {
                    stack.try_reserve(node.children.len()).map_err(oom)?;
                    stack.extend(node.children.iter().rev().copied());
                }
            }
        }
        Ok(entries)
    }

    /// Concatenates the segments from the root down to `id`.
    fn full_path(&self, id: NodeId) -> RouteResult<String> {
        let oom = |_| RouteError::OutOfMemory("building a node path");
        let mut segments = Vec::new();
        let mut length = 0;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.arena[node_id];
            segments.try_reserve(1).map_err(oom)?;
            segments.push(node.segment.as_str());
            length += node.segment.len();
            current = node.parent;
        }

        let mut path = String::new();
        path.try_reserve_exact(length).map_err(oom)?;
        for segment in segments.iter().rev() {
            path.push_str(segment);
        }
        Ok(path)
    }

    /// Checks every structural invariant of the trie, panicking on violation.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut reachable = 0;
        let mut stack: Vec<NodeId> = self.roots.iter().collect();
        for &root in &stack {
            assert!(self.arena[root].is_root(), "root has a parent");
        }
        while let Some(id) = stack.pop() {
            reachable += 1;
            let node = &self.arena[id];
            let segment = node.segment.as_str();
            assert!(!node.routed || node.value.is_some(), "routed node {segment} has no value");
            assert!(
                node.routed || !node.children.is_empty(),
                "structural node {segment} has no children"
            );
            for &child in &node.children {
                let child_node = &self.arena[child];
                assert_eq!(child_node.parent, Some(id), "broken parent link below {segment}");
                if let Some(value) = &node.value {
                    let child_value = child_node
                        .value
                        .as_ref()
                        .unwrap_or_else(|| panic!("collapsed node {segment} has an unvalued child"));
                    assert!(
                        self.comparator.equivalent(value, child_value),
                        "collapsed node {segment} disagrees with a child"
                    );
                }
                stack.push(child);
            }
        }
        assert_eq!(reachable, self.arena.len(), "unreachable nodes in arena");
    }
}

impl<V> fmt::Debug for RoutingTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTable")
            .field("roots", &self.roots.len())
            .field("nodes", &self.arena.len())
            .field("strategy", &self.strategy)
            .field("quick_match_stale", &self.quick_match.is_stale())
            .finish()
    }
}
