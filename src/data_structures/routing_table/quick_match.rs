//! Flattened snapshot of resolvable paths.
//!
//! The cache holds one entry per topmost valued node of the trie. Entries are
//! kept in descending order of their full path so that, when scanning, a longer
//! path always precedes any shorter path it extends.

use std::cmp::Ordering;

use super::error::RouteError;
use super::key::TOKEN_SEPARATOR;
use super::RouteResult;

/// How a bundle of entries is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleMode {
    /// One entry for every topmost valued node.
    Complete,
    /// Skip nodes whose value is already represented in the bundle.
    Trimmed,
}

/// A resolvable path and the value it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickMatchEntry<V> {
    path: String,
    value: V,
    literal: bool,
}

impl<V> QuickMatchEntry<V> {
    pub(crate) fn new(path: String, value: V, literal: bool) -> Self {
        Self {
            path,
            value,
            literal,
        }
    }

    /// Full path from the root to the node.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Length of the full path in bytes.
    pub fn length(&self) -> usize {
        self.path.len()
    }

    /// Value the path resolves to.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Whether the entry stands for a literal key.
    pub fn is_literal(&self) -> bool {
        self.literal
    }

    /// Whether `key` resolves through this entry.
    ///
    /// The entry's path must prefix the key and end on a token boundary.
    /// Literal entries only match the identical key.
    pub fn matches(&self, key: &str) -> bool {
        if !key.starts_with(self.path.as_str()) {
            return false;
        }
        key.len() == self.path.len() || (!self.literal && self.path.ends_with(TOKEN_SEPARATOR))
    }
}

/// Orders entries by descending path.
pub(crate) fn descending<V>(a: &QuickMatchEntry<V>, b: &QuickMatchEntry<V>) -> Ordering {
    b.path.as_bytes().cmp(a.path.as_bytes())
}

/// Pushes `entry` onto `entries`, reporting allocation failure.
pub(crate) fn push_entry<V>(
    entries: &mut Vec<QuickMatchEntry<V>>,
    entry: QuickMatchEntry<V>,
) -> RouteResult<()> {
    entries
        .try_reserve(1)
        .map_err(|_| RouteError::OutOfMemory("growing the quick-match cache"))?;
    entries.push(entry);
    Ok(())
}

/// Lazily rebuilt list of quick-match entries.
#[derive(Debug)]
pub(crate) struct QuickMatchCache<V> {
    entries: Vec<QuickMatchEntry<V>>,
    stale: bool,
}

impl<V> QuickMatchCache<V> {
    /// Creates an empty, stale cache with room for `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            stale: true,
        }
    }

    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[QuickMatchEntry<V>] {
        &self.entries
    }

    /// Installs freshly collected entries and marks the cache current.
    pub fn replace(&mut self, mut entries: Vec<QuickMatchEntry<V>>) {
        entries.sort_unstable_by(descending);
        self.entries = entries;
        self.stale = false;
    }

    /// Returns the first entry `key` resolves through.
    pub fn find(&self, key: &str) -> Option<&QuickMatchEntry<V>> {
        self.entries.iter().find(|entry| entry.matches(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, value: u32) -> QuickMatchEntry<u32> {
        QuickMatchEntry::new(path.to_string(), value, false)
    }

    #[test]
    fn test_entry_boundaries() {
        let prefix = entry("device.wifi.", 1);
        assert!(prefix.matches("device.wifi."));
        assert!(prefix.matches("device.wifi.x.y"));
        assert!(!prefix.matches("device.wifi"));
        assert!(!prefix.matches("device.wifix"));

        let exact = entry("device.wifi", 2);
        assert!(exact.matches("device.wifi"));
        assert!(!exact.matches("device.wifix"));
        assert!(!exact.matches("device.wifi.x"));
        assert_eq!(exact.length(), 11);
    }

    #[test]
    fn test_literal_entry_is_exact() {
        let literal = QuickMatchEntry::new("_INBOX.".to_string(), 3u32, true);
        assert!(literal.matches("_INBOX."));
        assert!(!literal.matches("_INBOX.reply"));
        assert!(literal.is_literal());
    }

    #[test]
    fn test_cache_sorted_descending() {
        let mut cache = QuickMatchCache::new(4);
        assert!(cache.is_stale());

        cache.replace(vec![entry("a.", 1), entry("a.b.", 2), entry("b", 3)]);
        assert!(!cache.is_stale());
        let paths: Vec<&str> = cache.entries().iter().map(QuickMatchEntry::path).collect();
        assert_eq!(paths, vec!["b", "a.b.", "a."]);

        // The longer path is tried first.
        assert_eq!(cache.find("a.b.c").map(|e| *e.value()), Some(2));
        assert_eq!(cache.find("a.c").map(|e| *e.value()), Some(1));
        assert!(cache.find("c").is_none());

        cache.invalidate();
        assert!(cache.is_stale());
        assert_eq!(cache.len(), 3);
    }
}
