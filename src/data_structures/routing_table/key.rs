//! Topic key validation and tokenization.
//!
//! Hierarchical keys are split on [`TOKEN_SEPARATOR`]. Every token except the
//! last keeps its trailing separator, so a branch segment (`"wifi."`) can never
//! be confused with a leaf segment of the same name (`"wifi"`). Keys starting
//! with the literal marker are never tokenized.

use super::error::RouteError;
use super::RouteResult;

/// Byte separating the tokens of a hierarchical key.
pub const TOKEN_SEPARATOR: char = '.';

/// How a key is stored in the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyKind {
    /// Stored whole as a root entry, matched only by the identical key.
    Literal,
    /// Split into tokens, one trie level per token.
    Hierarchical,
}

/// Checks a key against the table's limits and decides how it is stored.
pub(crate) fn classify(key: &str, max_length: usize, literal_marker: char) -> RouteResult<KeyKind> {
    if key.is_empty() {
        return Err(RouteError::invalid_key(key, "empty key"));
    }
    if key.len() >= max_length {
        return Err(RouteError::invalid_key(key, "key too long"));
    }
    if key.contains('\0') {
        return Err(RouteError::invalid_key(key, "embedded NUL byte"));
    }
    if key.starts_with(literal_marker) {
        return Ok(KeyKind::Literal);
    }
    if key.starts_with(TOKEN_SEPARATOR) {
        return Err(RouteError::invalid_key(key, "leading separator"));
    }
    if key.contains("..") {
        return Err(RouteError::invalid_key(key, "empty token"));
    }
    Ok(KeyKind::Hierarchical)
}

/// Returns the first token of `rest`, including its trailing separator if any.
pub(crate) fn head_token(rest: &str) -> &str {
    match rest.find(TOKEN_SEPARATOR) {
        Some(pos) => &rest[..=pos],
        None => rest,
    }
}

/// Iterates over the tokens of a hierarchical key.
pub(crate) fn tokens(key: &str) -> Tokens<'_> {
    Tokens { rest: key }
}

/// Iterator returned by [`tokens`].
#[derive(Debug, Clone)]
pub(crate) struct Tokens<'k> {
    rest: &'k str,
}

impl<'k> Iterator for Tokens<'k> {
    type Item = &'k str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let token = head_token(self.rest);
        self.rest = &self.rest[token.len()..];
        Some(token)
    }
}

/// Shape of a node's segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    /// Intermediate token ending with the separator.
    Branch,
    /// Final token of a key, without separator.
    Leaf,
    /// Whole literal key.
    Literal,
}

/// The text a node represents, tagged with its shape.
///
/// Segments are only built from tokens produced by [`tokens`] or from a whole
/// literal key, so the separator convention holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    text: String,
    kind: SegmentKind,
}

impl Segment {
    /// Builds the segment for one token of a hierarchical key.
    pub(crate) fn from_token(token: &str) -> RouteResult<Self> {
        let kind = if token.ends_with(TOKEN_SEPARATOR) {
            SegmentKind::Branch
        } else {
            SegmentKind::Leaf
        };
        Ok(Self {
            text: copy_str(token)?,
            kind,
        })
    }

    /// Builds the segment for a literal key.
    pub(crate) fn literal(key: &str) -> RouteResult<Self> {
        Ok(Self {
            text: copy_str(key)?,
            kind: SegmentKind::Literal,
        })
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    pub(crate) fn len(&self) -> usize {
        self.text.len()
    }

    pub(crate) fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// Whether this segment is the first token of `rest`.
    ///
    /// A branch matches any remainder it prefixes (its trailing separator marks
    /// the boundary); leaves and literals only match the exact remainder.
    pub(crate) fn matches_head(&self, rest: &str) -> bool {
        match self.kind {
            SegmentKind::Branch => rest.starts_with(self.text.as_str()),
            SegmentKind::Leaf | SegmentKind::Literal => rest == self.text,
        }
    }
}

/// Copies `s` into a fresh `String`, reporting allocation failure.
pub(crate) fn copy_str(s: &str) -> RouteResult<String> {
    let mut text = String::new();
    text.try_reserve_exact(s.len())
        .map_err(|_| RouteError::OutOfMemory("copying a key segment"))?;
    text.push_str(s);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("device.wifi.ssid" ; "three tokens")]
    #[test_case("device.wifi." ; "trailing separator")]
    #[test_case("foo" ; "single token")]
    fn test_classify_hierarchical(key: &str) {
        assert_eq!(classify(key, 512, '_').unwrap(), KeyKind::Hierarchical);
    }

    #[test_case("_RTROUTED.INBOX.SUBSCRIBE" ; "inbox")]
    #[test_case("_" ; "bare marker")]
    #[test_case("_a..b" ; "literal skips token checks")]
    fn test_classify_literal(key: &str) {
        assert_eq!(classify(key, 512, '_').unwrap(), KeyKind::Literal);
    }

    #[test_case("", "empty key")]
    #[test_case(".foo", "leading separator")]
    #[test_case("a..b", "empty token")]
    #[test_case("a.\0", "embedded NUL byte")]
    fn test_classify_rejects(key: &str, expected: &str) {
        match classify(key, 512, '_') {
            Err(RouteError::InvalidKey { reason, .. }) => assert_eq!(reason, expected),
            other => panic!("expected InvalidKey, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_length_limit() {
        let key = "a".repeat(511);
        assert!(classify(&key, 512, '_').is_ok());
        let key = "a".repeat(512);
        assert!(matches!(
            classify(&key, 512, '_'),
            Err(RouteError::InvalidKey { reason: "key too long", .. })
        ));
    }

    #[test]
    fn test_tokens_keep_separator() {
        let parts: Vec<&str> = tokens("device.wifi.ssid").collect();
        assert_eq!(parts, vec!["device.", "wifi.", "ssid"]);

        let parts: Vec<&str> = tokens("device.wifi.").collect();
        assert_eq!(parts, vec!["device.", "wifi."]);

        assert_eq!(tokens("").count(), 0);
    }

    #[test]
    fn test_segment_boundaries() {
        let branch = Segment::from_token("abc.").unwrap();
        assert_eq!(branch.kind(), SegmentKind::Branch);
        assert!(branch.matches_head("abc.def"));
        assert!(branch.matches_head("abc."));
        assert!(!branch.matches_head("abc"));
        assert!(!branch.matches_head("abcd.e"));

        let leaf = Segment::from_token("abc").unwrap();
        assert_eq!(leaf.kind(), SegmentKind::Leaf);
        assert!(leaf.matches_head("abc"));
        assert!(!leaf.matches_head("abcd"));
        assert!(!leaf.matches_head("abc.d"));
        assert!(!leaf.matches_head("ab"));

        let literal = Segment::literal("_x.y.").unwrap();
        assert!(literal.matches_head("_x.y."));
        assert!(!literal.matches_head("_x.y.z"));
    }
}
