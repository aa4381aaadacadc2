//! Error types for the routing table.
//!
//! This module defines the error types that can occur while registering,
//! resolving, or removing routes.

/// Errors that can occur in routing table operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// The key is empty, too long, or not a well-formed topic.
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why the key was rejected.
        reason: &'static str,
    },

    /// The key already resolves to a destination.
    #[error("Route already exists for key: {0}")]
    DuplicateRoute(String),

    /// The key names a branch whose more specific routes disagree on the destination.
    #[error("Key '{0}' has more specific routes to other destinations")]
    ConflictingRoute(String),

    /// No resolvable node exists on the key's path.
    #[error("No route found for key: {0}")]
    NotFound(String),

    /// An allocation failed while growing a node or cache buffer.
    #[error("Out of memory while {0}")]
    OutOfMemory(&'static str),

    /// Every slot of the root directory is occupied.
    #[error("Root directory is full (capacity {capacity})")]
    CapacityExceeded {
        /// Number of root slots configured for the table.
        capacity: usize,
    },
}

impl RouteError {
    pub(crate) fn invalid_key(key: &str, reason: &'static str) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason,
        }
    }

    pub(crate) fn not_found(key: &str) -> Self {
        Self::NotFound(key.to_string())
    }

    /// Returns the key the error was raised for, if it names one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::InvalidKey { key, .. } => Some(key.as_str()),
            Self::DuplicateRoute(key) | Self::ConflictingRoute(key) | Self::NotFound(key) => {
                Some(key.as_str())
            }
            Self::OutOfMemory(_) | Self::CapacityExceeded { .. } => None,
        }
    }

    /// Returns `true` if this error reports a missing route.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
