//! Error types for the netpol controller
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the netpol controller
#[derive(Error, Debug)]
pub enum Error {
    /// Resource backend errors (network, contention, rejection)
    #[error("backend error: {0}")]
    Backend(String),

    /// The addressed object does not exist in the backend
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Object kind (e.g. "NetworkPolicy", "Pod")
        kind: String,
        /// Object namespace
        namespace: String,
        /// Object name
        name: String,
    },

    /// Watch source errors (stream setup, stream ended unexpectedly)
    #[error("watch source error: {0}")]
    WatchSource(String),

    /// A notification whose key cannot be derived
    #[error("malformed notification: {0}")]
    MalformedEvent(String),

    /// An entity key that does not split into namespace and name
    #[error("invalid entity key: {0}")]
    InvalidKey(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a "not found" error for an object
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a watch source error
    pub fn watch_source(msg: impl Into<String>) -> Self {
        Self::WatchSource(msg.into())
    }

    /// Create a malformed notification error
    pub fn malformed_event(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error means the addressed object is absent
    ///
    /// The reconciler treats absence on delete (and on a racing update) as
    /// a legitimately converged state rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_predicate() {
        let err = Error::not_found("NetworkPolicy", "default", "default-web");
        assert!(err.is_not_found());
        assert!(!Error::backend("connection reset").is_not_found());
    }

    #[test]
    fn not_found_display_includes_identity() {
        let err = Error::not_found("Pod", "kube-system", "dns");
        assert_eq!(err.to_string(), "Pod kube-system/dns not found");
    }
}
