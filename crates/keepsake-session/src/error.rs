//! Error types for session storage and session lifecycle operations.

use std::path::PathBuf;

/// Error type for store and session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The store was used before it was constructed, or after it was closed.
    #[error("Session store not initialized")]
    NotInitialized,

    /// The storage backend could not be reached or refused the operation.
    #[error("Session backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A stored session payload could not be decoded.
    #[error("Failed to decode session data: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Session data could not be encoded for storage.
    #[error("Failed to encode session data: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A write was attempted on a read-only session.
    #[error("Session is readonly")]
    Readonly,

    /// Commit was attempted on a modified session that has no id.
    #[error("Session id is missing")]
    MissingId,

    /// The session was already committed in this request.
    #[error("Session already committed")]
    DuplicateCommit,

    /// The cache capacity must be at least one entry.
    #[error("Invalid store capacity: {0}")]
    InvalidCapacity(usize),

    /// The session expiry must be a positive duration.
    #[error("Session expiry must be greater than zero")]
    InvalidExpiry,

    /// Reading or writing a snapshot file failed.
    #[error("Snapshot error at '{path}': {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The id transport failed to extract or publish a session id.
    #[error("Session id transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Whether the caller may reasonably retry the failed operation.
    ///
    /// Only backend and transport failures are transient; everything else is
    /// either corrupt data or a programming error in the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::BackendUnavailable(_) | Error::Transport(_))
    }
}

/// Result type for store and session operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(Error::BackendUnavailable("down".into()).is_retryable());
        assert!(Error::Transport("no header".into()).is_retryable());
        assert!(!Error::NotInitialized.is_retryable());
        assert!(!Error::DuplicateCommit.is_retryable());
        assert!(!Error::MissingId.is_retryable());
        assert!(!Error::Readonly.is_retryable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::Snapshot {
            path: PathBuf::from("/tmp/sessions.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/sessions.json"));
        assert!(msg.contains("gone"));
    }
}
