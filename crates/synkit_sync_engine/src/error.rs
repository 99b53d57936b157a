//! Error types for the sync engine.

use synkit_core::CoreError;
use synkit_sync_protocol::{error_codes, ProtocolError};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Malformed envelope or unrecognized outcome. Always fatal.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server answered with a JSON-RPC error object.
    #[error("server error {code}: {message}")]
    ServerError {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// Local key, entity or storage error.
    #[error("local error: {0}")]
    Core(#[from] CoreError),

    /// Not connected.
    #[error("not connected to server")]
    NotConnected,

    /// A background sync could not be started or did not finish.
    #[error("background sync failed: {0}")]
    Background(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// The engine never retries on its own; this is for callers that do.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::ServerError { code, .. } => *code == error_codes::INTERNAL_ERROR,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::transport_retryable("connection lost").is_retryable());
        assert!(!SyncError::transport_fatal("invalid certificate").is_retryable());
        assert!(SyncError::ServerError {
            code: error_codes::INTERNAL_ERROR,
            message: "internal error".into()
        }
        .is_retryable());
        assert!(!SyncError::ServerError {
            code: error_codes::METHOD_NOT_FOUND,
            message: "no such method".into()
        }
        .is_retryable());
        assert!(!SyncError::Protocol(ProtocolError::UnknownStatus(9)).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::NotConnected;
        assert_eq!(err.to_string(), "not connected to server");

        let err = SyncError::from(ProtocolError::UnknownStatus(7));
        assert!(err.to_string().contains('7'));
    }
}
