//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Malformed envelopes and unrecognized replies.
///
/// Every variant is fatal for the call that produced it.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The envelope does not declare the supported JSON-RPC version.
    #[error("unsupported jsonrpc version {found:?}, expected \"2.0\"")]
    UnsupportedVersion {
        /// The version found in the envelope.
        found: String,
    },

    /// The reply carries a status code outside `1..=5`.
    #[error("unknown synchronization status {0}")]
    UnknownStatus(u8),

    /// A status was received where it is not a valid outcome.
    #[error("unexpected synchronization status {status} for {method}")]
    UnexpectedStatus {
        /// The status code.
        status: u8,
        /// The method that was called.
        method: &'static str,
    },

    /// A required field is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The response id does not match the request id.
    #[error("response id {found:?} does not match request id {expected}")]
    IdMismatch {
        /// The request id.
        expected: u64,
        /// The id carried by the response.
        found: Option<u64>,
    },

    /// Parameters have the wrong shape.
    #[error("invalid params: {message}")]
    InvalidParams {
        /// Description of the problem.
        message: String,
    },

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Create an invalid params error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }
}
