//! Error types for the sync server.

use synkit_sync_protocol::{error_codes, RpcError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The body is not valid JSON.
    #[error("parse error: {0}")]
    Parse(String),

    /// The envelope is not a valid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The method does not exist.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The parameters have the wrong shape or content.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The entity record exceeds the configured size limit.
    #[error("entity too large: {size} bytes exceeds {max}")]
    EntityTooLarge {
        /// Record size in bytes.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// The key belongs to another application.
    #[error("key belongs to application {found:?}, server serves {expected:?}")]
    ApplicationMismatch {
        /// Configured application id.
        expected: String,
        /// Application id of the key.
        found: String,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns the JSON-RPC error code for this error.
    pub fn code(&self) -> i64 {
        match self {
            ServerError::Parse(_) => error_codes::PARSE_ERROR,
            ServerError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            ServerError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            ServerError::InvalidParams(_)
            | ServerError::EntityTooLarge { .. }
            | ServerError::ApplicationMismatch { .. } => error_codes::INVALID_PARAMS,
            ServerError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Returns true if the client sent something wrong.
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns true if the server failed on a valid request.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Internal(_))
    }

    /// Converts to a JSON-RPC error object.
    pub fn to_rpc_error(&self) -> RpcError {
        RpcError::new(self.code(), self.to_string())
    }
}
