//! Server configuration.

use synkit_core::DEFAULT_APPLICATION_ID;

/// Configuration for the sync server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Application id every synced key must belong to.
    pub application_id: String,
    /// RPC endpoint path served by [`SyncServer::handle_post`](crate::SyncServer::handle_post).
    pub endpoint: String,
    /// Maximum size of one entity record in JSON bytes.
    pub max_entity_bytes: usize,
}

impl ServerConfig {
    /// Creates a configuration for `application_id`.
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            endpoint: "/gaesynkit/rpc/".to_string(),
            max_entity_bytes: 1024 * 1024,
        }
    }

    /// Sets the endpoint path.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the maximum entity size.
    pub fn with_max_entity_bytes(mut self, max: usize) -> Self {
        self.max_entity_bytes = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_APPLICATION_ID)
    }
}
