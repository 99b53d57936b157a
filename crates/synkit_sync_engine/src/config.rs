//! Configuration for the sync engine.

use synkit_sync_protocol::JSONRPC_VERSION;

/// Path of the RPC endpoint on the sync server.
pub const DEFAULT_ENDPOINT: &str = "/gaesynkit/rpc/";

/// Configuration for sync operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Server base URL (e.g. `https://app.example.com`).
    pub server_url: String,
    /// RPC endpoint path appended to `server_url`.
    pub endpoint: String,
    /// Declared JSON-RPC version. Anything other than `"2.0"` makes every
    /// request fail locally before it reaches the transport.
    pub jsonrpc_version: String,
}

impl SyncConfig {
    /// Creates a configuration for `server_url` with the default endpoint.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            jsonrpc_version: JSONRPC_VERSION.to_string(),
        }
    }

    /// Sets the endpoint path.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the declared JSON-RPC version.
    pub fn with_jsonrpc_version(mut self, version: impl Into<String>) -> Self {
        self.jsonrpc_version = version.into();
        self
    }

    /// Returns the full RPC URL.
    pub fn url(&self) -> String {
        format!("{}{}", self.server_url, self.endpoint)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("")
    }
}
