//! HTTP transport implementation.
//!
//! This module provides an HTTP-based transport for the sync engine.
//! The actual HTTP client is abstracted via a trait to allow different
//! implementations (reqwest, hyper, etc.).

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::RpcTransport;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use synkit_sync_protocol::{RpcRequest, RpcResponse};
use tracing::warn;

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
/// This allows using different HTTP libraries (reqwest, hyper, ureq, etc.)
/// or even non-HTTP transports.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// HTTP-based RPC transport.
///
/// Posts JSON-encoded requests to one URL and decodes JSON responses.
pub struct HttpTransport<C: HttpClient> {
    /// Full RPC URL (server URL plus endpoint).
    url: String,
    /// HTTP client implementation.
    client: C,
    /// Connection state.
    connected: AtomicBool,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport posting to `url`.
    pub fn new(url: impl Into<String>, client: C) -> Self {
        Self {
            url: url.into(),
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Creates a transport posting to the URL described by `config`.
    pub fn from_config(config: &SyncConfig, client: C) -> Self {
        Self::new(config.url(), client)
    }

    /// Returns the RPC URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Marks the transport connected again after a failure.
    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }
}

impl<C: HttpClient> RpcTransport for HttpTransport<C> {
    fn call(&self, request: &RpcRequest) -> SyncResult<RpcResponse> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }

        let body = request.encode()?;

        let response_body = self.client.post(&self.url, body).map_err(|e| {
            warn!(url = %self.url, error = %e, "rpc post failed");
            self.set_error(&e);
            self.connected.store(false, Ordering::SeqCst);
            SyncError::transport_retryable(e)
        })?;

        self.clear_error();
        Ok(RpcResponse::decode(&response_body)?)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    fn close(&self) -> SyncResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a POST to `path` and returns the response body.
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String>;
}

impl<S: LoopbackServer + ?Sized> LoopbackServer for std::sync::Arc<S> {
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        (**self).handle_post(path, body)
    }
}

/// A loopback HTTP client that routes requests directly to a server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        // Strip scheme and host
        let path = url
            .find("://")
            .map(|i| &url[i + 3..])
            .and_then(|rest| rest.find('/').map(|j| &rest[j..]))
            .unwrap_or(url);

        self.server.handle_post(path, &body)
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use synkit_sync_protocol::SyncReply;

    struct TestClient {
        response: RwLock<Option<Vec<u8>>>,
        healthy: AtomicBool,
        last_url: RwLock<Option<String>>,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                response: RwLock::new(None),
                healthy: AtomicBool::new(true),
                last_url: RwLock::new(None),
            }
        }

        fn set_response(&self, resp: Vec<u8>) {
            *self.response.write() = Some(resp);
        }

        fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }
    }

    impl HttpClient for TestClient {
        fn post(&self, url: &str, _body: Vec<u8>) -> Result<Vec<u8>, String> {
            *self.last_url.write() = Some(url.to_string());
            self.response
                .read()
                .clone()
                .ok_or_else(|| "No response set".into())
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn transport_from_config() {
        let config = SyncConfig::new("https://app.example.com");
        let transport = HttpTransport::from_config(&config, TestClient::new());
        assert_eq!(transport.url(), "https://app.example.com/gaesynkit/rpc/");
        assert!(transport.is_connected());
    }

    #[test]
    fn transport_disconnect() {
        let transport = HttpTransport::new("https://app.example.com/rpc", TestClient::new());
        transport.close().unwrap();
        assert!(!transport.is_connected());

        let result = transport.call(&RpcRequest::test(1, json!(1)));
        assert!(matches!(result, Err(SyncError::NotConnected)));
    }

    #[test]
    fn transport_unhealthy_client() {
        let client = TestClient::new();
        client.set_healthy(false);
        let transport = HttpTransport::new("https://app.example.com/rpc", client);
        assert!(!transport.is_connected());
    }

    #[test]
    fn transport_failure_records_error() {
        let transport = HttpTransport::new("https://app.example.com/rpc", TestClient::new());
        let err = transport.call(&RpcRequest::test(1, json!(1))).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(transport.last_error().as_deref(), Some("No response set"));
        assert!(!transport.is_connected());

        transport.reconnect();
        assert!(transport.is_connected());
    }

    #[test]
    fn transport_decodes_response() {
        let client = TestClient::new();
        let response = RpcResponse::reply(3, &SyncReply::stored("a2V5", 2)).unwrap();
        client.set_response(response.encode().unwrap());

        let transport = HttpTransport::new("https://app.example.com/gaesynkit/rpc/", client);
        let decoded = transport
            .call(&RpcRequest::sync_deleted_entity(3, "a2V5"))
            .unwrap();
        assert_eq!(decoded, response);
        assert_eq!(transport.last_error(), None);
    }

    #[test]
    fn transport_rejects_garbage_body() {
        let client = TestClient::new();
        client.set_response(b"<html>".to_vec());
        let transport = HttpTransport::new("https://app.example.com/rpc", client);
        let result = transport.call(&RpcRequest::test(1, json!(1)));
        assert!(matches!(result, Err(SyncError::Protocol(_))));
    }

    struct PathEcho;

    impl LoopbackServer for PathEcho {
        fn handle_post(&self, path: &str, _body: &[u8]) -> Result<Vec<u8>, String> {
            Ok(path.as_bytes().to_vec())
        }
    }

    #[test]
    fn loopback_strips_host() {
        let client = LoopbackClient::new(PathEcho);
        let body = client
            .post("https://app.example.com/gaesynkit/rpc/", Vec::new())
            .unwrap();
        assert_eq!(body, b"/gaesynkit/rpc/");

        let body = client.post("/gaesynkit/rpc/", Vec::new()).unwrap();
        assert_eq!(body, b"/gaesynkit/rpc/");
    }
}
