//! Main sync server.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handler::{HandlerContext, RequestHandler};
use crate::store::{SyncInfo, SyncInfoStore};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use synkit_sync_protocol::{RpcRequest, RpcResponse};
use tracing::warn;

const FALLBACK_BODY: &[u8] =
    br#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"internal error"},"id":null}"#;

/// The sync server.
///
/// Holds the authoritative copy of every synced entity and answers the
/// `syncEntity`, `syncDeletedEntity` and `test` methods.
///
/// # Example
///
/// ```
/// use synkit_sync_protocol::RpcRequest;
/// use synkit_sync_server::{ServerConfig, SyncServer};
///
/// let server = SyncServer::new(ServerConfig::default());
/// let response = server.handle(&RpcRequest::test(1, serde_json::json!("ping")));
/// assert_eq!(response.result, Some(serde_json::json!("ping")));
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a new sync server.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(SyncInfoStore::new()))
    }

    /// Creates a sync server over an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<SyncInfoStore>) -> Self {
        let context = Arc::new(HandlerContext::new(config, store));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Handles a decoded request.
    pub fn handle(&self, request: &RpcRequest) -> RpcResponse {
        self.handler.handle(request)
    }

    /// Handles a raw request body and returns the response body.
    ///
    /// A body that is not JSON answers with a parse error; JSON that is not
    /// a request answers with an invalid request error. Both carry a `null`
    /// id unless one could be read.
    pub fn handle_bytes(&self, body: &[u8]) -> Vec<u8> {
        let response = match serde_json::from_slice::<JsonValue>(body) {
            Err(e) => RpcResponse::failure(None, ServerError::Parse(e.to_string()).to_rpc_error()),
            Ok(value) => {
                let id = value.get("id").and_then(JsonValue::as_u64);
                match serde_json::from_value::<RpcRequest>(value) {
                    Ok(request) => self.handle(&request),
                    Err(e) => RpcResponse::failure(
                        id,
                        ServerError::InvalidRequest(e.to_string()).to_rpc_error(),
                    ),
                }
            }
        };

        response.encode().unwrap_or_else(|e| {
            warn!(error = %e, "failed to encode response");
            FALLBACK_BODY.to_vec()
        })
    }

    /// Handles an HTTP POST of `body` to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not the configured endpoint.
    pub fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        let endpoint = self.context.config.endpoint.trim_end_matches('/');
        if path.trim_end_matches('/') != endpoint {
            return Err(format!("404 not found: {path}"));
        }
        Ok(self.handle_bytes(body))
    }

    /// Returns the number of synced entities.
    pub fn entity_count(&self) -> usize {
        self.context.store.len()
    }

    /// Returns the server version of `encoded_key`.
    pub fn version_of(&self, encoded_key: &str) -> Option<u64> {
        self.context.store.get(encoded_key).map(|info| info.version)
    }

    /// Returns the sync state of `encoded_key`.
    pub fn entity(&self, encoded_key: &str) -> Option<SyncInfo> {
        self.context.store.get(encoded_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use synkit_core::Entity;
    use synkit_sync_protocol::{error_codes, SyncStatus};

    fn sync_request(id: u64, entity: &Entity) -> RpcRequest {
        RpcRequest::sync_entity(
            id,
            entity.to_json().unwrap(),
            &entity.content_digest().unwrap(),
        )
    }

    #[test]
    fn server_lifecycle() {
        let server = SyncServer::new(ServerConfig::default());
        assert_eq!(server.entity_count(), 0);
        assert_eq!(server.config().application_id, "synkit");
    }

    #[test]
    fn full_sync_flow() {
        let server = SyncServer::new(ServerConfig::default());
        let mut e = Entity::builder("Note").id(7).build().unwrap();
        e.set("text", "hello").unwrap();
        let key = e.key().as_str().to_string();

        let response = server.handle(&sync_request(1, &e));
        assert_eq!(response.id, Some(1));
        let reply = response.sync_reply().unwrap();
        assert_eq!(reply.status().unwrap(), SyncStatus::Stored);
        assert_eq!(reply.key.as_deref(), Some(key.as_str()));
        assert_eq!(server.version_of(&key), Some(1));

        e.set_version(1);
        let reply = server.handle(&sync_request(2, &e)).sync_reply().unwrap();
        assert_eq!(reply.status().unwrap(), SyncStatus::NotChanged);

        let response = server.handle(&RpcRequest::sync_deleted_entity(3, &key));
        assert_eq!(
            response.sync_reply().unwrap().status().unwrap(),
            SyncStatus::Deleted
        );
        assert!(server.entity(&key).is_none());
        assert_eq!(server.entity_count(), 0);
    }

    #[test]
    fn handle_bytes_parse_errors() {
        let server = SyncServer::new(ServerConfig::default());

        let body = server.handle_bytes(b"{not json");
        let response = RpcResponse::decode(&body).unwrap();
        assert_eq!(response.error.unwrap().code, error_codes::PARSE_ERROR);
        assert_eq!(response.id, None);

        let body = server.handle_bytes(br#"{"jsonrpc":"2.0","id":4}"#);
        let response = RpcResponse::decode(&body).unwrap();
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_REQUEST);
        assert_eq!(response.id, Some(4));
    }

    #[test]
    fn handle_bytes_round_trip() {
        let server = SyncServer::new(ServerConfig::default());
        let request = RpcRequest::test(5, json!([1, "two"]));
        let body = server.handle_bytes(&request.encode().unwrap());
        let response = RpcResponse::decode(&body).unwrap();
        assert_eq!(response.result, Some(json!([1, "two"])));
        assert_eq!(response.id, Some(5));
    }

    #[test]
    fn handle_post_checks_endpoint() {
        let server = SyncServer::new(ServerConfig::default());
        let body = RpcRequest::test(1, json!(null)).encode().unwrap();

        assert!(server.handle_post("/gaesynkit/rpc/", &body).is_ok());
        assert!(server.handle_post("/gaesynkit/rpc", &body).is_ok());
        assert!(server.handle_post("/other", &body).unwrap_err().contains("404"));
    }

    #[test]
    fn shared_store() {
        let store = Arc::new(SyncInfoStore::new());
        let a = SyncServer::with_store(ServerConfig::default(), Arc::clone(&store));
        let b = SyncServer::with_store(ServerConfig::default(), Arc::clone(&store));

        let e = Entity::builder("Note").name("shared").build().unwrap();
        a.handle(&sync_request(1, &e));
        assert_eq!(b.version_of(e.key().as_str()), Some(1));
    }
}
