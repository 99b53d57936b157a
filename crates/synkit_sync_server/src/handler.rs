//! Request handlers for the RPC methods.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::SyncInfoStore;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use synkit_core::EntityRecord;
use synkit_sync_protocol::{
    methods, RpcRequest, RpcResponse, SyncDeletedParams, SyncEntityParams, SyncReply,
};
use tracing::{debug, info};

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Sync state (shared across all handlers).
    pub store: Arc<SyncInfoStore>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<SyncInfoStore>) -> Self {
        Self { config, store }
    }
}

/// Handler for RPC requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Dispatches one request and wraps the outcome in a response.
    pub fn handle(&self, request: &RpcRequest) -> RpcResponse {
        match self.dispatch(request) {
            Ok(result) => RpcResponse::success(request.id, result),
            Err(e) => {
                debug!(method = %request.method, error = %e, "rpc failed");
                RpcResponse::failure(Some(request.id), e.to_rpc_error())
            }
        }
    }

    fn dispatch(&self, request: &RpcRequest) -> ServerResult<JsonValue> {
        request
            .validate()
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let reply = match request.method.as_str() {
            methods::SYNC_ENTITY => {
                let params = SyncEntityParams::from_params(&request.params)
                    .map_err(|e| ServerError::InvalidParams(e.to_string()))?;
                self.handle_sync_entity(params)?
            }
            methods::SYNC_DELETED_ENTITY => {
                let params = SyncDeletedParams::from_params(&request.params)
                    .map_err(|e| ServerError::InvalidParams(e.to_string()))?;
                self.handle_sync_deleted(&params)
            }
            methods::TEST => return self.handle_test(&request.params),
            other => return Err(ServerError::MethodNotFound(other.to_string())),
        };

        serde_json::to_value(reply).map_err(|e| ServerError::Internal(e.to_string()))
    }

    /// Handles `syncEntity`.
    ///
    /// - unknown key: store at version 1, `Stored`
    /// - same content hash: `NotChanged` with the server version
    /// - client version older than the server's: `Updated` with the server
    ///   entity
    /// - otherwise: store, increment the version, `Stored`
    pub fn handle_sync_entity(&self, params: SyncEntityParams) -> ServerResult<SyncReply> {
        let size = params.entity.to_string().len();
        let max = self.context.config.max_entity_bytes;
        if size > max {
            return Err(ServerError::EntityTooLarge { size, max });
        }

        let record = EntityRecord::from_json_value(params.entity)
            .map_err(|e| ServerError::InvalidParams(format!("bad entity: {e}")))?;
        let app = record.key.application();
        if app != self.context.config.application_id {
            return Err(ServerError::ApplicationMismatch {
                expected: self.context.config.application_id.clone(),
                found: app.to_string(),
            });
        }
        if !record.key.has_identity() {
            return Err(ServerError::InvalidParams(
                "entity key is incomplete".to_string(),
            ));
        }

        let key = record.key.as_str().to_string();
        let store = &self.context.store;

        let reply = match store.get(&key) {
            Some(info) if info.content_hash == params.content_hash => {
                SyncReply::not_changed(key.as_str(), info.version)
            }
            Some(info) if record.version < info.version => {
                let entity = serde_json::to_value(&info.record)
                    .map_err(|e| ServerError::Internal(e.to_string()))?;
                SyncReply::updated(key.as_str(), info.version, entity)
            }
            _ => {
                let version = store.store(record, &params.content_hash);
                SyncReply::stored(key.as_str(), version)
            }
        };

        info!(key = %key, status = reply.status, version = ?reply.version, "syncEntity");
        Ok(reply)
    }

    /// Handles `syncDeletedEntity`.
    pub fn handle_sync_deleted(&self, params: &SyncDeletedParams) -> SyncReply {
        let reply = if self.context.store.remove(&params.key) {
            SyncReply::deleted()
        } else {
            SyncReply::not_found()
        };
        info!(key = %params.key, status = reply.status, "syncDeletedEntity");
        reply
    }

    /// Handles `test` by echoing its single parameter.
    pub fn handle_test(&self, params: &[JsonValue]) -> ServerResult<JsonValue> {
        match params {
            [param] => Ok(param.clone()),
            _ => Err(ServerError::InvalidParams(
                "test expects exactly one parameter".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use synkit_core::Entity;
    use synkit_sync_protocol::{error_codes, SyncStatus};

    fn handler() -> RequestHandler {
        handler_with(ServerConfig::default())
    }

    fn handler_with(config: ServerConfig) -> RequestHandler {
        let context = HandlerContext::new(config, Arc::new(SyncInfoStore::new()));
        RequestHandler::new(Arc::new(context))
    }

    fn params(entity: &Entity) -> SyncEntityParams {
        SyncEntityParams {
            entity: entity.to_json().unwrap(),
            content_hash: entity.content_digest().unwrap(),
        }
    }

    fn person() -> Entity {
        let mut e = Entity::builder("Person").name("ann").build().unwrap();
        e.set("age", 31i64).unwrap();
        e
    }

    #[test]
    fn sync_entity_lifecycle() {
        let handler = handler();
        let mut e = person();

        let reply = handler.handle_sync_entity(params(&e)).unwrap();
        assert_eq!(reply.status().unwrap(), SyncStatus::Stored);
        assert_eq!(reply.version, Some(1));

        e.set_version(1);
        let reply = handler.handle_sync_entity(params(&e)).unwrap();
        assert_eq!(reply.status().unwrap(), SyncStatus::NotChanged);
        assert_eq!(reply.version, Some(1));

        e.set("age", 32i64).unwrap();
        let reply = handler.handle_sync_entity(params(&e)).unwrap();
        assert_eq!(reply.status().unwrap(), SyncStatus::Stored);
        assert_eq!(reply.version, Some(2));
    }

    #[test]
    fn stale_client_gets_update() {
        let handler = handler();
        let mut fresh = person();
        handler.handle_sync_entity(params(&fresh)).unwrap();
        fresh.set_version(1);
        fresh.set("age", 40i64).unwrap();
        handler.handle_sync_entity(params(&fresh)).unwrap();

        let mut stale = person();
        stale.set("age", 33i64).unwrap();
        stale.set_version(1);
        let reply = handler.handle_sync_entity(params(&stale)).unwrap();
        assert_eq!(reply.status().unwrap(), SyncStatus::Updated);
        assert_eq!(reply.version, Some(2));
        let entity = reply.require_entity().unwrap();
        assert_eq!(entity["properties"]["age"]["value"], 40);
        assert_eq!(entity["version"], 2);
    }

    #[test]
    fn incomplete_and_foreign_keys_are_rejected() {
        let handler = handler();
        let fresh = Entity::new("Book").unwrap();
        assert!(matches!(
            handler.handle_sync_entity(params(&fresh)),
            Err(ServerError::InvalidParams(_))
        ));

        let foreign = Entity::builder("Book")
            .application("elsewhere")
            .id(1)
            .build()
            .unwrap();
        assert!(matches!(
            handler.handle_sync_entity(params(&foreign)),
            Err(ServerError::ApplicationMismatch { .. })
        ));
    }

    #[test]
    fn oversized_entities_are_rejected() {
        let handler = handler_with(ServerConfig::default().with_max_entity_bytes(16));
        assert!(matches!(
            handler.handle_sync_entity(params(&person())),
            Err(ServerError::EntityTooLarge { max: 16, .. })
        ));
    }

    #[test]
    fn sync_deleted() {
        let handler = handler();
        let e = person();
        handler.handle_sync_entity(params(&e)).unwrap();

        let deleted = SyncDeletedParams {
            key: e.key().as_str().to_string(),
        };
        assert_eq!(handler.handle_sync_deleted(&deleted), SyncReply::deleted());
        assert_eq!(handler.handle_sync_deleted(&deleted), SyncReply::not_found());
    }

    #[test]
    fn dispatch_errors() {
        let handler = handler();

        let response = handler.handle(&RpcRequest::new("frobnicate", vec![], 1));
        assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);

        let response = handler.handle(&RpcRequest::new(methods::SYNC_ENTITY, vec![json!(1)], 2));
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);

        let response = handler.handle(&RpcRequest::test(3, json!(1)).with_version("1.0"));
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_REQUEST);
        assert_eq!(response.id, Some(3));
    }

    #[test]
    fn test_method_echoes() {
        let handler = handler();
        let response = handler.handle(&RpcRequest::test(9, json!({"a": [1, 2]})));
        assert_eq!(response.result, Some(json!({"a": [1, 2]})));
        assert_eq!(response.id, Some(9));

        let response = handler.handle(&RpcRequest::new(methods::TEST, vec![], 10));
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
    }
}
