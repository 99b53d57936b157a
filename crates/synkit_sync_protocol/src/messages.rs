//! JSON-RPC 2.0 envelopes and sync payloads.

use crate::error::{ProtocolError, ProtocolResult};
use crate::status::SyncStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The only JSON-RPC version spoken.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method names.
pub mod methods {
    /// Synchronize one entity: `[entity, content_hash]`.
    pub const SYNC_ENTITY: &str = "syncEntity";
    /// Propagate a local delete: `[encoded_key]`.
    pub const SYNC_DELETED_ENTITY: &str = "syncDeletedEntity";
    /// Echo the single parameter back.
    pub const TEST: &str = "test";
}

/// Standard JSON-RPC error codes.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i64 = -32700;
    /// The envelope is not a valid request.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The method does not exist.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal error.
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// A JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Protocol version; must be `"2.0"`.
    pub jsonrpc: String,
    /// Method name.
    pub method: String,
    /// Positional parameters.
    #[serde(default)]
    pub params: Vec<JsonValue>,
    /// Correlation id.
    pub id: u64,
}

impl RpcRequest {
    /// Creates a version 2.0 request.
    pub fn new(method: impl Into<String>, params: Vec<JsonValue>, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Creates a `syncEntity` request.
    pub fn sync_entity(id: u64, entity: JsonValue, content_hash: &str) -> Self {
        Self::new(
            methods::SYNC_ENTITY,
            vec![entity, JsonValue::String(content_hash.to_string())],
            id,
        )
    }

    /// Creates a `syncDeletedEntity` request.
    pub fn sync_deleted_entity(id: u64, encoded_key: &str) -> Self {
        Self::new(
            methods::SYNC_DELETED_ENTITY,
            vec![JsonValue::String(encoded_key.to_string())],
            id,
        )
    }

    /// Creates a `test` request.
    pub fn test(id: u64, param: JsonValue) -> Self {
        Self::new(methods::TEST, vec![param], id)
    }

    /// Overrides the declared protocol version.
    #[must_use]
    pub fn with_version(mut self, jsonrpc: impl Into<String>) -> Self {
        self.jsonrpc = jsonrpc.into();
        self
    }

    /// Checks the envelope.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVersion` unless `jsonrpc` is exactly `"2.0"`.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(ProtocolError::UnsupportedVersion {
                found: self.jsonrpc.clone(),
            });
        }
        Ok(())
    }

    /// Encodes to JSON bytes.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Parameters of `syncEntity`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncEntityParams {
    /// The entity record as JSON.
    pub entity: JsonValue,
    /// Client content digest.
    pub content_hash: String,
}

impl SyncEntityParams {
    /// Extracts the parameters from a request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` unless `params` is `[object, string]`.
    pub fn from_params(params: &[JsonValue]) -> ProtocolResult<Self> {
        match params {
            [entity @ JsonValue::Object(_), JsonValue::String(hash)] => Ok(Self {
                entity: entity.clone(),
                content_hash: hash.clone(),
            }),
            _ => Err(ProtocolError::invalid_params(
                "syncEntity expects [entity, content_hash]",
            )),
        }
    }
}

/// Parameters of `syncDeletedEntity`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncDeletedParams {
    /// Encoded key of the deleted entity.
    pub key: String,
}

impl SyncDeletedParams {
    /// Extracts the parameters from a request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` unless `params` is `[string]`.
    pub fn from_params(params: &[JsonValue]) -> ProtocolResult<Self> {
        match params {
            [JsonValue::String(key)] => Ok(Self { key: key.clone() }),
            _ => Err(ProtocolError::invalid_params(
                "syncDeletedEntity expects [encoded_key]",
            )),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Extra data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl RpcError {
    /// Creates an error without data.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// A JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Protocol version.
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    /// Correlation id; `null` if the request could not be read.
    pub id: Option<u64>,
}

impl RpcResponse {
    /// Creates a success response.
    pub fn success(id: u64, result: JsonValue) -> Self {
        Self {
            jsonrpc: default_version(),
            result: Some(result),
            error: None,
            id: Some(id),
        }
    }

    /// Creates a success response carrying a sync reply.
    pub fn reply(id: u64, reply: &SyncReply) -> ProtocolResult<Self> {
        Ok(Self::success(id, serde_json::to_value(reply)?))
    }

    /// Creates an error response.
    pub fn failure(id: Option<u64>, error: RpcError) -> Self {
        Self {
            jsonrpc: default_version(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Returns an error unless the response answers request `id`.
    pub fn check_id(&self, id: u64) -> ProtocolResult<()> {
        if self.id == Some(id) {
            Ok(())
        } else {
            Err(ProtocolError::IdMismatch {
                expected: id,
                found: self.id,
            })
        }
    }

    /// Parses `result` as a sync reply.
    ///
    /// # Errors
    ///
    /// `MissingField` if there is no result, `Json` if it is not a reply.
    pub fn sync_reply(&self) -> ProtocolResult<SyncReply> {
        let result = self.result.clone().ok_or(ProtocolError::MissingField("result"))?;
        Ok(serde_json::from_value(result)?)
    }

    /// Encodes to JSON bytes.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The `result` of a sync call.
///
/// `status` stays a raw code so an unknown value survives parsing and is
/// rejected by [`SyncReply::status`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReply {
    /// Raw status code.
    pub status: u8,
    /// Encoded key the outcome applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Server version after the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Full server entity for [`SyncStatus::Updated`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<JsonValue>,
}

impl SyncReply {
    fn bare(status: SyncStatus) -> Self {
        Self {
            status: status.code(),
            key: None,
            version: None,
            entity: None,
        }
    }

    /// Server content is unchanged at `version`.
    pub fn not_changed(key: impl Into<String>, version: u64) -> Self {
        Self {
            key: Some(key.into()),
            version: Some(version),
            ..Self::bare(SyncStatus::NotChanged)
        }
    }

    /// Server holds a newer `entity`.
    pub fn updated(key: impl Into<String>, version: u64, entity: JsonValue) -> Self {
        Self {
            key: Some(key.into()),
            version: Some(version),
            entity: Some(entity),
            ..Self::bare(SyncStatus::Updated)
        }
    }

    /// Server stored the client's content at `version`.
    pub fn stored(key: impl Into<String>, version: u64) -> Self {
        Self {
            key: Some(key.into()),
            version: Some(version),
            ..Self::bare(SyncStatus::Stored)
        }
    }

    /// Deleted key was unknown to the server.
    pub fn not_found() -> Self {
        Self::bare(SyncStatus::NotFound)
    }

    /// Server removed the key.
    pub fn deleted() -> Self {
        Self::bare(SyncStatus::Deleted)
    }

    /// Returns the decoded status.
    ///
    /// # Errors
    ///
    /// `UnknownStatus` for codes outside `1..=5`.
    pub fn status(&self) -> ProtocolResult<SyncStatus> {
        SyncStatus::try_from(self.status)
    }

    /// Returns the key or a `MissingField` error.
    pub fn require_key(&self) -> ProtocolResult<&str> {
        self.key.as_deref().ok_or(ProtocolError::MissingField("key"))
    }

    /// Returns the version or a `MissingField` error.
    pub fn require_version(&self) -> ProtocolResult<u64> {
        self.version.ok_or(ProtocolError::MissingField("version"))
    }

    /// Returns the entity or a `MissingField` error.
    pub fn require_entity(&self) -> ProtocolResult<&JsonValue> {
        self.entity.as_ref().ok_or(ProtocolError::MissingField("entity"))
    }
}
