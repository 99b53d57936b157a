//! Integration tests for sync engine and server.

use serde_json::json;
use std::sync::Arc;
use synkit_core::{Entity, KeyPath, Storage, Value};
use synkit_sync_engine::{
    DeleteOutcome, HttpTransport, LoopbackClient, LoopbackServer, RpcTransport, SyncConfig,
    SyncEngine, SyncError, SyncResult, SyncTarget,
};
use synkit_sync_protocol::{ProtocolError, RpcRequest, RpcResponse};
use synkit_sync_server::{ServerConfig, SyncServer};

/// A transport that hands decoded requests to an in-memory server.
struct InMemoryTransport {
    server: Arc<SyncServer>,
}

impl InMemoryTransport {
    fn new(server: Arc<SyncServer>) -> Self {
        Self { server }
    }
}

impl RpcTransport for InMemoryTransport {
    fn call(&self, request: &RpcRequest) -> SyncResult<RpcResponse> {
        Ok(self.server.handle(request))
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn close(&self) -> SyncResult<()> {
        Ok(())
    }
}

/// Exposes a server to [`LoopbackClient`].
struct Endpoint(Arc<SyncServer>);

impl LoopbackServer for Endpoint {
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        self.0.handle_post(path, body)
    }
}

fn memory_engine(server: &Arc<SyncServer>) -> SyncEngine<InMemoryTransport> {
    SyncEngine::new(
        SyncConfig::new("memory://"),
        Storage::in_memory(),
        InMemoryTransport::new(Arc::clone(server)),
    )
}

fn http_engine(
    server: &Arc<SyncServer>,
    config: SyncConfig,
    storage: Storage,
) -> SyncEngine<HttpTransport<LoopbackClient<Endpoint>>> {
    let client = LoopbackClient::new(Endpoint(Arc::clone(server)));
    let transport = HttpTransport::from_config(&config, client);
    SyncEngine::new(config, storage, transport)
}

fn put_person(storage: &Storage, name: &str, age: i64) -> KeyPath {
    let mut person = Entity::builder("Person").name(name).build().unwrap();
    person.set("age", age).unwrap();
    person.set("tags", Value::list(["a", "b"]).unwrap()).unwrap();
    storage.put(&mut person).unwrap()
}

#[test]
fn stored_then_not_changed() {
    let server = Arc::new(SyncServer::new(ServerConfig::default()));
    let engine = memory_engine(&server);
    let key = put_person(engine.storage(), "ann", 31);

    let synced = engine.sync(&key).unwrap();
    assert_eq!(synced.version(), 1);
    assert_eq!(engine.storage().get(&key).unwrap().version(), 1);
    assert_eq!(server.version_of(key.as_str()), Some(1));

    let synced = engine.sync(&key).unwrap();
    assert_eq!(synced.version(), 1);

    let stats = engine.stats();
    assert_eq!(stats.stored, 1);
    assert_eq!(stats.not_changed, 1);
    assert_eq!(stats.failures, 0);
}

#[test]
fn local_changes_bump_the_version() {
    let server = Arc::new(SyncServer::new(ServerConfig::default()));
    let engine = memory_engine(&server);
    let key = put_person(engine.storage(), "ann", 31);
    engine.sync(&key).unwrap();

    let mut person = engine.storage().get(&key).unwrap();
    person.set("age", 32i64).unwrap();
    engine.storage().put(&mut person).unwrap();

    let synced = engine.sync(SyncTarget::Key(key.clone())).unwrap();
    assert_eq!(synced.version(), 2);
    let info = server.entity(key.as_str()).unwrap();
    assert_eq!(info.record.properties["age"].value, json!(32));
}

#[test]
fn stale_client_receives_server_entity() {
    let server = Arc::new(SyncServer::new(ServerConfig::default()));

    let first = memory_engine(&server);
    let key = put_person(first.storage(), "ann", 31);
    first.sync(&key).unwrap();
    let mut person = first.storage().get(&key).unwrap();
    person.set("age", 40i64).unwrap();
    first.storage().put(&mut person).unwrap();
    first.sync(&key).unwrap();
    assert_eq!(server.version_of(key.as_str()), Some(2));

    let second = memory_engine(&server);
    let second_key = put_person(second.storage(), "ann", 25);
    assert_eq!(second_key, key);

    let synced = second.sync(&key).unwrap();
    assert_eq!(synced.version(), 2);
    assert_eq!(synced.get("age"), Some(&Value::Int(40)));
    assert_eq!(second.storage().get(&key).unwrap().get("age"), Some(&Value::Int(40)));
    assert_eq!(second.stats().updated, 1);
}

#[test]
fn deletes_round_trip() {
    let server = Arc::new(SyncServer::new(ServerConfig::default()));
    let engine = memory_engine(&server);
    let key = put_person(engine.storage(), "ann", 31);
    engine.sync(&key).unwrap();

    assert!(engine.storage().delete(&key).unwrap());
    assert_eq!(engine.sync_deleted(&key).unwrap(), DeleteOutcome::Deleted);
    assert_eq!(engine.sync_deleted(&key).unwrap(), DeleteOutcome::NotFound);
    assert_eq!(server.entity_count(), 0);
    assert_eq!(engine.stats().deletes_synced(), 2);
}

#[test]
fn http_loopback_round_trip() {
    let server = Arc::new(SyncServer::new(ServerConfig::default()));
    let engine = http_engine(&server, SyncConfig::new("http://localhost:8080"), Storage::in_memory());

    assert_eq!(engine.echo(json!({"ping": 1})).unwrap(), json!({"ping": 1}));

    let mut note = Entity::new("Note").unwrap();
    note.set("text", "offline first").unwrap();
    let key = engine.storage().put(&mut note).unwrap();

    let synced = engine.sync(&key).unwrap();
    assert_eq!(synced.version(), 1);
    assert_eq!(synced.get("text"), Some(&Value::String("offline first".into())));
    assert!(engine.transport().is_connected());
}

#[test]
fn wrong_endpoint_is_a_transport_error() {
    let server = Arc::new(SyncServer::new(ServerConfig::default()));
    let config = SyncConfig::new("http://localhost").with_endpoint("/elsewhere/");
    let engine = http_engine(&server, config, Storage::in_memory());

    let err = engine.echo(json!(1)).unwrap_err();
    assert!(matches!(err, SyncError::Transport { .. }));
    assert_eq!(engine.transport().last_error().map(|e| e.contains("404")), Some(true));
}

#[test]
fn wrong_jsonrpc_version_never_reaches_the_server() {
    let server = Arc::new(SyncServer::new(ServerConfig::default()));
    let config = SyncConfig::new("http://localhost").with_jsonrpc_version("1.0");
    let engine = http_engine(&server, config, Storage::in_memory());
    let key = put_person(engine.storage(), "ann", 31);

    let err = engine.sync(&key).unwrap_err();
    assert!(matches!(
        err,
        SyncError::Protocol(ProtocolError::UnsupportedVersion { .. })
    ));
    assert_eq!(server.entity_count(), 0);
    assert_eq!(engine.storage().get(&key).unwrap().version(), 0);
    assert_eq!(engine.stats().failures, 1);
}

#[test]
fn foreign_application_is_rejected_by_the_server() {
    let server = Arc::new(SyncServer::new(ServerConfig::new("guestbook")));
    let engine = memory_engine(&server);
    let key = put_person(engine.storage(), "ann", 31);

    let err = engine.sync(&key).unwrap_err();
    assert!(!err.is_retryable());
    match err {
        SyncError::ServerError { code, .. } => assert_eq!(code, -32602),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.storage().get(&key).unwrap().version(), 0);
}

#[test]
fn file_backed_client_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("client.db");
    let server = Arc::new(SyncServer::new(ServerConfig::default()));

    let key = {
        let engine = http_engine(&server, SyncConfig::new("http://localhost"), Storage::open(&path).unwrap());
        let key = put_person(engine.storage(), "ann", 31);
        engine.sync(&key).unwrap();
        engine.storage().flush().unwrap();
        key
    };

    let storage = Storage::open(&path).unwrap();
    assert_eq!(storage.get(&key).unwrap().version(), 1);
    let engine = http_engine(&server, SyncConfig::new("http://localhost"), storage);
    let synced = engine.sync(&key).unwrap();
    assert_eq!(synced.version(), 1);
    assert_eq!(engine.stats().not_changed, 1);
}

#[test]
fn background_syncs_complete() {
    let server = Arc::new(SyncServer::new(ServerConfig::default()));
    let engine = memory_engine(&server);
    let keys: Vec<KeyPath> = ["ann", "bob", "cy"]
        .iter()
        .map(|name| put_person(engine.storage(), name, 20))
        .collect();

    let pending: Vec<_> = keys
        .iter()
        .map(|key| engine.sync_in_background(key).unwrap())
        .collect();
    for task in pending {
        assert_eq!(task.wait().unwrap().version(), 1);
    }
    assert_eq!(server.entity_count(), 3);
    assert_eq!(engine.stats().stored, 3);
}
