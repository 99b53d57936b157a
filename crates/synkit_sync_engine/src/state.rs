//! Sync engine.
//!
//! One sync call is one RPC:
//!
//! ```text
//! Local(dirty) --syncEntity-------->  NotChanged | Updated | Stored
//! Local(deleted) --syncDeletedEntity--> NotFound | Deleted
//! ```
//!
//! Every entity outcome persists some version of the entity; delete outcomes
//! have no further local effect. Any other status is a protocol error and
//! leaves local state untouched.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::RpcTransport;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use synkit_core::{CoreError, Entity, EntityRecord, KeyPath, Storage};
use synkit_sync_protocol::{methods, ProtocolError, RpcRequest, RpcResponse, SyncReply, SyncStatus};
use tracing::{debug, info, warn};

/// What to synchronize: a stored entity by key, or an entity value.
#[derive(Debug, Clone)]
pub enum SyncTarget {
    /// Load the entity from storage first.
    Key(KeyPath),
    /// Send this entity as is.
    Entity(Entity),
}

impl SyncTarget {
    fn key(&self) -> &KeyPath {
        match self {
            SyncTarget::Key(key) => key,
            SyncTarget::Entity(entity) => entity.key(),
        }
    }
}

impl From<KeyPath> for SyncTarget {
    fn from(key: KeyPath) -> Self {
        SyncTarget::Key(key)
    }
}

impl From<&KeyPath> for SyncTarget {
    fn from(key: &KeyPath) -> Self {
        SyncTarget::Key(key.clone())
    }
}

impl From<Entity> for SyncTarget {
    fn from(entity: Entity) -> Self {
        SyncTarget::Entity(entity)
    }
}

impl From<&Entity> for SyncTarget {
    fn from(entity: &Entity) -> Self {
        SyncTarget::Entity(entity.clone())
    }
}

/// An applied `syncEntity` outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// `NotChanged`, `Updated` or `Stored`.
    pub status: SyncStatus,
    /// Key the outcome was applied to.
    pub key: KeyPath,
    /// Version now stored locally.
    pub version: u64,
}

/// A `syncDeletedEntity` outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The server did not know the key.
    NotFound,
    /// The server removed the key.
    Deleted,
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Entity syncs answered `NotChanged`.
    pub not_changed: u64,
    /// Entity syncs answered `Updated`.
    pub updated: u64,
    /// Entity syncs answered `Stored`.
    pub stored: u64,
    /// Delete syncs answered `NotFound`.
    pub not_found: u64,
    /// Delete syncs answered `Deleted`.
    pub deleted: u64,
    /// Calls that ended in an error.
    pub failures: u64,
    /// Time of the last successful call.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

impl SyncStats {
    /// Total successful entity syncs.
    pub fn entities_synced(&self) -> u64 {
        self.not_changed + self.updated + self.stored
    }

    /// Total successful delete syncs.
    pub fn deletes_synced(&self) -> u64 {
        self.not_found + self.deleted
    }
}

/// Handle to a sync running on a background thread.
///
/// By the time the thread finishes, its outcome has been applied to
/// storage; re-read the entity to observe it.
#[derive(Debug)]
pub struct PendingSync<R> {
    handle: JoinHandle<SyncResult<R>>,
}

impl<R> PendingSync<R> {
    /// Returns true once the background call has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the background call finishes and returns its result.
    pub fn wait(self) -> SyncResult<R> {
        self.handle
            .join()
            .map_err(|_| SyncError::Background("sync thread panicked".into()))?
    }
}

/// Synchronizes entities in a [`Storage`] with a server.
///
/// Callers must not run overlapping syncs for the same key.
pub struct SyncEngine<T: RpcTransport> {
    config: SyncConfig,
    storage: Storage,
    transport: Arc<T>,
    stats: Arc<RwLock<SyncStats>>,
}

impl<T: RpcTransport> Clone for SyncEngine<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            storage: self.storage.clone(),
            transport: Arc::clone(&self.transport),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T: RpcTransport> SyncEngine<T> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, storage: Storage, transport: T) -> Self {
        Self::with_shared_transport(config, storage, Arc::new(transport))
    }

    /// Creates a sync engine over a shared transport.
    pub fn with_shared_transport(config: SyncConfig, storage: Storage, transport: Arc<T>) -> Self {
        Self {
            config,
            storage,
            transport,
            stats: Arc::new(RwLock::new(SyncStats::default())),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the local storage.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Synchronizes one entity and returns the local entity afterwards.
    ///
    /// The entity must have a complete key (put it first). The request
    /// carries the entity record and its content digest; the reply is
    /// applied to storage before this returns.
    ///
    /// # Errors
    ///
    /// - `Core` if the entity cannot be loaded or has an incomplete key
    /// - `Protocol` for a bad envelope or an unexpected status
    /// - `ServerError` / `Transport` / `NotConnected` from the call itself
    pub fn sync(&self, target: impl Into<SyncTarget>) -> SyncResult<Entity> {
        let target = target.into();
        let result = self.sync_target(&target);
        self.record(result.as_ref().map(|(outcome, _)| outcome.status));
        result.map(|(_, entity)| entity)
    }

    fn sync_target(&self, target: &SyncTarget) -> SyncResult<(SyncOutcome, Entity)> {
        let entity = match target {
            SyncTarget::Key(key) => self.storage.get(key)?,
            SyncTarget::Entity(entity) => entity.clone(),
        };
        if !entity.key().has_identity() {
            return Err(CoreError::invalid_operation(format!(
                "cannot sync {} with an incomplete key; put it first",
                entity.kind()
            ))
            .into());
        }

        let digest = entity.content_digest()?;
        let id = self.storage.next_rpc_id()?;
        let request = self.request(RpcRequest::sync_entity(id, entity.to_json()?, &digest));
        debug!(key = ?target.key(), digest = %digest, "syncing entity");

        let reply = self.call(&request)?.sync_reply()?;
        let outcome = self.apply(&reply, Some(&entity))?;
        let stored = self.storage.get(&outcome.key)?;
        Ok((outcome, stored))
    }

    /// Runs [`SyncEngine::sync`] on a background thread.
    ///
    /// Returns as soon as the thread is started.
    pub fn sync_in_background(&self, target: impl Into<SyncTarget>) -> SyncResult<PendingSync<Entity>>
    where
        T: 'static,
    {
        let engine = self.clone();
        let target = target.into();
        self.spawn(move || {
            let result = engine.sync(target);
            if let Err(e) = &result {
                warn!(error = %e, "background sync failed");
            }
            result
        })
    }

    /// Tells the server that `key` was deleted locally.
    ///
    /// Local storage is not touched.
    ///
    /// # Errors
    ///
    /// `Protocol` for any status other than `NotFound` or `Deleted`, plus
    /// the call errors of [`SyncEngine::sync`].
    pub fn sync_deleted(&self, key: &KeyPath) -> SyncResult<DeleteOutcome> {
        let result = self.sync_deleted_key(key);
        self.record(result.as_ref().map(|outcome| match outcome {
            DeleteOutcome::NotFound => SyncStatus::NotFound,
            DeleteOutcome::Deleted => SyncStatus::Deleted,
        }));
        result
    }

    fn sync_deleted_key(&self, key: &KeyPath) -> SyncResult<DeleteOutcome> {
        let id = self.storage.next_rpc_id()?;
        let request = self.request(RpcRequest::sync_deleted_entity(id, key.as_str()));
        debug!(key = ?key, "syncing deleted entity");

        let reply = self.call(&request)?.sync_reply()?;
        match reply.status()? {
            SyncStatus::NotFound => Ok(DeleteOutcome::NotFound),
            SyncStatus::Deleted => Ok(DeleteOutcome::Deleted),
            other => Err(ProtocolError::UnexpectedStatus {
                status: other.code(),
                method: methods::SYNC_DELETED_ENTITY,
            }
            .into()),
        }
    }

    /// Runs [`SyncEngine::sync_deleted`] on a background thread.
    pub fn sync_deleted_in_background(&self, key: &KeyPath) -> SyncResult<PendingSync<DeleteOutcome>>
    where
        T: 'static,
    {
        let engine = self.clone();
        let key = key.clone();
        self.spawn(move || {
            let result = engine.sync_deleted(&key);
            if let Err(e) = &result {
                warn!(error = %e, "background delete sync failed");
            }
            result
        })
    }

    /// Sends a `test` call; the server echoes `param` back.
    pub fn echo(&self, param: JsonValue) -> SyncResult<JsonValue> {
        let id = self.storage.next_rpc_id()?;
        let response = self.call(&self.request(RpcRequest::test(id, param)))?;
        response
            .result
            .ok_or_else(|| ProtocolError::MissingField("result").into())
    }

    /// Applies a `syncEntity` reply to local storage.
    ///
    /// - `NotChanged` / `Stored`: the stored entity under the reply key gets
    ///   the reply version and is re-persisted
    /// - `Updated`: the reply entity replaces the local record
    ///
    /// # Errors
    ///
    /// `Protocol` for an unknown or non-entity status or a missing field;
    /// nothing is written in that case.
    pub fn apply_reply(&self, reply: &SyncReply) -> SyncResult<SyncOutcome> {
        self.apply(reply, None)
    }

    fn apply(&self, reply: &SyncReply, sent: Option<&Entity>) -> SyncResult<SyncOutcome> {
        let status = reply.status()?;
        match status {
            SyncStatus::NotChanged | SyncStatus::Stored => {
                let key = KeyPath::from_encoded(reply.require_key()?)?;
                let version = reply.require_version()?;

                // NotChanged bumps the stored record; Stored keeps what was sent
                let sent = sent.filter(|entity| entity.key() == &key);
                let mut entity = match (status, sent) {
                    (SyncStatus::Stored, Some(entity)) => entity.clone(),
                    (_, Some(entity)) if !self.storage.contains(&key)? => entity.clone(),
                    _ => self.storage.get(&key)?,
                };
                if version < entity.version() {
                    warn!(key = ?key, local = entity.version(), server = version, "server version is older than local");
                }
                entity.set_version(version);
                self.storage.put(&mut entity)?;
                info!(key = ?key, version, status = %status, "sync applied");
                Ok(SyncOutcome { status, key, version })
            }
            SyncStatus::Updated => {
                let record = EntityRecord::from_json_value(reply.require_entity()?.clone())
                    .map_err(CoreError::from)?;
                let mut entity = Entity::from_record(record)?;
                if let Some(version) = reply.version {
                    entity.set_version(version);
                }
                let key = self.storage.put(&mut entity)?;
                let version = entity.version();
                info!(key = ?key, version, status = %status, "sync applied");
                Ok(SyncOutcome { status, key, version })
            }
            other => Err(ProtocolError::UnexpectedStatus {
                status: other.code(),
                method: methods::SYNC_ENTITY,
            }
            .into()),
        }
    }

    fn request(&self, request: RpcRequest) -> RpcRequest {
        request.with_version(self.config.jsonrpc_version.as_str())
    }

    fn call(&self, request: &RpcRequest) -> SyncResult<RpcResponse> {
        request.validate()?;
        debug!(method = %request.method, id = request.id, "rpc call");

        let response = self.transport.call(request)?;
        if let Some(error) = response.error {
            return Err(SyncError::ServerError {
                code: error.code,
                message: error.message,
            });
        }
        response.check_id(request.id)?;
        Ok(response)
    }

    fn spawn<R, F>(&self, task: F) -> SyncResult<PendingSync<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> SyncResult<R> + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("synkit-sync".into())
            .spawn(task)
            .map_err(|e| SyncError::Background(e.to_string()))?;
        Ok(PendingSync { handle })
    }

    fn record(&self, result: Result<SyncStatus, &SyncError>) {
        let mut stats = self.stats.write();
        match result {
            Ok(status) => {
                match status {
                    SyncStatus::NotChanged => stats.not_changed += 1,
                    SyncStatus::Updated => stats.updated += 1,
                    SyncStatus::Stored => stats.stored += 1,
                    SyncStatus::NotFound => stats.not_found += 1,
                    SyncStatus::Deleted => stats.deleted += 1,
                }
                stats.last_sync_time = Some(Instant::now());
                stats.last_error = None;
            }
            Err(e) => {
                stats.failures += 1;
                stats.last_error = Some(e.to_string());
            }
        }
    }
}
