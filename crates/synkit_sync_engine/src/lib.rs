//! # synkit Sync Engine
//!
//! Reconciles locally stored entities with a remote authoritative
//! datastore.
//!
//! This crate provides:
//! - [`SyncEngine`] - content-digest sync of one entity per RPC
//! - [`RpcTransport`] - transport seam, with [`MockTransport`] for tests
//! - [`HttpTransport`] - JSON over an abstract [`HttpClient`]
//! - [`LoopbackClient`] - routes HTTP posts to an in-process server
//!
//! ## Protocol
//!
//! `sync` sends `syncEntity(entity, digest)`; the digest covers the encoded
//! key and every property in name order, so the server can tell whether
//! anything changed without comparing entities. The server answers with one
//! of three outcomes:
//!
//! - **NotChanged** - the local record gets the server version
//! - **Updated** - the server entity replaces the local record
//! - **Stored** - the server took the local content; it gets the new version
//!
//! `sync_deleted` sends `syncDeletedEntity(key)` and accepts **NotFound**
//! or **Deleted**. Any other status is a protocol error that leaves local
//! state untouched.
//!
//! ## Key Invariants
//!
//! - Versions only change here, never on a plain `Storage::put`
//! - Requests with a JSON-RPC version other than `"2.0"` never reach the
//!   transport
//! - RPC ids come from a counter persisted in the local store
//! - No retries; callers decide based on [`SyncError::is_retryable`]

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod state;
mod transport;

pub use config::{SyncConfig, DEFAULT_ENDPOINT};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpTransport, LoopbackClient, LoopbackServer};
pub use state::{DeleteOutcome, PendingSync, SyncEngine, SyncOutcome, SyncStats, SyncTarget};
pub use transport::{MockTransport, RpcTransport};
