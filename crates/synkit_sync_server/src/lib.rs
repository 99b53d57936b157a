//! # synkit Sync Server
//!
//! Reference JSON-RPC sync server for synkit.
//!
//! This crate provides:
//! - [`SyncServer`] - request handling over raw bodies or decoded requests
//! - [`SyncInfoStore`] - authoritative entity records with versions and
//!   content digests
//! - [`RequestHandler`] - the `syncEntity`, `syncDeletedEntity` and `test`
//!   methods
//!
//! # Protocol
//!
//! For `syncEntity(entity, digest)` the server compares the digest with the
//! one it stored last:
//! 1. Unknown key: store at version 1 and answer **Stored**
//! 2. Same digest: answer **NotChanged** with the current version
//! 3. Client version behind the server: answer **Updated** with the server
//!    entity
//! 4. Otherwise: store, bump the version and answer **Stored**
//!
//! `syncDeletedEntity(key)` answers **Deleted** or **NotFound**.
//!
//! The server is transport agnostic; [`SyncServer::handle_post`] is the
//! hook an HTTP layer calls.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;
mod store;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::SyncServer;
pub use store::{SyncInfo, SyncInfoStore};
