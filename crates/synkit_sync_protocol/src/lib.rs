//! # synkit Sync Protocol
//!
//! Wire types for synkit synchronization.
//!
//! This crate provides:
//! - [`RpcRequest`] / [`RpcResponse`] JSON-RPC 2.0 envelopes
//! - [`SyncReply`] and [`SyncStatus`], the five server-declared outcomes
//! - typed parameter extraction for `syncEntity` and `syncDeletedEntity`
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod messages;
mod status;

pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    error_codes, methods, RpcError, RpcRequest, RpcResponse, SyncDeletedParams,
    SyncEntityParams, SyncReply, JSONRPC_VERSION,
};
pub use status::SyncStatus;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn request_bytes_roundtrip(id in any::<u64>(), key in "[A-Za-z0-9+/=]{4,40}") {
            let request = RpcRequest::sync_deleted_entity(id, &key);
            let decoded = RpcRequest::decode(&request.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded, request);
        }

        #[test]
        fn status_codes_outside_range_are_rejected(code in 6u8..) {
            prop_assert!(SyncStatus::try_from(code).is_err());
        }
    }
}
