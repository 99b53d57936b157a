//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use synkit_sync_protocol::{RpcError, RpcRequest, RpcResponse, SyncReply};

/// Delivers one JSON-RPC request and returns its response.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process, mock for testing, etc.). A call either
/// returns a response or fails; there is no timeout or retry at this layer.
pub trait RpcTransport: Send + Sync {
    /// Sends `request` and waits for the response.
    fn call(&self, request: &RpcRequest) -> SyncResult<RpcResponse>;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Closes the transport connection.
    fn close(&self) -> SyncResult<()>;
}

#[derive(Debug)]
enum Canned {
    Result(JsonValue),
    Error(RpcError),
    Raw(RpcResponse),
    Failure(String),
}

/// A mock transport for testing.
///
/// Replies are queued in order; each call consumes one and is answered with
/// the request's own id. Every request is recorded.
#[derive(Debug)]
pub struct MockTransport {
    connected: AtomicBool,
    replies: Mutex<VecDeque<Canned>>,
    requests: Mutex<Vec<RpcRequest>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a sync reply.
    pub fn push_reply(&self, reply: &SyncReply) {
        let result = serde_json::to_value(reply).unwrap_or(JsonValue::Null);
        self.push_result(result);
    }

    /// Queues an arbitrary `result` value.
    pub fn push_result(&self, result: JsonValue) {
        self.replies.lock().push_back(Canned::Result(result));
    }

    /// Queues a JSON-RPC error response.
    pub fn push_error(&self, error: RpcError) {
        self.replies.lock().push_back(Canned::Error(error));
    }

    /// Queues a response that is returned verbatim, id included.
    pub fn push_raw(&self, response: RpcResponse) {
        self.replies.lock().push_back(Canned::Raw(response));
    }

    /// Queues a retryable transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies.lock().push_back(Canned::Failure(message.into()));
    }

    /// Returns the number of queued replies.
    pub fn pending(&self) -> usize {
        self.replies.lock().len()
    }

    /// Returns all requests received so far.
    pub fn requests(&self) -> Vec<RpcRequest> {
        self.requests.lock().clone()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<RpcRequest> {
        self.requests.lock().last().cloned()
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl RpcTransport for MockTransport {
    fn call(&self, request: &RpcRequest) -> SyncResult<RpcResponse> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        self.requests.lock().push(request.clone());

        let canned = self
            .replies
            .lock()
            .pop_front()
            .ok_or_else(|| SyncError::transport_fatal("no mock reply queued"))?;
        match canned {
            Canned::Result(result) => Ok(RpcResponse::success(request.id, result)),
            Canned::Error(error) => Ok(RpcResponse::failure(Some(request.id), error)),
            Canned::Raw(response) => Ok(response),
            Canned::Failure(message) => Err(SyncError::transport_retryable(message)),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> SyncResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
