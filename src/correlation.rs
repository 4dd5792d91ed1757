//! Correlation table - outstanding requests waiting for a response.
//!
//! Each entry maps a request id to the sending half of a oneshot channel.
//! The receiving half is handed back to the caller as a [`PendingResponse`].
//! An entry is created when a request is sent and removed when the matching
//! response arrives. Nothing else removes it: there are no timeouts.
//!
//! ```text
//! send_request ─► register(id) ─► PendingResponse ─────────────┐
//!                                                              ▼
//! handle_message(response) ─► resolve(response) ─► oneshot ─► .await
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{KindwireError, Result};
use crate::message::Response;

/// Table of outstanding requests owned by one peer.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    pending: Mutex<HashMap<String, oneshot::Sender<Response>>>,
}

impl CorrelationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<Response>>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a request id and return the future its response resolves.
    ///
    /// Ids are assumed unique; registering an id twice replaces the earlier
    /// entry, whose future then fails with [`KindwireError::PeerDropped`].
    pub fn register(&self, request_id: impl Into<String>) -> PendingResponse {
        let request_id = request_id.into();
        let (tx, rx) = oneshot::channel();
        self.lock().insert(request_id.clone(), tx);
        PendingResponse { request_id, rx }
    }

    /// Deliver a response to the request it answers.
    ///
    /// Lookup and removal happen under a single lock, so a response is
    /// delivered at most once. Returns `false` if no request with id
    /// `response.response_to` is outstanding.
    pub fn resolve(&self, response: Response) -> bool {
        let Some(tx) = self.lock().remove(&response.response_to) else {
            return false;
        };

        if let Err(response) = tx.send(response) {
            tracing::debug!(
                "Caller stopped waiting for response to {}",
                response.response_to
            );
        }
        true
    }

    /// Drop an outstanding entry without resolving it.
    pub fn remove(&self, request_id: &str) -> bool {
        self.lock().remove(request_id).is_some()
    }

    /// Whether a request id is outstanding.
    pub fn contains(&self, request_id: &str) -> bool {
        self.lock().contains_key(request_id)
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no requests are outstanding.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Future resolving to the response of a sent request.
///
/// Created by [`Peer::send_request`](crate::Peer::send_request). There is no
/// timeout; the future stays pending until the matching response is handled
/// by the same peer. Dropping it does not remove the table entry.
#[derive(Debug)]
#[must_use = "the response is only observable by awaiting this future"]
pub struct PendingResponse {
    request_id: String,
    rx: oneshot::Receiver<Response>,
}

impl PendingResponse {
    /// Id of the request this future waits on.
    #[inline]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Future for PendingResponse {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(response)) => Poll::Ready(Ok(response)),
            Poll::Ready(Err(_)) => {
                Poll::Ready(Err(KindwireError::PeerDropped(self.request_id.clone())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response_to(request_id: &str, value: i64) -> Response {
        Response::new("ClientFullStateResponse", request_id, json!({ "score": value }))
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let table = CorrelationTable::new();
        let pending = table.register("req-1");

        assert_eq!(pending.request_id(), "req-1");
        assert!(table.contains("req-1"));
        assert_eq!(table.len(), 1);

        assert!(table.resolve(response_to("req-1", 7)));
        assert!(table.is_empty());

        let response = pending.await.unwrap();
        assert_eq!(response.payload, json!({"score": 7}));
    }

    #[tokio::test]
    async fn test_resolve_only_once() {
        let table = CorrelationTable::new();
        let pending = table.register("req-1");

        assert!(table.resolve(response_to("req-1", 1)));
        assert!(!table.resolve(response_to("req-1", 2)));

        let response = pending.await.unwrap();
        assert_eq!(response.payload, json!({"score": 1}));
    }

    #[test]
    fn test_resolve_unknown_is_noop() {
        let table = CorrelationTable::new();
        let _pending = table.register("req-1");

        assert!(!table.resolve(response_to("other", 1)));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_order_resolution() {
        let table = CorrelationTable::new();
        let first = table.register("a");
        let second = table.register("b");

        assert!(table.resolve(response_to("b", 2)));
        assert!(table.resolve(response_to("a", 1)));

        assert_eq!(first.await.unwrap().payload, json!({"score": 1}));
        assert_eq!(second.await.unwrap().payload, json!({"score": 2}));
    }

    #[tokio::test]
    async fn test_dropped_table_fails_pending() {
        let table = CorrelationTable::new();
        let pending = table.register("req-1");
        drop(table);

        let err = pending.await.unwrap_err();
        assert!(matches!(err, KindwireError::PeerDropped(id) if id == "req-1"));
    }

    #[test]
    fn test_dropped_future_keeps_entry() {
        let table = CorrelationTable::new();
        drop(table.register("req-1"));

        assert!(table.contains("req-1"));
        assert!(table.resolve(response_to("req-1", 1)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove() {
        let table = CorrelationTable::new();
        let _pending = table.register("req-1");

        assert!(table.remove("req-1"));
        assert!(!table.remove("req-1"));
        assert!(table.is_empty());
    }
}
