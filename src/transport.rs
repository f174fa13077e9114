//! Transport seam for outbound calls.
//!
//! The crate never touches the wire itself. A transport implements
//! [`FrameTransport`]; message-passing transports, where answers arrive as
//! separate inbound messages, can use [`PendingResponses`] to match them back
//! to the waiting call.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::error::TransportError;

/// Sends requests to another frame.
///
/// The returned future may never complete if the remote side never answers;
/// callers that need a bounded wait go through
/// [`correlated_request`](crate::correlated_request).
#[async_trait]
pub trait FrameTransport: Send + Sync {
    async fn send_request(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, TransportError>;
}

/// Correlation id → waiter table for inbound responses.
///
/// # Example
///
/// ```rust
/// use framecall::{PendingResponses, ResponseEnvelope};
/// use serde_json::json;
///
/// # async fn example() {
/// let pending = PendingResponses::new();
/// let waiter = pending.register("c-1").unwrap();
///
/// assert!(pending.route(ResponseEnvelope::success("c-1", json!(true))));
/// assert_eq!(waiter.await.unwrap().result(), Some(&json!(true)));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PendingResponses {
    waiters: Mutex<HashMap<String, oneshot::Sender<ResponseEnvelope>>>,
}

impl PendingResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `correlation_id`.
    pub fn register(
        &self,
        correlation_id: impl Into<String>,
    ) -> Result<oneshot::Receiver<ResponseEnvelope>, TransportError> {
        let correlation_id = correlation_id.into();
        let mut waiters = self.waiters.lock();
        // A waiter whose caller went away no longer blocks its id.
        waiters.retain(|_, tx| !tx.is_closed());
        if waiters.contains_key(&correlation_id) {
            return Err(TransportError::Duplicate(correlation_id));
        }
        let (tx, rx) = oneshot::channel();
        waiters.insert(correlation_id, tx);
        Ok(rx)
    }

    /// Hand a response to its waiter.
    ///
    /// Returns `false` for unknown ids, which covers late and duplicate answers.
    pub fn route(&self, response: ResponseEnvelope) -> bool {
        let Some(tx) = self.waiters.lock().remove(&response.correlation_id) else {
            debug!(correlation_id = %response.correlation_id, "response without waiter ignored");
            return false;
        };
        tx.send(response).is_ok()
    }

    /// Drop the waiter for `correlation_id`, if any.
    pub fn cancel(&self, correlation_id: &str) -> bool {
        self.waiters.lock().remove(correlation_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_route_completes_waiter() {
        let pending = PendingResponses::new();
        let rx = pending.register("c-1").unwrap();

        assert!(pending.route(ResponseEnvelope::success("c-1", json!(42))));
        assert_eq!(rx.await.unwrap().result(), Some(&json!(42)));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_late_response_is_ignored() {
        let pending = PendingResponses::new();
        let _rx = pending.register("c-1").unwrap();

        assert!(pending.route(ResponseEnvelope::success("c-1", json!(1))));
        assert!(!pending.route(ResponseEnvelope::success("c-1", json!(2))));
        assert!(!pending.route(ResponseEnvelope::success("c-9", json!(3))));
    }

    #[test]
    fn test_duplicate_id_rejected_until_waiter_dropped() {
        let pending = PendingResponses::new();
        let rx = pending.register("c-1").unwrap();

        assert_eq!(
            pending.register("c-1").unwrap_err(),
            TransportError::Duplicate("c-1".to_string())
        );

        drop(rx);
        assert!(pending.register("c-1").is_ok());
        assert!(pending.cancel("c-1"));
        assert_eq!(pending.len(), 0);
    }
}
