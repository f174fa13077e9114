//! Correlated requests with a timeout fallback.
//!
//! A correlated request races the remote answer against a bounded timer. The
//! two paths run as separate tasks and both try to resolve the same
//! [`PendingCorrelation`]; only the first succeeds and the loser becomes a
//! no-op. The caller always receives a value: either the remote result or the
//! policy's safe default.
//!
//! ```text
//!            ┌── response task ── send_request ── resolve_by_response ──┐
//!  Pending ──┤                                                          ├──> first wins
//!            └── timer task ───── sleep(timeout) ── resolve_by_timeout ─┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{RpcConfig, DEFAULT_CORRELATION_TIMEOUT};
use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::transport::FrameTransport;

/// Lifecycle of one correlation. Both resolved states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationState {
    Pending,
    ResolvedByResponse,
    ResolvedByTimeout,
}

/// The value a correlated request settled on and which path produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<T> {
    pub value: T,
    pub outcome: CorrelationState,
}

impl<T> Resolution<T> {
    pub fn timed_out(&self) -> bool {
        self.outcome == CorrelationState::ResolvedByTimeout
    }
}

/// Timeout bound and safe default for one kind of correlated request.
#[derive(Debug, Clone)]
pub struct CorrelationPolicy<T> {
    timeout: Duration,
    default: T,
}

impl<T: Clone> CorrelationPolicy<T> {
    /// A policy with the default timeout.
    pub fn new(default: T) -> Self {
        Self {
            timeout: DEFAULT_CORRELATION_TIMEOUT,
            default,
        }
    }

    /// A policy using the configured correlation timeout.
    pub fn from_config(config: &RpcConfig, default: T) -> Self {
        Self::new(default).with_timeout(config.correlation_timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }
}

struct Inner<T> {
    state: CorrelationState,
    resolver: Option<oneshot::Sender<Resolution<T>>>,
    request_task: Option<JoinHandle<()>>,
    timer_task: Option<JoinHandle<()>>,
}

/// One in-flight correlation with a once-only resolver.
pub struct PendingCorrelation<T> {
    id: String,
    created_at: Instant,
    inner: Mutex<Inner<T>>,
}

impl<T: Send + 'static> PendingCorrelation<T> {
    /// Create a pending correlation and the receiver its resolution arrives on.
    pub fn new(id: impl Into<String>) -> (Arc<Self>, oneshot::Receiver<Resolution<T>>) {
        let (tx, rx) = oneshot::channel();
        let pending = Arc::new(Self {
            id: id.into(),
            created_at: Instant::now(),
            inner: Mutex::new(Inner {
                state: CorrelationState::Pending,
                resolver: Some(tx),
                request_task: None,
                timer_task: None,
            }),
        });
        (pending, rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> CorrelationState {
        self.inner.lock().state
    }

    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Resolve with the remote result. Cancels the timer.
    ///
    /// Returns `false` if the correlation was already resolved.
    pub fn resolve_by_response(&self, value: T) -> bool {
        self.resolve(value, CorrelationState::ResolvedByResponse)
    }

    /// Resolve with the safe default. Abandons the outstanding request.
    ///
    /// Returns `false` if the correlation was already resolved.
    pub fn resolve_by_timeout(&self, default: T) -> bool {
        self.resolve(default, CorrelationState::ResolvedByTimeout)
    }

    fn resolve(&self, value: T, outcome: CorrelationState) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != CorrelationState::Pending {
            return false;
        }
        inner.state = outcome;

        let loser = match outcome {
            CorrelationState::ResolvedByResponse => inner.timer_task.take(),
            _ => inner.request_task.take(),
        };
        if let Some(task) = loser {
            task.abort();
        }
        inner.request_task = None;
        inner.timer_task = None;

        if let Some(tx) = inner.resolver.take() {
            // The caller may have gone away; the resolution is still final.
            let _ = tx.send(Resolution { value, outcome });
        }
        true
    }

    fn attach_request(&self, task: JoinHandle<()>) {
        let mut inner = self.inner.lock();
        if inner.state == CorrelationState::Pending {
            inner.request_task = Some(task);
        }
    }

    fn attach_timer(&self, task: JoinHandle<()>) {
        let mut inner = self.inner.lock();
        if inner.state == CorrelationState::Pending {
            inner.timer_task = Some(task);
        } else {
            task.abort();
        }
    }

    /// Start the timer task that falls back to `default` after `timeout`.
    pub fn start_timer(self: &Arc<Self>, timeout: Duration, default: T) {
        let pending = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if pending.resolve_by_timeout(default) {
                warn!(
                    correlation_id = %pending.id,
                    timeout_ms = timeout.as_millis() as u64,
                    "correlated request timed out, using safe default"
                );
            }
        });
        self.attach_timer(task);
    }
}

impl<T> std::fmt::Debug for PendingCorrelation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCorrelation")
            .field("id", &self.id)
            .field("state", &self.inner.lock().state)
            .finish()
    }
}

/// Issue `envelope` and resolve within the policy's timeout.
///
/// `extract` reads the result out of the remote answer; `None` marks the
/// answer as malformed and the safe default is used. A transport failure is
/// logged and left to the timer. This never fails.
pub async fn correlated_request<T, F>(
    transport: Arc<dyn FrameTransport>,
    envelope: RequestEnvelope,
    policy: &CorrelationPolicy<T>,
    extract: F,
) -> Resolution<T>
where
    T: Clone + Send + 'static,
    F: FnOnce(&ResponseEnvelope) -> Option<T> + Send + 'static,
{
    let (pending, rx) = PendingCorrelation::new(envelope.correlation_id.clone());
    debug!(
        correlation_id = %pending.id(),
        namespace = %envelope.target_namespace,
        method = %envelope.method,
        "issuing correlated request"
    );

    let responder = Arc::clone(&pending);
    let fallback = policy.default.clone();
    let request = tokio::spawn(async move {
        match transport.send_request(envelope).await {
            Ok(response) => {
                let value = extract(&response).unwrap_or_else(|| {
                    warn!(
                        correlation_id = %response.correlation_id,
                        "malformed response, using safe default"
                    );
                    fallback
                });
                responder.resolve_by_response(value);
            }
            Err(err) => {
                warn!(
                    correlation_id = %responder.id(),
                    error = %err,
                    "transport failed, waiting for timeout"
                );
            }
        }
    });
    pending.attach_request(request);
    pending.start_timer(policy.timeout, policy.default.clone());

    rx.await.unwrap_or_else(|_| Resolution {
        value: policy.default.clone(),
        outcome: CorrelationState::ResolvedByTimeout,
    })
}

/// Ask a remote frame a yes/no question.
///
/// Resolves to `body.result` when it is a boolean, otherwise to the policy's
/// default.
pub async fn confirm(
    transport: Arc<dyn FrameTransport>,
    envelope: RequestEnvelope,
    policy: &CorrelationPolicy<bool>,
) -> bool {
    correlated_request(transport, envelope, policy, |response| {
        response.result().and_then(Value::as_bool)
    })
    .await
    .value
}

/// A transport bound to a configured correlation timeout.
#[derive(Clone)]
pub struct Correlator {
    transport: Arc<dyn FrameTransport>,
    timeout: Duration,
}

impl Correlator {
    pub fn new(transport: Arc<dyn FrameTransport>, config: &RpcConfig) -> Self {
        Self {
            transport,
            timeout: config.correlation_timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Call `namespace.method` on the remote frame, falling back to `default`.
    pub async fn request<T, F>(
        &self,
        namespace: &str,
        method: &str,
        body: Value,
        default: T,
        extract: F,
    ) -> Resolution<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&ResponseEnvelope) -> Option<T> + Send + 'static,
    {
        let policy = CorrelationPolicy::new(default).with_timeout(self.timeout);
        let envelope = RequestEnvelope::new(namespace, method, body);
        correlated_request(Arc::clone(&self.transport), envelope, &policy, extract).await
    }

    /// Boolean question with `default` as the safe answer.
    pub async fn confirm(&self, namespace: &str, method: &str, body: Value, default: bool) -> bool {
        let policy = CorrelationPolicy::new(default).with_timeout(self.timeout);
        let envelope = RequestEnvelope::new(namespace, method, body);
        confirm(Arc::clone(&self.transport), envelope, &policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use serde_json::json;

    struct Answering(ResponseEnvelope);

    #[async_trait]
    impl FrameTransport for Answering {
        async fn send_request(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
            let mut response = self.0.clone();
            response.correlation_id = envelope.correlation_id;
            Ok(response)
        }
    }

    struct Silent;

    #[async_trait]
    impl FrameTransport for Silent {
        async fn send_request(&self, _envelope: RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
            std::future::pending().await
        }
    }

    struct Broken;

    #[async_trait]
    impl FrameTransport for Broken {
        async fn send_request(&self, _envelope: RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
            Err(TransportError::Closed)
        }
    }

    fn envelope() -> RequestEnvelope {
        RequestEnvelope::new("root.ui", "confirmLeave", json!({}))
    }

    #[tokio::test]
    async fn test_resolver_is_once_only() {
        let (pending, rx) = PendingCorrelation::new("c-1");

        assert!(pending.resolve_by_response(true));
        assert!(!pending.resolve_by_timeout(false));
        assert!(!pending.resolve_by_response(false));

        let resolution = rx.await.unwrap();
        assert!(resolution.value);
        assert_eq!(resolution.outcome, CorrelationState::ResolvedByResponse);
        assert_eq!(pending.state(), CorrelationState::ResolvedByResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_cancels_timer() {
        let (pending, rx) = PendingCorrelation::new("c-2");
        pending.start_timer(Duration::from_millis(100), false);

        assert!(pending.resolve_by_response(true));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(pending.state(), CorrelationState::ResolvedByResponse);
        assert!(rx.await.unwrap().value);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_answer_wins() {
        let transport = Arc::new(Answering(ResponseEnvelope::success("", json!(true))));
        let policy = CorrelationPolicy::new(false);

        let resolution = correlated_request(transport, envelope(), &policy, |r| {
            r.result().and_then(Value::as_bool)
        })
        .await;

        assert_eq!(
            resolution,
            Resolution {
                value: true,
                outcome: CorrelationState::ResolvedByResponse
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_remote_times_out_to_default() {
        let policy = CorrelationPolicy::new(false).with_timeout(Duration::from_millis(2500));
        let started = Instant::now();

        let resolution = correlated_request(Arc::new(Silent), envelope(), &policy, |r| {
            r.result().and_then(Value::as_bool)
        })
        .await;

        assert!(resolution.timed_out());
        assert!(!resolution.value);
        assert!(started.elapsed() >= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_answer_uses_default() {
        let transport = Arc::new(Answering(ResponseEnvelope::failure("", "handlerRejection", "boom")));
        let policy = CorrelationPolicy::new(false);

        let answer = confirm(transport, envelope(), &policy).await;
        assert!(!answer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_falls_back_after_timeout() {
        let policy = CorrelationPolicy::new(true).with_timeout(Duration::from_millis(300));

        let resolution =
            correlated_request(Arc::new(Broken), envelope(), &policy, |_| Some(false)).await;

        assert!(resolution.timed_out());
        assert!(resolution.value);
    }

    #[tokio::test(start_paused = true)]
    async fn test_correlator_uses_configured_timeout() {
        let config = RpcConfig::new().with_correlation_timeout_ms(50);
        let correlator = Correlator::new(Arc::new(Silent), &config);
        assert_eq!(correlator.timeout(), Duration::from_millis(50));

        let started = Instant::now();
        assert!(!correlator.confirm("root.ui", "confirmLeave", json!({}), false).await);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
