//! Notification distribution.
//!
//! [`should_deliver`] is the pure gate a transport consults before sending a
//! notification to a target. [`NotificationHub`] is a ready-made fan-out that
//! applies the gate to every subscribed frame.

use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::envelope::NotificationEnvelope;
use crate::handler::NotificationDescriptor;
use crate::registry::Registry;

/// What the gate knows about a prospective receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub frame_id: String,
    /// Whether this target is the currently active consumer
    pub active: bool,
    /// Audience tags this target carries
    pub audiences: BTreeSet<String>,
}

impl TargetDescriptor {
    pub fn new(frame_id: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
            ..Self::default()
        }
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_audience(mut self, tag: impl Into<String>) -> Self {
        self.audiences.insert(tag.into());
        self
    }
}

/// Decide whether `namespace.method` may be delivered to `target`.
///
/// Undeclared notifications are denied. An active-only notification is denied
/// to inactive targets whatever their audience tags.
pub fn should_deliver(
    registry: &Registry,
    namespace: &str,
    method: &str,
    target: &TargetDescriptor,
) -> bool {
    registry
        .lookup_notification(namespace, method)
        .and_then(|descriptor| admit(descriptor, target))
        .is_some()
}

/// The audience tag under which `descriptor` admits `target`.
fn admit<'d>(descriptor: &'d NotificationDescriptor, target: &TargetDescriptor) -> Option<&'d str> {
    if descriptor.active_only && !target.active {
        return None;
    }
    descriptor.matching_tag(target.audiences.iter().map(String::as_str))
}

struct Subscriber {
    target: TargetDescriptor,
    tx: mpsc::Sender<NotificationEnvelope>,
}

#[derive(Default)]
struct HubState {
    active: Option<String>,
    subscribers: Vec<Subscriber>,
}

/// Fans notifications out to subscribed frames.
///
/// Each subscriber gets its own bounded channel. Delivery is fire-and-forget:
/// a full channel loses that one notification, a closed one is dropped from
/// the hub on the next publish.
pub struct NotificationHub {
    registry: Arc<RwLock<Registry>>,
    state: Mutex<HubState>,
    buffer: usize,
}

impl NotificationHub {
    /// Create a hub that reads delivery policy from `registry`.
    pub fn new(registry: Arc<RwLock<Registry>>, buffer: usize) -> Self {
        Self {
            registry,
            state: Mutex::new(HubState::default()),
            buffer: buffer.max(1),
        }
    }

    /// Subscribe a frame. A second subscription for the same frame replaces
    /// the first, whose stream then ends.
    pub fn subscribe<I, S>(&self, frame_id: impl Into<String>, audiences: I) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let frame_id = frame_id.into();
        let (tx, rx) = mpsc::channel(self.buffer);

        let mut state = self.state.lock();
        let target = TargetDescriptor {
            active: state.active.as_deref() == Some(frame_id.as_str()),
            audiences: audiences.into_iter().map(Into::into).collect(),
            frame_id: frame_id.clone(),
        };
        state.subscribers.retain(|s| s.target.frame_id != frame_id);
        state.subscribers.push(Subscriber { target, tx });
        debug!(frame_id = %frame_id, "notification subscriber added");

        Subscription {
            frame_id,
            inner: ReceiverStream::new(rx),
        }
    }

    /// Remove a frame's subscription.
    pub fn unsubscribe(&self, frame_id: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.target.frame_id != frame_id);
        before != state.subscribers.len()
    }

    /// Mark `frame_id` as the active consumer.
    pub fn set_active(&self, frame_id: impl Into<String>) {
        let frame_id = frame_id.into();
        let mut state = self.state.lock();
        for subscriber in &mut state.subscribers {
            subscriber.target.active = subscriber.target.frame_id == frame_id;
        }
        state.active = Some(frame_id);
    }

    /// Clear the active consumer.
    pub fn clear_active(&self) {
        let mut state = self.state.lock();
        for subscriber in &mut state.subscribers {
            subscriber.target.active = false;
        }
        state.active = None;
    }

    pub fn active_frame(&self) -> Option<String> {
        self.state.lock().active.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Send `namespace.method` to every subscriber the gate admits.
    ///
    /// Returns the number of subscribers the notification was queued for.
    pub fn publish(&self, namespace: &str, method: &str, body: Value) -> usize {
        let Some(descriptor) = self
            .registry
            .read()
            .lookup_notification(namespace, method)
            .cloned()
        else {
            debug!(namespace, method, "undeclared notification dropped");
            return 0;
        };

        let mut delivered = 0;
        let mut state = self.state.lock();
        state.subscribers.retain(|subscriber| {
            let Some(tag) = admit(&descriptor, &subscriber.target) else {
                return !subscriber.tx.is_closed();
            };
            let envelope = NotificationEnvelope {
                namespace: namespace.to_string(),
                method: method.to_string(),
                body: body.clone(),
                distribution_tag: Some(tag.to_string()),
            };
            match subscriber.tx.try_send(envelope) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        frame_id = %subscriber.target.frame_id,
                        namespace,
                        method,
                        "subscriber queue full, notification dropped"
                    );
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(frame_id = %subscriber.target.frame_id, "subscriber closed");
                    false
                }
            }
        });
        delivered
    }
}

/// Stream of notifications for one subscribed frame.
#[derive(Debug)]
pub struct Subscription {
    frame_id: String,
    inner: ReceiverStream<NotificationEnvelope>,
}

impl Subscription {
    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }
}

impl Stream for Subscription {
    type Item = NotificationEnvelope;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
