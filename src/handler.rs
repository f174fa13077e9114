//! Handler contracts for registered namespaces.
//!
//! A [`CallHandler`] serves one request/response method. A
//! [`NotificationDescriptor`] declares the delivery policy of one
//! fire-and-forget method. Both are immutable once registered.

use std::collections::BTreeSet;
use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{HandlerError, HandlerResult, TransportError};

/// Audience tag that matches every target.
pub const DISTRIBUTION_ALL: &str = "all";

/// Handle to the frame a request came from.
///
/// Handlers use it for side effects that must land back in the caller, such
/// as pushing updated state into the frame.
pub trait FrameHandle: Send + Sync + Debug {
    /// Identifier of the calling frame.
    fn frame_id(&self) -> &str;

    /// Push a value back into the calling frame.
    fn write_back(&self, body: Value) -> Result<(), TransportError>;
}

/// Everything a handler receives for one call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    body: Value,
    correlation_id: Option<String>,
    source: Option<Arc<dyn FrameHandle>>,
}

impl CallContext {
    /// Create a context around a raw request body.
    pub fn new(body: Value) -> Self {
        Self {
            body,
            correlation_id: None,
            source: None,
        }
    }

    /// Attach the calling frame.
    pub fn with_source(mut self, source: Arc<dyn FrameHandle>) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach the correlation id of the inbound request.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn source(&self) -> Option<&Arc<dyn FrameHandle>> {
        self.source.as_ref()
    }

    /// Deserialize the body into a typed request.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// A request/response handler.
///
/// # Example
///
/// ```rust
/// use framecall::{async_trait, CallContext, CallHandler, HandlerResult};
/// use serde_json::json;
///
/// struct Ping;
///
/// #[async_trait]
/// impl CallHandler for Ping {
///     async fn execute(&self, _ctx: CallContext) -> HandlerResult {
///         Ok(json!({ "pong": true }))
///     }
/// }
/// ```
#[async_trait]
pub trait CallHandler: Send + Sync {
    /// Serve one call. Rejections are returned to the caller verbatim.
    async fn execute(&self, ctx: CallContext) -> HandlerResult;
}

/// Adapter turning an async closure into a [`CallHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> CallHandler for FnHandler<F>
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn execute(&self, ctx: CallContext) -> HandlerResult {
        (self.f)(ctx).await
    }
}

/// Wrap an async closure as a shareable handler.
///
/// ```rust
/// use framecall::handler_fn;
/// use serde_json::json;
///
/// let ping = handler_fn(|_ctx| async { Ok(json!({ "pong": true })) });
/// # let _ = ping;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CallHandler>
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

/// Delivery policy for a notification method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationDescriptor {
    /// Deliver only to the currently active consumer
    pub active_only: bool,
    /// Audience tags eligible to receive the notification
    pub distribution_type: BTreeSet<String>,
}

impl NotificationDescriptor {
    /// A descriptor with no audience; it matches nothing until tags are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// A descriptor addressed to every audience.
    pub fn broadcast() -> Self {
        Self::new().with_audience(DISTRIBUTION_ALL)
    }

    /// Restrict delivery to the active consumer.
    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    /// Add an eligible audience tag.
    pub fn with_audience(mut self, tag: impl Into<String>) -> Self {
        self.distribution_type.insert(tag.into());
        self
    }

    /// The first tag of this descriptor carried by `audiences`, if any.
    ///
    /// The wildcard [`DISTRIBUTION_ALL`] matches without the target carrying it.
    pub fn matching_tag<'t, I>(&self, audiences: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'t str> + Clone,
    {
        self.distribution_type.iter().find_map(|tag| {
            if tag == DISTRIBUTION_ALL || audiences.clone().into_iter().any(|a| a == tag) {
                Some(tag.as_str())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Navigate {
        target: String,
    }

    #[test]
    fn test_context_parse() {
        let ctx = CallContext::new(json!({ "target": "#Home" }));
        let req: Navigate = ctx.parse().unwrap();
        assert_eq!(req.target, "#Home");
    }

    #[test]
    fn test_context_parse_rejects_bad_body() {
        let ctx = CallContext::new(json!({ "other": 1 }));
        let err = ctx.parse::<Navigate>().unwrap_err();
        assert!(matches!(err, HandlerError::InvalidBody(_)));
    }

    #[tokio::test]
    async fn test_handler_fn_executes_closure() {
        let handler = handler_fn(|ctx| async move { Ok(ctx.body().clone()) });
        let result = handler.execute(CallContext::new(json!([1, 2]))).await;
        assert_eq!(result, Ok(json!([1, 2])));
    }

    #[test]
    fn test_descriptor_matching_tag() {
        let descriptor = NotificationDescriptor::new()
            .with_audience("URL")
            .with_audience("userInteraction");

        assert_eq!(descriptor.matching_tag(["URL"]), Some("URL"));
        assert_eq!(descriptor.matching_tag(["other"]), None);
        assert_eq!(NotificationDescriptor::new().matching_tag(["URL"]), None);
        assert_eq!(
            NotificationDescriptor::broadcast().matching_tag(std::iter::empty()),
            Some("all")
        );
    }
}
