//! The dispatcher: the registry's only public face after boot.
//!
//! A `Dispatcher` owns the registry behind a lock, routes inbound calls to
//! exactly one handler, gates notifications, and accepts additive plugin
//! registrations. Cloning it is cheap and every clone shares the same state.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Config, RpcConfig};
use crate::contract::{validate_namespaces, validate_registrations};
use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::error::{DispatchError, DispatchResult, FrameCallResult, RegistryResult};
use crate::handler::{CallContext, FrameHandle};
use crate::notification::{should_deliver, NotificationHub, TargetDescriptor};
use crate::registry::{NamespaceRegistration, Registry};

/// Future returned by [`Dispatcher::dispatch`].
pub type DispatchFuture = Pin<Box<dyn Future<Output = DispatchResult<Value>> + Send + 'static>>;

/// Routes calls and notifications against a validated registry.
///
/// # Example
///
/// ```rust
/// use framecall::{handler_fn, CallContext, Dispatcher, NamespaceRegistration, RegistryBuilder, RpcConfig};
/// use serde_json::json;
///
/// # async fn example() {
/// let registry = RegistryBuilder::new()
///     .with(NamespaceRegistration::new("root.demo")
///         .call("ping", handler_fn(|_ctx| async { Ok(json!({ "pong": true })) })))
///     .build()
///     .unwrap();
///
/// let dispatcher = Dispatcher::boot(registry, RpcConfig::default());
/// let result = dispatcher.dispatch("root.demo", "ping", CallContext::default()).await;
/// assert_eq!(result.unwrap(), json!({ "pong": true }));
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<RwLock<Registry>>,
    hub: Arc<NotificationHub>,
    config: Arc<RpcConfig>,
}

impl Dispatcher {
    /// Validate `config` and the seed registry, then expose the dispatcher.
    pub fn try_boot(registry: Registry, config: RpcConfig) -> FrameCallResult<Self> {
        config.validate()?;
        validate_namespaces(&registry, &config.root_prefix)?;

        info!(
            config = config.name(),
            namespaces = registry.len(),
            prefix = %config.root_prefix,
            "dispatcher booted"
        );

        let registry = Arc::new(RwLock::new(registry));
        let hub = Arc::new(NotificationHub::new(
            Arc::clone(&registry),
            config.notification_buffer,
        ));
        Ok(Self {
            registry,
            hub,
            config: Arc::new(config),
        })
    }

    /// Boot, aborting on any contract or configuration violation.
    ///
    /// # Panics
    ///
    /// Panics if a namespace does not carry the root prefix or the
    /// configuration is invalid. A half-wired capability must not start.
    pub fn boot(registry: Registry, config: RpcConfig) -> Self {
        match Self::try_boot(registry, config) {
            Ok(dispatcher) => dispatcher,
            Err(err) => panic!("dispatcher boot aborted: {err}"),
        }
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Merge plugin registrations into the live registry.
    ///
    /// The whole batch is rejected, and the registry left untouched, if any
    /// namespace breaks the prefix contract or any name is empty.
    pub fn register<I>(&self, registrations: I) -> RegistryResult<()>
    where
        I: IntoIterator<Item = NamespaceRegistration>,
    {
        let registrations: Vec<NamespaceRegistration> = registrations.into_iter().collect();
        validate_registrations(&registrations, &self.config.root_prefix)?;
        self.registry.write().register(registrations)
    }

    /// Route one call to its handler.
    ///
    /// The handler's own result or rejection is returned unchanged. An unknown
    /// target yields [`DispatchError::UnknownMethod`] from the returned future;
    /// this never panics or fails synchronously.
    pub fn dispatch(&self, namespace: &str, method: &str, ctx: CallContext) -> DispatchFuture {
        let handler = self.registry.read().lookup_call_handler(namespace, method);
        let Some(handler) = handler else {
            warn!(namespace, method, "no handler registered");
            return Box::pin(std::future::ready(Err(DispatchError::UnknownMethod {
                namespace: namespace.to_string(),
                method: method.to_string(),
            })));
        };

        debug!(namespace, method, "dispatching call");
        Box::pin(async move { handler.execute(ctx).await.map_err(DispatchError::from) })
    }

    /// Serve a request envelope and build the response for the caller.
    pub async fn handle_request(
        &self,
        envelope: RequestEnvelope,
        source: Option<Arc<dyn FrameHandle>>,
    ) -> ResponseEnvelope {
        let RequestEnvelope {
            target_namespace,
            method,
            body,
            correlation_id,
        } = envelope;

        let mut ctx = CallContext::new(body).with_correlation_id(correlation_id.clone());
        if let Some(source) = source {
            ctx = ctx.with_source(source);
        }

        let outcome = self.dispatch(&target_namespace, &method, ctx).await;
        if let Err(err) = &outcome {
            debug!(
                namespace = %target_namespace,
                method = %method,
                correlation_id = %correlation_id,
                error = %err,
                "call rejected"
            );
        }
        ResponseEnvelope::from_outcome(correlation_id, outcome)
    }

    /// Gate for a transport about to send `namespace.method` to `target`.
    pub fn should_deliver(&self, namespace: &str, method: &str, target: &TargetDescriptor) -> bool {
        should_deliver(&self.registry.read(), namespace, method, target)
    }

    /// Fan-out hub sharing this dispatcher's registry.
    pub fn notifications(&self) -> &NotificationHub {
        &self.hub
    }

    /// Run `f` against the current registry.
    pub fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&*self.registry.read())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("namespaces", &self.registry.read().namespaces())
            .field("config", &self.config)
            .finish()
    }
}
