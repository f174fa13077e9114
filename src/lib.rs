//! # Framecall
//!
//! **Framecall** is a cross-frame RPC dispatch registry. It routes structured
//! calls arriving from embedded execution contexts (iframes, webviews, child
//! windows) to registered handlers, gates fire-and-forget notifications by
//! declared delivery policy, and issues outbound calls that always resolve in
//! bounded time.
//!
//! ## Overview
//!
//! - **Registry**: namespace → handlers, extended additively by plugins
//! - **Contract**: every namespace carries the root prefix, checked at boot
//! - **Dispatcher**: one inbound call, exactly one handler
//! - **Notifications**: deny-by-default delivery gate and fan-out hub
//! - **Correlation**: remote answer or safe default, whichever comes first
//!
//! ## Flow
//!
//! ```text
//! inbound RequestEnvelope ──> Dispatcher ──> Registry ──> CallHandler ──> ResponseEnvelope
//! outbound notification   ──> should_deliver ──> transport
//! outbound call           ──> correlated_request ──(response | timeout)──> value
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use framecall::prelude::*;
//! use serde_json::json;
//!
//! let registry = RegistryBuilder::new()
//!     .with(NamespaceRegistration::new("root.demo")
//!         .call("ping", handler_fn(|_ctx| async { Ok(json!({ "pong": true })) })))
//!     .build()?;
//!
//! // Aborts if any namespace breaks the prefix contract.
//! let dispatcher = Dispatcher::boot(registry, RpcConfig::default());
//!
//! let response = dispatcher.handle_request(envelope, Some(frame)).await;
//! ```

mod config;
mod contract;
mod correlation;
mod dispatcher;
mod envelope;
mod error;
mod handler;
mod notification;
mod registry;
mod transport;

pub mod prelude;

pub use config::{
    Config, RpcConfig, DEFAULT_CORRELATION_TIMEOUT, DEFAULT_NOTIFICATION_BUFFER,
    DEFAULT_ROOT_PREFIX,
};
pub use contract::{check_namespace, validate_namespaces, validate_registrations};
pub use correlation::{
    confirm, correlated_request, CorrelationPolicy, CorrelationState, Correlator,
    PendingCorrelation, Resolution,
};
pub use dispatcher::{DispatchFuture, Dispatcher};
pub use envelope::{
    new_correlation_id, ErrorPayload, NotificationEnvelope, RequestEnvelope, ResponseBody,
    ResponseEnvelope,
};
pub use error::{
    ConfigError, ContractViolation, DispatchError, DispatchResult, FrameCallError,
    FrameCallResult, HandlerError, HandlerResult, RegistryError, RegistryResult, TransportError,
};
pub use handler::{
    handler_fn, CallContext, CallHandler, FnHandler, FrameHandle, NotificationDescriptor,
    DISTRIBUTION_ALL,
};
pub use notification::{should_deliver, NotificationHub, Subscription, TargetDescriptor};
pub use registry::{NamespaceEntry, NamespaceRegistration, Registry, RegistryBuilder};
pub use transport::{FrameTransport, PendingResponses};

// Re-export async-trait for convenience
pub use async_trait::async_trait;
