//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use framecall::prelude::*;
//! ```

// Configuration
pub use crate::config::{Config, RpcConfig};

// Handlers
pub use crate::handler::{
    handler_fn, CallContext, CallHandler, FrameHandle, NotificationDescriptor,
};

// Registry and dispatch
pub use crate::dispatcher::Dispatcher;
pub use crate::registry::{NamespaceRegistration, Registry, RegistryBuilder};

// Notifications
pub use crate::notification::{NotificationHub, TargetDescriptor};

// Correlation and transport
pub use crate::correlation::{CorrelationPolicy, Correlator, Resolution};
pub use crate::envelope::{NotificationEnvelope, RequestEnvelope, ResponseEnvelope};
pub use crate::transport::{FrameTransport, PendingResponses};

// Errors
pub use crate::error::{
    DispatchError, FrameCallError, FrameCallResult, HandlerError, HandlerResult, RegistryError,
    TransportError,
};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
