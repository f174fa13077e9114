//! Error types for Framecall.
//!
//! Only [`ContractViolation`] is fatal, and only at boot. Every other error is
//! scoped to a single in-flight call and travels through a `Result`.

use thiserror::Error;

/// Root error type for Framecall operations.
#[derive(Error, Debug)]
pub enum FrameCallError {
    /// Namespace contract errors
    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    /// Dispatch errors
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A namespace key that does not start with the mandated root prefix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("namespace '{namespace}' does not start with required prefix '{prefix}'")]
pub struct ContractViolation {
    /// The offending namespace key
    pub namespace: String,
    /// The prefix every namespace must carry
    pub prefix: String,
}

/// Errors surfaced by [`Dispatcher::dispatch`](crate::Dispatcher::dispatch).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// No call handler is registered for the target
    #[error("Unknown method: {namespace}.{method}")]
    UnknownMethod { namespace: String, method: String },

    /// The invoked handler rejected; carried verbatim
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    /// Stable kind tag used in response envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownMethod { .. } => "unknownMethod",
            Self::Handler(_) => "handlerRejection",
        }
    }
}

/// Errors produced by call handlers themselves.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    /// Handler refused the call
    #[error("Handler rejected the call: {0}")]
    Rejected(String),

    /// Request body could not be interpreted
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// The capability the handler delegates to failed
    #[error("Capability failed: {0}")]
    Capability(String),

    /// The call was cancelled before it completed
    #[error("Call was cancelled")]
    Cancelled,
}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        HandlerError::Rejected(msg)
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        HandlerError::Rejected(msg.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::InvalidBody(err.to_string())
    }
}

/// Errors that can occur when merging registrations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Empty namespace or method name
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Registration would break the namespace contract
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

/// Errors reported by a frame transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The remote side or the channel has gone away
    #[error("Transport closed")]
    Closed,

    /// Sending failed
    #[error("Send failed: {0}")]
    Send(String),

    /// A request with this correlation id is already in flight
    #[error("Duplicate correlation id: {0}")]
    Duplicate(String),
}

/// Errors found while validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("root prefix must not be empty")]
    EmptyPrefix,

    #[error("correlation timeout must be greater than zero")]
    ZeroTimeout,

    #[error("notification buffer must be greater than zero")]
    ZeroBuffer,
}

/// Result type alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type returned by call handlers.
pub type HandlerResult = Result<serde_json::Value, HandlerError>;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for general Framecall operations.
pub type FrameCallResult<T> = Result<T, FrameCallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_method_display() {
        let err = DispatchError::UnknownMethod {
            namespace: "root.demo".to_string(),
            method: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown method: root.demo.missing");
        assert_eq!(err.kind(), "unknownMethod");
    }

    #[test]
    fn test_handler_error_is_transparent() {
        let err = DispatchError::from(HandlerError::Capability("offline".into()));
        assert_eq!(err.to_string(), "Capability failed: offline");
        assert_eq!(err.kind(), "handlerRejection");
    }

    #[test]
    fn test_handler_error_conversions() {
        assert_eq!(
            HandlerError::from("nope"),
            HandlerError::Rejected("nope".to_string())
        );

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(
            HandlerError::from(parse),
            HandlerError::InvalidBody(_)
        ));
    }

    #[test]
    fn test_contract_violation_names_key() {
        let err = ContractViolation {
            namespace: "other.nav".to_string(),
            prefix: "root.".to_string(),
        };
        let msg = FrameCallError::from(err).to_string();
        assert!(msg.contains("other.nav"));
        assert!(msg.contains("root."));
    }
}
