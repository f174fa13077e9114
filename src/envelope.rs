//! Logical message shapes exchanged with embedded frames.
//!
//! These are transport-agnostic: a transport may serialize them however it
//! likes. The serde derives give the camelCase JSON form most frame bridges use.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DispatchError;

/// Generate a fresh correlation id.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// An inbound or outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub target_namespace: String,
    pub method: String,
    #[serde(default)]
    pub body: Value,
    pub correlation_id: String,
}

impl RequestEnvelope {
    /// Build a request with a freshly generated correlation id.
    pub fn new(namespace: impl Into<String>, method: impl Into<String>, body: Value) -> Self {
        Self {
            target_namespace: namespace.into(),
            method: method.into(),
            body,
            correlation_id: new_correlation_id(),
        }
    }

    /// Replace the correlation id.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = id.into();
        self
    }
}

/// Error payload carried by a rejected response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
}

/// `{result?, error?}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

/// The answer to a [`RequestEnvelope`], matched by correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub correlation_id: String,
    #[serde(default)]
    pub body: ResponseBody,
}

impl ResponseEnvelope {
    /// A successful response.
    pub fn success(correlation_id: impl Into<String>, result: Value) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            body: ResponseBody {
                result: Some(result),
                error: None,
            },
        }
    }

    /// A rejected response.
    pub fn failure(correlation_id: impl Into<String>, kind: &str, message: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            body: ResponseBody {
                result: None,
                error: Some(ErrorPayload {
                    kind: kind.to_string(),
                    message: message.into(),
                }),
            },
        }
    }

    /// Convert a dispatch outcome into a response for the calling frame.
    pub fn from_outcome(correlation_id: impl Into<String>, outcome: Result<Value, DispatchError>) -> Self {
        match outcome {
            Ok(result) => Self::success(correlation_id, result),
            Err(err) => Self::failure(correlation_id, err.kind(), err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.body.error.is_some()
    }

    /// The result value, if this is a well-formed success.
    pub fn result(&self) -> Option<&Value> {
        if self.is_error() {
            return None;
        }
        self.body.result.as_ref()
    }
}

/// A fire-and-forget message pushed to a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEnvelope {
    pub namespace: String,
    pub method: String,
    #[serde(default)]
    pub body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request =
            RequestEnvelope::new("root.demo", "ping", json!({})).with_correlation_id("c-1");

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(
            wire,
            json!({
                "targetNamespace": "root.demo",
                "method": "ping",
                "body": {},
                "correlationId": "c-1"
            })
        );
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = RequestEnvelope::new("root.demo", "ping", Value::Null);
        let b = RequestEnvelope::new("root.demo", "ping", Value::Null);
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn test_response_from_unknown_method() {
        let response = ResponseEnvelope::from_outcome(
            "c-2",
            Err(DispatchError::UnknownMethod {
                namespace: "root.demo".into(),
                method: "missing".into(),
            }),
        );

        assert!(response.is_error());
        assert!(response.result().is_none());
        let error = response.body.error.unwrap();
        assert_eq!(error.kind, "unknownMethod");
        assert!(error.message.contains("root.demo.missing"));
    }

    #[test]
    fn test_response_parses_without_body() {
        let response: ResponseEnvelope =
            serde_json::from_value(json!({ "correlationId": "c-3" })).unwrap();
        assert_eq!(response.correlation_id, "c-3");
        assert!(response.result().is_none());
        assert!(!response.is_error());
    }

    #[test]
    fn test_notification_omits_missing_tag() {
        let note = NotificationEnvelope {
            namespace: "root.demo".into(),
            method: "changed".into(),
            body: json!(1),
            distribution_tag: None,
        };
        let wire = serde_json::to_value(&note).unwrap();
        assert!(wire.get("distributionTag").is_none());
    }
}
