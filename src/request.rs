//! Outbound request body for the streaming endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// JSON body sent to the backend's stream endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRequest {
    /// The prompt/message to send.
    pub prompt: String,
    /// Client-generated session handle for this exchange.
    pub session_id: String,
    /// Thread to continue; `None` starts a new one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Free-form request metadata forwarded to the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl StreamRequest {
    /// A request starting a new thread.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_id: Uuid::new_v4().to_string(),
            thread_id: None,
            metadata: None,
        }
    }

    /// A request continuing an existing thread.
    pub fn with_thread(prompt: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::new(prompt)
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Per-call options for [`crate::client::SluiceClient::send_message`].
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Continue this thread instead of starting a new one.
    pub thread_id: Option<String>,
    /// Override the HTTP method (default POST).
    pub method: Option<String>,
    /// Extra request headers.
    pub headers: std::collections::HashMap<String, String>,
    /// Bearer token for this call, overriding the client-level token.
    pub auth_token: Option<String>,
    /// Free-form request metadata forwarded to the backend.
    pub metadata: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_generates_session_id() {
        let request = StreamRequest::new("hello");
        assert_eq!(request.prompt, "hello");
        assert!(!request.session_id.is_empty());
        assert!(request.thread_id.is_none());
    }

    #[test]
    fn test_with_thread() {
        let request = StreamRequest::with_thread("hello", "t1");
        assert_eq!(request.thread_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let request = StreamRequest::new("hi");
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("thread_id").is_none());
        assert!(value.get("metadata").is_none());

        let request = StreamRequest::with_thread("hi", "t1").with_metadata(json!({"k": 1}));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["thread_id"], "t1");
        assert_eq!(value["metadata"]["k"], 1);
    }
}
