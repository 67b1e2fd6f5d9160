//! Legacy-dialect payload deserialization structs.
//!
//! Internal structs used to pull fields out of legacy JSON payloads.
//! The legacy vocabulary grew ad hoc across backend versions, so most
//! fields accept several spellings via serde aliases.

use serde::Deserialize;
use serde_json::Value;

/// Legacy error payload: `{code?, message?|error?, details?}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LegacyError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "error", alias = "detail")]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Legacy content-bearing payloads (`custom_stream`, `custom_event`,
/// `message_stream`, `token`). The chunk can live in half a dozen places.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LegacyContent {
    #[serde(default)]
    pub custom_llm_chunk: Option<String>,
    /// Either a plain string or a nested object carrying its own
    /// `custom_llm_chunk`.
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub delta: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl LegacyContent {
    /// The custom-stream preference chain: `custom_llm_chunk`, then a nested
    /// `content.custom_llm_chunk`, then a plain-string `content`, then
    /// `delta`.
    pub fn custom_stream_chunk(&self) -> String {
        if let Some(chunk) = &self.custom_llm_chunk {
            return chunk.clone();
        }
        if let Some(content) = &self.content {
            if let Some(nested) = content.get("custom_llm_chunk").and_then(Value::as_str) {
                return nested.to_string();
            }
            if let Some(text) = content.as_str() {
                return text.to_string();
            }
        }
        self.delta.clone().unwrap_or_default()
    }

    /// Token-event preference chain.
    pub fn token_chunk(&self) -> String {
        self.token
            .clone()
            .or_else(|| self.content.as_ref().and_then(Value::as_str).map(String::from))
            .or_else(|| self.data.clone())
            .or_else(|| self.text.clone())
            .unwrap_or_default()
    }

    /// Chunk used by `custom_event`/`message_stream` when one is present.
    pub fn event_chunk(&self) -> Option<String> {
        self.chunk
            .clone()
            .or_else(|| self.delta.clone())
            .filter(|s| !s.is_empty())
    }
}

/// Legacy task progress, flat or nested under `progress`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LegacyTaskProgress {
    #[serde(default, alias = "toolName", alias = "tool")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "currentStep", alias = "step")]
    pub current_step: Option<u32>,
    #[serde(default, alias = "totalSteps", alias = "total")]
    pub total_steps: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Legacy tool lifecycle payloads (`tool_start`, `tool_executing`,
/// `tool_completed`).
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LegacyTool {
    #[serde(default, alias = "toolCallId", alias = "id")]
    pub tool_call_id: Option<String>,
    #[serde(default, alias = "toolName", alias = "name", alias = "tool")]
    pub tool_name: Option<String>,
    #[serde(default, alias = "input", alias = "arguments")]
    pub args: Option<Value>,
    #[serde(default, alias = "output")]
    pub result: Option<Value>,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
}

/// Legacy node update payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LegacyNodeUpdate {
    #[serde(default, alias = "node", alias = "nodeId")]
    pub node_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "result")]
    pub output: Option<Value>,
}
