//! Event normalization: wire dialects into the canonical model.
//!
//! Two input dialects are accepted. The **structured** dialect is already
//! shaped close to [`CanonicalEvent`] and deserializes directly. The
//! **legacy** dialect is the older ad-hoc vocabulary still produced by
//! earlier backend versions; every legacy type maps onto a canonical variant
//! through the table in `from_legacy`.
//!
//! Dialect detection is a heuristic and is pinned as-is: an input is legacy
//! if its `type` is in the legacy vocabulary, or it lacks a `thread_id` but
//! carries `sessionId`/`conversationId`, or it carries a legacy-only marker
//! (`custom_llm_chunk`, `resumed`). A structured event that merely omits
//! optional fields can be misclassified; callers rely on that exact boundary.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::NormalizerConfig;
use crate::error::NormalizeError;
use crate::framer::FramedRecord;

use super::canonical::{
    CanonicalEvent, ErrorInfo, EventPayload, Interrupt, NodeStatus, NodeUpdateInfo, TaskProgress,
    TaskStatus,
};
use super::payloads::{LegacyContent, LegacyError, LegacyNodeUpdate, LegacyTaskProgress, LegacyTool};

/// The historical event vocabulary accepted for compatibility.
static LEGACY_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "start",
        "custom_event",
        "custom_stream",
        "message_stream",
        "complete",
        "end",
        "error",
        "task_progress",
        "tool_start",
        "tool_executing",
        "tool_completed",
        "token",
        "llm_completed",
        "node_update",
        "state_update",
        "update_event",
        "interrupt",
        "paused",
        "memory_update",
        "billing",
        "credits",
        "resume_start",
        "resume_end",
        "graph_update",
        "hil_interrupt_detected",
        "artifact_update",
    ]
    .into_iter()
    .collect()
});

static CANONICAL_TYPES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| EventPayload::type_names().iter().copied().collect());

/// Which wire dialect an input was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Structured,
    Legacy,
}

/// Converts framed records / raw JSON payloads into canonical events.
#[derive(Debug, Clone, Default)]
pub struct EventNormalizer {
    config: NormalizerConfig,
}

impl EventNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Classify an input payload. Pinned heuristic, see module docs.
    pub fn detect_dialect(value: &Value) -> Dialect {
        let type_name = value.get("type").and_then(Value::as_str);
        if let Some(t) = type_name {
            if LEGACY_TYPES.contains(t) {
                return Dialect::Legacy;
            }
        }
        if value.get("thread_id").is_none()
            && (value.get("sessionId").is_some() || value.get("conversationId").is_some())
        {
            return Dialect::Legacy;
        }
        if value.get("custom_llm_chunk").is_some() || value.get("resumed").is_some() {
            return Dialect::Legacy;
        }
        Dialect::Structured
    }

    /// Normalize one framed record into a canonical event.
    pub fn normalize_record(&self, record: &FramedRecord) -> Result<CanonicalEvent, NormalizeError> {
        // The framer already rewrote the [DONE] sentinel into a synthetic
        // stream_done record; honor both spellings here.
        if record.event.as_deref() == Some("stream_done") || record.data == "[DONE]" {
            let event = CanonicalEvent::new(String::new(), EventPayload::StreamDone);
            return self.post_process(event, Some(Value::String(record.data.clone())));
        }

        let mut value: Value =
            serde_json::from_str(&record.data).map_err(|e| NormalizeError::InvalidJson {
                detail: e.to_string(),
                raw: record.data.clone(),
            })?;

        // An `event:` field on the record stands in for a missing JSON type
        // tag.
        if value.is_object() && value.get("type").is_none() {
            if let Some(event_name) = &record.event {
                value["type"] = Value::String(event_name.clone());
            }
        }

        self.normalize_value(value)
    }

    /// Normalize a raw JSON payload into a canonical event.
    pub fn normalize_value(&self, mut value: Value) -> Result<CanonicalEvent, NormalizeError> {
        if !value.is_object() {
            return Err(NormalizeError::UnsupportedShape {
                raw: value.to_string(),
            });
        }

        // Caller-supplied type remappings apply before dialect dispatch.
        let mapped = value
            .get("type")
            .and_then(Value::as_str)
            .and_then(|t| self.config.custom_event_type_mapping.get(t))
            .cloned();
        if let Some(mapped) = mapped {
            value["type"] = Value::String(mapped);
        }

        let event = match Self::detect_dialect(&value) {
            Dialect::Structured => self.from_structured(&value)?,
            Dialect::Legacy => {
                if !self.config.enable_legacy_conversion {
                    let event_type = value
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string();
                    return Err(NormalizeError::LegacyDisabled { event_type });
                }
                self.from_legacy(&value)?
            }
        };

        self.post_process(event, Some(value))
    }

    /// Structural validation: type-specific required fields are present.
    pub fn validate(&self, event: &CanonicalEvent) -> bool {
        self.check_structure(event).is_ok()
    }

    fn from_structured(&self, value: &Value) -> Result<CanonicalEvent, NormalizeError> {
        let type_name = value.get("type").and_then(Value::as_str).ok_or_else(|| {
            NormalizeError::UnsupportedShape {
                raw: value.to_string(),
            }
        })?;

        if !CANONICAL_TYPES.contains(type_name) {
            // Unknown structured type: carry the payload as a custom event
            // rather than dropping data on the floor.
            let mut event = self.base_event(value);
            event.payload = EventPayload::Custom {
                name: Some(type_name.to_string()),
                value: value.clone(),
            };
            event
                .metadata
                .insert("custom_data".to_string(), value.clone());
            return Ok(event);
        }

        // Epoch-millisecond timestamps are accepted on the wire; rewrite to
        // RFC 3339 before handing the value to serde.
        let mut value = value.clone();
        if let Some(ms) = value.get("timestamp").and_then(Value::as_i64) {
            if let Some(ts) = Utc.timestamp_millis_opt(ms).single() {
                value["timestamp"] = Value::String(ts.to_rfc3339());
            }
        }

        serde_json::from_value(value.clone()).map_err(|e| {
            debug!(event_type = type_name, error = %e, "structured event rejected");
            NormalizeError::UnsupportedShape {
                raw: value.to_string(),
            }
        })
    }

    /// The legacy→canonical mapping table.
    fn from_legacy(&self, value: &Value) -> Result<CanonicalEvent, NormalizeError> {
        let type_name = value.get("type").and_then(Value::as_str).unwrap_or("");
        let mut event = self.base_event(value);

        event.payload = match type_name {
            "start" => EventPayload::RunStarted,
            "custom_event" | "message_stream" => {
                let content = parse_content(value);
                match content.event_chunk() {
                    Some(delta) => EventPayload::TextMessageContent { delta },
                    None => EventPayload::TextMessageStart {
                        role: content.role.clone(),
                    },
                }
            }
            "custom_stream" => EventPayload::TextMessageContent {
                delta: parse_content(value).custom_stream_chunk(),
            },
            "complete" | "end" => EventPayload::RunFinished {
                result: value.get("result").cloned(),
            },
            "error" => {
                let err: LegacyError = from_value_lenient(value);
                EventPayload::RunError {
                    error: ErrorInfo {
                        code: err.code.unwrap_or_else(|| "stream_error".to_string()),
                        message: err.message.unwrap_or_else(|| "Unknown error".to_string()),
                        details: err.details,
                    },
                }
            }
            "task_progress" => {
                let source = value.get("progress").unwrap_or(value);
                let raw: LegacyTaskProgress = from_value_lenient(source);
                EventPayload::TaskProgressUpdate {
                    progress: TaskProgress {
                        tool_name: raw.tool_name.unwrap_or_default(),
                        description: raw.description.unwrap_or_default(),
                        current_step: raw.current_step,
                        total_steps: raw.total_steps,
                        status: TaskStatus::from_wire(raw.status.as_deref().unwrap_or("")),
                    },
                }
            }
            "tool_start" => {
                let tool: LegacyTool = from_value_lenient(value);
                EventPayload::ToolCallStart {
                    tool_call_id: tool.tool_call_id.unwrap_or_default(),
                    tool_name: tool.tool_name.unwrap_or_default(),
                    args: tool.args,
                }
            }
            "tool_executing" => {
                let tool: LegacyTool = from_value_lenient(value);
                EventPayload::ToolExecuting {
                    tool_call_id: tool.tool_call_id.unwrap_or_default(),
                    display_name: tool.display_name,
                }
            }
            "tool_completed" => {
                let tool: LegacyTool = from_value_lenient(value);
                EventPayload::ToolCallEnd {
                    tool_call_id: tool.tool_call_id.unwrap_or_default(),
                    result: tool.result,
                }
            }
            "token" => EventPayload::TextMessageContent {
                delta: parse_content(value).token_chunk(),
            },
            "llm_completed" => EventPayload::TextMessageEnd,
            "node_update" => {
                let node: LegacyNodeUpdate = from_value_lenient(value);
                EventPayload::NodeUpdate {
                    update: NodeUpdateInfo {
                        node_id: node.node_id.unwrap_or_default(),
                        status: NodeStatus::from_wire(node.status.as_deref().unwrap_or("")),
                        output: node.output,
                    },
                }
            }
            "state_update" | "update_event" => EventPayload::StateUpdate {
                state: value
                    .get("state")
                    .or_else(|| value.get("data"))
                    .cloned()
                    .unwrap_or_else(|| value.clone()),
            },
            "interrupt" | "paused" => EventPayload::Paused {
                reason: value
                    .get("reason")
                    .or_else(|| value.get("message"))
                    .and_then(Value::as_str)
                    .map(String::from),
            },
            "memory_update" => EventPayload::MemoryUpdate {
                memory: value
                    .get("memory")
                    .or_else(|| value.get("data"))
                    .cloned()
                    .unwrap_or_else(|| value.clone()),
            },
            "billing" | "credits" => EventPayload::Billing {
                usage: value
                    .get("usage")
                    .cloned()
                    .unwrap_or_else(|| value.clone()),
            },
            "resume_start" => EventPayload::ResumeStart,
            "resume_end" => EventPayload::ResumeEnd,
            "graph_update" => EventPayload::GraphUpdate {
                graph: value
                    .get("graph")
                    .or_else(|| value.get("data"))
                    .cloned()
                    .unwrap_or_else(|| value.clone()),
            },
            "hil_interrupt_detected" => {
                let source = value.get("interrupt").unwrap_or(value);
                let interrupt: Interrupt =
                    serde_json::from_value(source.clone()).map_err(|_| {
                        NormalizeError::MissingField {
                            event_type: "hil_interrupt_detected".to_string(),
                            field: "interrupt.id".to_string(),
                        }
                    })?;
                EventPayload::HilInterruptDetected { interrupt }
            }
            "artifact_update" => EventPayload::ArtifactUpdated {
                artifact: value
                    .get("artifact")
                    .cloned()
                    .unwrap_or_else(|| value.clone()),
            },
            other => {
                // Unrecognized legacy input: preserve it verbatim.
                event
                    .metadata
                    .insert("custom_data".to_string(), value.clone());
                EventPayload::Custom {
                    name: if other.is_empty() {
                        None
                    } else {
                        Some(other.to_string())
                    },
                    value: value.clone(),
                }
            }
        };

        Ok(event)
    }

    /// Header shared by all legacy mappings: thread/run/message ids under any
    /// spelling plus a best-effort timestamp.
    fn base_event(&self, value: &Value) -> CanonicalEvent {
        let thread_id = ["thread_id", "threadId", "sessionId", "conversationId"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        let mut event = CanonicalEvent::new(thread_id, EventPayload::StreamDone);
        event.run_id = string_field(value, &["run_id", "runId"]);
        event.message_id = string_field(value, &["message_id", "messageId"]);
        if let Some(ts) = value.get("timestamp").and_then(parse_timestamp) {
            event.timestamp = ts;
        }
        event
    }

    /// Post-processing gates: auto-fill, structural validation, raw
    /// preservation. Applied to both dialects.
    fn post_process(
        &self,
        mut event: CanonicalEvent,
        raw: Option<Value>,
    ) -> Result<CanonicalEvent, NormalizeError> {
        if self.config.auto_fill_missing_fields {
            if event.thread_id.is_empty() {
                event.thread_id = Uuid::new_v4().to_string();
            }
            if event.requires_run_id() && event.run_id.is_none() {
                event.run_id = Some(Uuid::new_v4().to_string());
            }
            if event.requires_message_id() && event.message_id.is_none() {
                event.message_id = Some(Uuid::new_v4().to_string());
            }
        }

        if self.config.validate_event_structure {
            self.check_structure(&event)?;
        }

        if self.config.preserve_raw_data {
            if let Some(raw) = raw {
                event.metadata.insert("_raw".to_string(), raw);
            }
        }

        Ok(event)
    }

    fn check_structure(&self, event: &CanonicalEvent) -> Result<(), NormalizeError> {
        let missing = |field: &str| NormalizeError::MissingField {
            event_type: event.type_name().to_string(),
            field: field.to_string(),
        };

        if event.thread_id.is_empty() {
            return Err(missing("thread_id"));
        }
        if event.requires_run_id() && event.run_id.as_deref().unwrap_or("").is_empty() {
            return Err(missing("run_id"));
        }
        if event.requires_message_id() && event.message_id.as_deref().unwrap_or("").is_empty() {
            return Err(missing("message_id"));
        }
        if let EventPayload::HilInterruptDetected { interrupt } = &event.payload {
            if interrupt.id.is_empty() {
                return Err(missing("interrupt.id"));
            }
        }
        Ok(())
    }
}

fn parse_content(value: &Value) -> LegacyContent {
    from_value_lenient(value)
}

/// Deserialize with defaults on failure; legacy payloads are best-effort.
fn from_value_lenient<T: serde::de::DeserializeOwned + Default>(value: &Value) -> T {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(String::from)
}

/// Accept ISO-8601 strings or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(s) = value.as_str() {
        return DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }
    if let Some(ms) = value.as_i64() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    None
}
