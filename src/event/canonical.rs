//! Canonical event model.
//!
//! The closed, tagged-union event representation all downstream logic
//! consumes. Both wire dialects (structured and legacy) normalize into
//! [`CanonicalEvent`]: a required common header plus a variant-specific
//! payload. The untyped original payload only ever travels in the metadata
//! side-channel, never as the primary type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized error shape carried by `run_error` events and the `on_error`
/// callback.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Human-in-the-loop interrupt descriptor.
///
/// The backend pauses execution and waits for user input; `id` is the handle
/// the caller answers with and must be non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interrupt {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Task progress status, mapped from the backend's loose status strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Map the backend's status vocabulary onto the closed set.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "running" | "active" => TaskStatus::Running,
            "completed" | "done" | "finished" => TaskStatus::Completed,
            "failed" | "error" => TaskStatus::Failed,
            _ => TaskStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

/// Node execution status for graph-style backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Started,
    Completed,
    Failed,
}

impl NodeStatus {
    /// Map the backend's status vocabulary onto the closed set.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "completed" | "done" | "finished" | "success" => NodeStatus::Completed,
            "failed" | "error" => NodeStatus::Failed,
            _ => NodeStatus::Started,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Started => "started",
            NodeStatus::Completed => "completed",
            NodeStatus::Failed => "failed",
        }
    }
}

/// Tool/task progress descriptor delivered to `on_task_progress_update`.
///
/// Field names keep the wire casing the callback surface documents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u32>,
    #[serde(default)]
    pub status: TaskStatus,
}

/// Node state change descriptor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeUpdateInfo {
    #[serde(default, alias = "node")]
    pub node_id: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

/// Variant-specific payload of a canonical event.
///
/// Closed union: every wire input either maps onto one of these variants or
/// is rejected at the normalization boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    RunStarted,
    RunFinished {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
    RunError {
        #[serde(default)]
        error: ErrorInfo,
    },
    TextMessageStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
    },
    TextMessageContent {
        #[serde(default)]
        delta: String,
    },
    TextMessageEnd,
    ToolCallStart {
        #[serde(default)]
        tool_call_id: String,
        #[serde(default)]
        tool_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<Value>,
    },
    ToolCallEnd {
        #[serde(default)]
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
    ToolExecuting {
        #[serde(default)]
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
    },
    HilInterruptDetected {
        interrupt: Interrupt,
    },
    TaskProgressUpdate {
        progress: TaskProgress,
    },
    ArtifactCreated {
        #[serde(default)]
        artifact: Value,
    },
    ArtifactUpdated {
        #[serde(default)]
        artifact: Value,
    },
    NodeUpdate {
        #[serde(flatten)]
        update: NodeUpdateInfo,
    },
    GraphUpdate {
        #[serde(default)]
        graph: Value,
    },
    StateUpdate {
        #[serde(default)]
        state: Value,
    },
    MemoryUpdate {
        #[serde(default)]
        memory: Value,
    },
    Billing {
        #[serde(default)]
        usage: Value,
    },
    Paused {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    ResumeStart,
    ResumeEnd,
    StreamDone,
    #[serde(rename = "custom_event")]
    Custom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        value: Value,
    },
}

impl EventPayload {
    /// Returns the wire type name of this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::RunStarted => "run_started",
            EventPayload::RunFinished { .. } => "run_finished",
            EventPayload::RunError { .. } => "run_error",
            EventPayload::TextMessageStart { .. } => "text_message_start",
            EventPayload::TextMessageContent { .. } => "text_message_content",
            EventPayload::TextMessageEnd => "text_message_end",
            EventPayload::ToolCallStart { .. } => "tool_call_start",
            EventPayload::ToolCallEnd { .. } => "tool_call_end",
            EventPayload::ToolExecuting { .. } => "tool_executing",
            EventPayload::HilInterruptDetected { .. } => "hil_interrupt_detected",
            EventPayload::TaskProgressUpdate { .. } => "task_progress_update",
            EventPayload::ArtifactCreated { .. } => "artifact_created",
            EventPayload::ArtifactUpdated { .. } => "artifact_updated",
            EventPayload::NodeUpdate { .. } => "node_update",
            EventPayload::GraphUpdate { .. } => "graph_update",
            EventPayload::StateUpdate { .. } => "state_update",
            EventPayload::MemoryUpdate { .. } => "memory_update",
            EventPayload::Billing { .. } => "billing",
            EventPayload::Paused { .. } => "paused",
            EventPayload::ResumeStart => "resume_start",
            EventPayload::ResumeEnd => "resume_end",
            EventPayload::StreamDone => "stream_done",
            EventPayload::Custom { .. } => "custom_event",
        }
    }

    /// All wire type names of the canonical vocabulary, used for dialect
    /// detection.
    pub fn type_names() -> &'static [&'static str] {
        &[
            "run_started",
            "run_finished",
            "run_error",
            "text_message_start",
            "text_message_content",
            "text_message_end",
            "tool_call_start",
            "tool_call_end",
            "tool_executing",
            "hil_interrupt_detected",
            "task_progress_update",
            "artifact_created",
            "artifact_updated",
            "node_update",
            "graph_update",
            "state_update",
            "memory_update",
            "billing",
            "paused",
            "resume_start",
            "resume_end",
            "stream_done",
            "custom_event",
        ]
    }
}

/// One normalized event: required common header plus variant payload.
///
/// Created once per wire record, passed read-only through the pipeline, and
/// discarded after the pipeline finishes with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Conversation thread this event belongs to. Required; synthesized by
    /// the normalizer when the wire input carries none.
    #[serde(default)]
    pub thread_id: String,
    /// Event time, auto-filled if absent.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Run handle; required for `run_*` variants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Message handle; required for `text_message_*` variants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Open side-channel: original payload (`_raw`), unmapped legacy data
    /// (`custom_data`), and anything a handler wants to record.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl CanonicalEvent {
    /// Build an event with the given thread and payload; header extras start
    /// empty and timestamp is now.
    pub fn new(thread_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            thread_id: thread_id.into(),
            timestamp: Utc::now(),
            run_id: None,
            message_id: None,
            metadata: Map::new(),
            payload,
        }
    }

    /// Returns the wire type name of this event.
    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }

    /// True for the variants that terminate an exchange.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.payload,
            EventPayload::RunFinished { .. }
                | EventPayload::RunError { .. }
                | EventPayload::StreamDone
        )
    }

    /// Variants that require `run_id` in the header.
    pub fn requires_run_id(&self) -> bool {
        matches!(
            self.payload,
            EventPayload::RunStarted
                | EventPayload::RunFinished { .. }
                | EventPayload::RunError { .. }
        )
    }

    /// Variants that require `message_id` in the header.
    pub fn requires_message_id(&self) -> bool {
        matches!(
            self.payload,
            EventPayload::TextMessageStart { .. }
                | EventPayload::TextMessageContent { .. }
                | EventPayload::TextMessageEnd
        )
    }

    /// The original wire payload, when the normalizer preserved it.
    pub fn raw(&self) -> Option<&Value> {
        self.metadata.get("_raw")
    }
}
