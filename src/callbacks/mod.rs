//! Legacy callback surface.
//!
//! The fixed, backward-compatible callback interface consumed by UI state.
//! Collaborators implement [`StreamCallbacks`] (every method defaults to a
//! no-op) and receive the pipeline's output through it; they contain no
//! protocol logic.

mod adapter;

pub use adapter::CallbackAdapter;

use serde_json::Value;

use crate::event::{ErrorInfo, Interrupt, NodeUpdateInfo, TaskProgress};

/// Start-of-stream notification.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamStart {
    pub thread_id: String,
    pub run_id: Option<String>,
}

/// End-of-stream notification. Delivered at most once per exchange.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamComplete {
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
    pub message_id: Option<String>,
}

/// Coarse stream phase reported through `on_stream_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Streaming,
    Paused,
    Resuming,
    ToolRunning,
    ToolCompleted,
}

impl StreamPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamPhase::Streaming => "streaming",
            StreamPhase::Paused => "paused",
            StreamPhase::Resuming => "resuming",
            StreamPhase::ToolRunning => "tool_running",
            StreamPhase::ToolCompleted => "tool_completed",
        }
    }
}

/// Status transition delivered through `on_stream_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamStatus {
    pub phase: StreamPhase,
    pub detail: Option<String>,
}

impl StreamStatus {
    pub fn new(phase: StreamPhase) -> Self {
        Self {
            phase,
            detail: None,
        }
    }

    pub fn with_detail(phase: StreamPhase, detail: impl Into<String>) -> Self {
        Self {
            phase,
            detail: Some(detail.into()),
        }
    }
}

/// The fixed legacy callback interface.
///
/// All methods default to no-ops so implementors override only what they
/// consume. Invocations for one exchange arrive strictly in event order.
pub trait StreamCallbacks: Send + Sync {
    fn on_stream_start(&self, _start: &StreamStart) {}

    /// A genuine LLM token chunk. Structural payloads that happen to share
    /// the content shape never arrive here.
    fn on_stream_content(&self, _chunk: &str) {}

    /// Delivered exactly once per exchange, mutually exclusive with
    /// `on_error`.
    fn on_stream_complete(&self, _complete: &StreamComplete) {}

    fn on_stream_status(&self, _status: &StreamStatus) {}

    /// Delivered exactly once per exchange, mutually exclusive with
    /// `on_stream_complete`.
    fn on_error(&self, _error: &ErrorInfo) {}

    fn on_hil_interrupt_detected(&self, _interrupt: &Interrupt) {}

    fn on_task_progress_update(&self, _progress: &TaskProgress) {}

    fn on_artifact_update(&self, _artifact: &Value) {}

    fn on_graph_update(&self, _graph: &Value) {}

    fn on_memory_update(&self, _memory: &Value) {}

    /// Never invoked by the shipped adapter: billing events are suppressed
    /// to avoid double counting against the older billing path.
    fn on_billing_update(&self, _usage: &Value) {}

    /// Never invoked by the shipped adapter, see `on_billing_update`.
    fn on_credits_update(&self, _credits: &Value) {}

    fn on_node_update(&self, _update: &NodeUpdateInfo) {}

    fn on_custom_event(&self, _name: &str, _value: &Value) {}
}

/// Callbacks that ignore everything; the default target of an adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl StreamCallbacks for NoopCallbacks {}
