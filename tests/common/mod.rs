//! Common test utilities for integration tests.
//!
//! Provides a recording callback implementation and helpers for building
//! SSE payloads and clients wired to mock or wiremock transports.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::Value;
use sluice::callbacks::{StreamCallbacks, StreamComplete, StreamStart, StreamStatus};
use sluice::event::{ErrorInfo, Interrupt, NodeUpdateInfo, TaskProgress};

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Callback implementation that records every invocation as a readable
/// string for assertions.
#[derive(Default)]
pub struct RecordingCallbacks {
    calls: Mutex<Vec<String>>,
}

impl RecordingCallbacks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Concatenation of every `on_stream_content` chunk, in order.
    pub fn content(&self) -> String {
        self.calls()
            .iter()
            .filter_map(|c| c.strip_prefix("content:"))
            .collect()
    }
}

impl StreamCallbacks for RecordingCallbacks {
    fn on_stream_start(&self, start: &StreamStart) {
        self.record(format!("start:{}", start.thread_id));
    }
    fn on_stream_content(&self, chunk: &str) {
        self.record(format!("content:{}", chunk));
    }
    fn on_stream_complete(&self, complete: &StreamComplete) {
        self.record(format!(
            "complete:{}",
            complete.thread_id.as_deref().unwrap_or("")
        ));
    }
    fn on_stream_status(&self, status: &StreamStatus) {
        self.record(format!("status:{}", status.phase.as_str()));
    }
    fn on_error(&self, error: &ErrorInfo) {
        self.record(format!("error:{}", error.code));
    }
    fn on_hil_interrupt_detected(&self, interrupt: &Interrupt) {
        self.record(format!("hil:{}", interrupt.id));
    }
    fn on_task_progress_update(&self, progress: &TaskProgress) {
        self.record(format!("progress:{}", progress.tool_name));
    }
    fn on_artifact_update(&self, _artifact: &Value) {
        self.record("artifact");
    }
    fn on_graph_update(&self, _graph: &Value) {
        self.record("graph");
    }
    fn on_memory_update(&self, _memory: &Value) {
        self.record("memory");
    }
    fn on_billing_update(&self, _usage: &Value) {
        self.record("billing");
    }
    fn on_credits_update(&self, _credits: &Value) {
        self.record("credits");
    }
    fn on_node_update(&self, update: &NodeUpdateInfo) {
        self.record(format!("node:{}", update.node_id));
    }
    fn on_custom_event(&self, name: &str, _value: &Value) {
        self.record(format!("custom:{}", name));
    }
}

/// Build one SSE data block from a JSON literal.
pub fn sse_block(json: &Value) -> String {
    format!("data: {}\n\n", json)
}

/// Build an SSE body from JSON payloads, terminated with `[DONE]`.
pub fn sse_body(payloads: &[Value]) -> String {
    let mut body: String = payloads.iter().map(sse_block).collect();
    body.push_str("data: [DONE]\n\n");
    body
}
