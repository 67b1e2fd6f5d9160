//! Terminal pipeline handler fanning canonical events onto the legacy
//! callback surface.
//!
//! Two policies live here and must be preserved:
//!
//! - **Content filtering**: `on_stream_content` fires only for events whose
//!   preserved raw payload marks a custom-stream origin with a non-empty
//!   chunk. Structural or status payloads that parse into the same canonical
//!   shape are skipped silently.
//! - **Billing suppression**: billing and credits events are never
//!   forwarded. An older, still-active path updates billing state; relaying
//!   them here would double count. Do not "fix" this.
//!
//! Terminal deduplication is owned by the exchange's completion latch; the
//! adapter may see several completion-shaped events but only the latch
//! winner reaches the callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

use crate::error::HandlerError;
use crate::event::{CanonicalEvent, ErrorInfo, EventPayload};
use crate::exchange::{CompletionLatch, ExchangeOutcome};
use crate::pipeline::{EventHandler, HandlerOutcome};

use super::{StreamCallbacks, StreamComplete, StreamPhase, StreamStart, StreamStatus};

/// Name the adapter registers under.
pub const ADAPTER_NAME: &str = "callback_adapter";

/// Terminal handler: `can_handle` is always true and priority is minimal so
/// it runs after every other handler in the chain.
pub struct CallbackAdapter {
    callbacks: RwLock<Arc<dyn StreamCallbacks>>,
    latch: Arc<CompletionLatch>,
    started_streaming: AtomicBool,
}

impl CallbackAdapter {
    pub fn new(callbacks: Arc<dyn StreamCallbacks>, latch: Arc<CompletionLatch>) -> Self {
        Self {
            callbacks: RwLock::new(callbacks),
            latch,
            started_streaming: AtomicBool::new(false),
        }
    }

    /// Replace the callback set. Takes effect for the next event.
    pub fn set_callbacks(&self, callbacks: Arc<dyn StreamCallbacks>) {
        *self.callbacks.write().expect("callback set poisoned") = callbacks;
    }

    fn callbacks(&self) -> Arc<dyn StreamCallbacks> {
        Arc::clone(&self.callbacks.read().expect("callback set poisoned"))
    }

    /// Resolve the exchange as completed. Only the latch winner reaches
    /// `on_stream_complete`; returns whether this call won.
    pub fn resolve_complete(&self, complete: StreamComplete) -> bool {
        self.started_streaming.store(false, Ordering::SeqCst);
        if self.latch.fire(ExchangeOutcome::Completed(complete.clone())) {
            self.callbacks().on_stream_complete(&complete);
            true
        } else {
            false
        }
    }

    /// Resolve the exchange as failed. Only the latch winner reaches
    /// `on_error`; returns whether this call won.
    pub fn resolve_error(&self, error: ErrorInfo) -> bool {
        self.started_streaming.store(false, Ordering::SeqCst);
        if self.latch.fire(ExchangeOutcome::Failed(error.clone())) {
            self.callbacks().on_error(&error);
            true
        } else {
            false
        }
    }

    /// A `text_message_content` event only reaches `on_stream_content` when
    /// the preserved raw payload says it came from the custom-stream
    /// dialect.
    fn is_genuine_token_content(event: &CanonicalEvent) -> bool {
        event
            .raw()
            .and_then(|raw| raw.get("type"))
            .and_then(Value::as_str)
            == Some("custom_stream")
    }

    fn fan_out(&self, event: &CanonicalEvent) {
        let callbacks = self.callbacks();

        match &event.payload {
            EventPayload::RunStarted | EventPayload::TextMessageStart { .. } => {
                callbacks.on_stream_start(&StreamStart {
                    thread_id: event.thread_id.clone(),
                    run_id: event.run_id.clone(),
                });
            }
            EventPayload::TextMessageContent { delta } => {
                if delta.is_empty() || !Self::is_genuine_token_content(event) {
                    trace!(
                        thread_id = %event.thread_id,
                        "skipping non-token content payload"
                    );
                    return;
                }
                if !self.started_streaming.swap(true, Ordering::SeqCst) {
                    callbacks.on_stream_status(&StreamStatus::new(StreamPhase::Streaming));
                }
                callbacks.on_stream_content(delta);
            }
            EventPayload::TextMessageEnd => {}
            EventPayload::RunFinished { .. } | EventPayload::StreamDone => {
                self.resolve_complete(StreamComplete {
                    thread_id: Some(event.thread_id.clone()),
                    run_id: event.run_id.clone(),
                    message_id: event.message_id.clone(),
                });
            }
            EventPayload::RunError { error } => {
                self.resolve_error(error.clone());
            }
            EventPayload::ToolCallStart { tool_name, .. } => {
                callbacks.on_stream_status(&StreamStatus::with_detail(
                    StreamPhase::ToolRunning,
                    tool_name.clone(),
                ));
            }
            EventPayload::ToolExecuting {
                tool_call_id,
                display_name,
            } => {
                callbacks.on_stream_status(&StreamStatus::with_detail(
                    StreamPhase::ToolRunning,
                    display_name.clone().unwrap_or_else(|| tool_call_id.clone()),
                ));
            }
            EventPayload::ToolCallEnd { tool_call_id, .. } => {
                callbacks.on_stream_status(&StreamStatus::with_detail(
                    StreamPhase::ToolCompleted,
                    tool_call_id.clone(),
                ));
            }
            EventPayload::HilInterruptDetected { interrupt } => {
                callbacks.on_hil_interrupt_detected(interrupt);
            }
            EventPayload::TaskProgressUpdate { progress } => {
                callbacks.on_task_progress_update(progress);
            }
            EventPayload::ArtifactCreated { artifact }
            | EventPayload::ArtifactUpdated { artifact } => {
                callbacks.on_artifact_update(artifact);
            }
            EventPayload::NodeUpdate { update } => {
                callbacks.on_node_update(update);
            }
            EventPayload::GraphUpdate { graph } => {
                callbacks.on_graph_update(graph);
            }
            EventPayload::StateUpdate { state } => {
                callbacks.on_custom_event("state_update", state);
            }
            EventPayload::MemoryUpdate { memory } => {
                callbacks.on_memory_update(memory);
            }
            EventPayload::Billing { .. } => {
                // Deliberately dropped: the older billing path still updates
                // billing state and forwarding here would double count.
                trace!(thread_id = %event.thread_id, "suppressing billing event");
            }
            EventPayload::Paused { reason } => {
                let status = match reason {
                    Some(reason) => {
                        StreamStatus::with_detail(StreamPhase::Paused, reason.clone())
                    }
                    None => StreamStatus::new(StreamPhase::Paused),
                };
                callbacks.on_stream_status(&status);
            }
            EventPayload::ResumeStart => {
                callbacks.on_stream_status(&StreamStatus::new(StreamPhase::Resuming));
            }
            EventPayload::ResumeEnd => {
                callbacks.on_stream_status(&StreamStatus::new(StreamPhase::Streaming));
            }
            EventPayload::Custom { name, value } => {
                callbacks.on_custom_event(name.as_deref().unwrap_or("custom"), value);
            }
        }
    }
}

#[async_trait]
impl EventHandler for CallbackAdapter {
    fn name(&self) -> &str {
        ADAPTER_NAME
    }

    fn priority(&self) -> i32 {
        i32::MIN
    }

    fn can_handle(&self, _event: &CanonicalEvent) -> bool {
        true
    }

    async fn handle(&self, event: &CanonicalEvent) -> Result<HandlerOutcome, HandlerError> {
        self.fan_out(event);
        Ok(HandlerOutcome::proceed())
    }
}
