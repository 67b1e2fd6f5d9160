//! Priority-ordered handler chain.
//!
//! The pipeline runs each canonical event through its registered handlers in
//! descending priority order, enforcing per-handler timeout and bounded
//! retry, and honoring chain-level stop conditions. The handler list is the
//! only persisted state; it may be mutated between calls, and an in-flight
//! `process` works on a snapshot so concurrent registration never corrupts
//! a pass.

mod handler;
mod result;

pub use handler::{EventHandler, HandlerOutcome};
pub use result::{HandlerResult, PipelineResult, PipelineStats};

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use futures::FutureExt;
use serde_json::{json, Map};
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::HandlerError;
use crate::event::CanonicalEvent;

struct Entry {
    handler: Arc<dyn EventHandler>,
    seq: u64,
}

#[derive(Default)]
struct Registry {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl Registry {
    fn insert(&mut self, handler: Arc<dyn EventHandler>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { handler, seq });
        // Descending priority; equal priorities keep insertion order.
        self.entries
            .sort_by_key(|e| (std::cmp::Reverse(e.handler.priority()), e.seq));
    }
}

/// Ordered chain of event handlers.
#[derive(Clone)]
pub struct HandlerPipeline {
    registry: Arc<RwLock<Registry>>,
    config: PipelineConfig,
}

impl HandlerPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            config,
        }
    }

    /// Register a handler. Takes effect for the next `process` call.
    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        let mut registry = self.registry.write().expect("handler registry poisoned");
        registry.insert(handler);
    }

    /// Remove all handlers with the given name. Returns how many were
    /// removed.
    pub fn remove_handler(&self, name: &str) -> usize {
        let mut registry = self.registry.write().expect("handler registry poisoned");
        let before = registry.entries.len();
        registry.entries.retain(|e| e.handler.name() != name);
        before - registry.entries.len()
    }

    pub fn len(&self) -> usize {
        self.registry
            .read()
            .expect("handler registry poisoned")
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run one event through the chain.
    pub async fn process(&self, event: &CanonicalEvent) -> PipelineResult {
        self.process_with(event, &[]).await
    }

    /// Run one event through the chain plus per-exchange terminal handlers.
    /// The extras run after the registered handlers of equal priority and
    /// are not stored in the shared registry.
    pub async fn process_with(
        &self,
        event: &CanonicalEvent,
        extras: &[Arc<dyn EventHandler>],
    ) -> PipelineResult {
        // Copy-on-read snapshot: concurrent add/remove cannot affect this
        // pass.
        let mut handlers: Vec<Arc<dyn EventHandler>> = {
            let registry = self.registry.read().expect("handler registry poisoned");
            registry.entries.iter().map(|e| Arc::clone(&e.handler)).collect()
        };
        handlers.extend(extras.iter().cloned());

        let started = Instant::now();
        let mut results: Vec<HandlerResult> = Vec::new();
        let mut stopped_early = false;

        let pass = async {
            for handler in &handlers {
                if !handler.can_handle(event) {
                    continue;
                }

                let result = Self::invoke(handler.as_ref(), event).await;
                let failed = !result.success;
                let continue_chain = result.continue_chain;
                results.push(result);

                if failed && self.config.stop_on_first_error {
                    stopped_early = true;
                    break;
                }
                if !continue_chain && self.config.stop_on_continue_false {
                    stopped_early = true;
                    break;
                }
            }
        };

        let timed_out = tokio::time::timeout(self.config.max_processing_time, pass)
            .await
            .is_err();
        if timed_out {
            warn!(
                event_type = event.type_name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "pipeline pass hit the processing deadline"
            );
        }

        let stats = self.config.collect_stats.then(|| {
            let failed = results.iter().filter(|r| !r.success).count();
            PipelineStats {
                attempted: results.len(),
                succeeded: results.len() - failed,
                failed,
                stopped_early,
            }
        });

        PipelineResult {
            results,
            duration: started.elapsed(),
            stats,
            timed_out,
        }
    }

    /// One handler against one event: timeout race, panic capture, bounded
    /// retry with a fixed delay.
    async fn invoke(handler: &dyn EventHandler, event: &CanonicalEvent) -> HandlerResult {
        let name = handler.name().to_string();
        let max_attempts = handler.max_retries() as u64 + 1;
        let started = Instant::now();
        let mut last_error: Option<HandlerError> = None;

        for attempt in 1..=max_attempts {
            let invocation = AssertUnwindSafe(handler.handle(event)).catch_unwind();
            let error = match tokio::time::timeout(handler.timeout(), invocation).await {
                Err(_) => HandlerError::Timeout {
                    handler: name.clone(),
                    timeout_ms: handler.timeout().as_millis() as u64,
                },
                Ok(Err(panic)) => HandlerError::Panicked {
                    handler: name.clone(),
                    message: panic_message(&panic),
                },
                Ok(Ok(Err(e))) => e,
                Ok(Ok(Ok(outcome))) => {
                    let mut metadata = Map::new();
                    metadata.insert("attempts".to_string(), json!(attempt));
                    return HandlerResult {
                        handled_by: name,
                        success: true,
                        continue_chain: outcome.continue_chain,
                        duration: started.elapsed(),
                        data: outcome.data,
                        error: None,
                        metadata,
                    };
                }
            };

            debug!(
                handler = %name,
                attempt,
                max_attempts,
                error = %error,
                "handler invocation failed"
            );
            last_error = Some(error);

            if attempt < max_attempts {
                tokio::time::sleep(handler.retry_delay()).await;
            }
        }

        let mut metadata = Map::new();
        metadata.insert("attempts".to_string(), json!(max_attempts));
        HandlerResult {
            handled_by: name,
            success: false,
            continue_chain: true,
            duration: started.elapsed(),
            data: None,
            error: last_error,
            metadata,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
