//! Event handler trait.
//!
//! Handlers are the extension seam of the pipeline: each one declares what
//! it can handle, its priority, and its own timeout/retry budget. The
//! pipeline invokes handlers in priority order and treats the event as
//! read-only; handlers must not assume exclusive access.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HandlerError;
use crate::event::CanonicalEvent;

/// What a successful handler invocation tells the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome {
    /// `false` stops the chain after this handler, independent of success,
    /// when the pipeline is configured to honor it.
    pub continue_chain: bool,
    /// Optional handler-produced data, recorded on the result.
    pub data: Option<Value>,
}

impl HandlerOutcome {
    /// Continue the chain, no data.
    pub fn proceed() -> Self {
        Self {
            continue_chain: true,
            data: None,
        }
    }

    /// Stop the chain after this handler.
    pub fn stop() -> Self {
        Self {
            continue_chain: false,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// One processing step in the handler chain.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Unique handler name; used for removal and on results.
    fn name(&self) -> &str;

    /// Handlers run in descending priority order; ties keep insertion order.
    fn priority(&self) -> i32 {
        0
    }

    /// Wall-clock window for one invocation.
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Retries after a failed invocation, each preceded by a fixed delay.
    fn max_retries(&self) -> u32 {
        0
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(100)
    }

    /// Cheap synchronous filter; a `false` skips this handler entirely.
    fn can_handle(&self, event: &CanonicalEvent) -> bool;

    /// Process one event. The event is shared with other handlers in the
    /// same pass and must be treated as read-only.
    async fn handle(&self, event: &CanonicalEvent) -> Result<HandlerOutcome, HandlerError>;
}
