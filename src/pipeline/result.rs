//! Pipeline result types.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::HandlerError;

/// Record of one attempted handler inside a pipeline pass.
#[derive(Debug, Clone)]
pub struct HandlerResult {
    /// Name of the handler that produced this result.
    pub handled_by: String,
    pub success: bool,
    /// The handler's chain-continuation signal. Failed invocations report
    /// `true` so the stop decision stays with the pipeline config.
    pub continue_chain: bool,
    /// Wall-clock time across all attempts, including retry delays.
    pub duration: Duration,
    /// Handler-produced data, if any.
    pub data: Option<Value>,
    pub error: Option<HandlerError>,
    /// Open map; carries `attempts` for retried handlers.
    pub metadata: Map<String, Value>,
}

impl HandlerResult {
    /// Total invocation attempts recorded for this handler.
    pub fn attempts(&self) -> u64 {
        self.metadata
            .get("attempts")
            .and_then(Value::as_u64)
            .unwrap_or(1)
    }
}

/// Aggregate counters for one pipeline pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    /// Handlers invoked (passed their `can_handle` filter).
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// A chain-stop condition ended the pass before the last handler.
    pub stopped_early: bool,
}

/// Everything one `process` call produced.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// One entry per attempted handler, in invocation order.
    pub results: Vec<HandlerResult>,
    /// Elapsed time for the whole pass.
    pub duration: Duration,
    /// Present when stats collection is enabled.
    pub stats: Option<PipelineStats>,
    /// The pass hit the overall processing deadline.
    pub timed_out: bool,
}

impl PipelineResult {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    /// The first failed result, if any.
    pub fn first_failure(&self) -> Option<&HandlerResult> {
        self.results.iter().find(|r| !r.success)
    }
}
