//! Configuration surface for the ingestion pipeline.
//!
//! Plain structs with `Default` impls carrying the documented defaults.
//! Each pipeline stage takes its own config; [`SluiceConfig`] bundles them
//! for the client entry point.

use std::collections::HashMap;
use std::time::Duration;

/// Transport/connection options.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Wall-clock limit for establishing the HTTP exchange.
    pub connect_timeout: Duration,
    /// Connect-time retry attempts after the first failure.
    pub max_retries: u32,
    /// Fixed delay between connect retries.
    pub retry_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// SSE framer options.
#[derive(Debug, Clone)]
pub struct FramerConfig {
    /// Stash unknown `field: value` lines into record metadata instead of
    /// dropping them.
    pub allow_custom_events: bool,
    /// Maximum accumulated size of one record, in bytes. Exceeding it is a
    /// per-record error, not a stream abort.
    pub max_event_size: usize,
    /// Treat per-record framing errors as fatal to the exchange.
    pub strict_mode: bool,
    /// Alias table applied to `event:` field values before emission.
    pub event_type_mapping: HashMap<String, String>,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            allow_custom_events: true,
            max_event_size: 1024 * 1024,
            strict_mode: false,
            event_type_mapping: HashMap::new(),
        }
    }
}

/// Event normalizer options.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Accept and convert the legacy dialect. When off, legacy inputs are
    /// reported as errors.
    pub enable_legacy_conversion: bool,
    /// Reject events missing type-specific required fields.
    pub validate_event_structure: bool,
    /// Synthesize timestamp / run_id / message_id / thread_id when the
    /// variant requires one and none was supplied.
    pub auto_fill_missing_fields: bool,
    /// Retain the untransformed input under `metadata._raw` so downstream
    /// stages can inspect the original payload.
    pub preserve_raw_data: bool,
    /// Extra type-name remappings applied before dialect dispatch.
    pub custom_event_type_mapping: HashMap<String, String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            enable_legacy_conversion: true,
            validate_event_structure: true,
            auto_fill_missing_fields: true,
            preserve_raw_data: true,
            custom_event_type_mapping: HashMap::new(),
        }
    }
}

/// Handler pipeline options.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Stop the chain at the first failing handler.
    pub stop_on_first_error: bool,
    /// Stop the chain when a handler signals `continue_chain = false`.
    pub stop_on_continue_false: bool,
    /// Wall-clock bound for one whole `process` call, independent of
    /// per-handler timeouts.
    pub max_processing_time: Duration,
    /// Collect per-pass aggregate stats on the pipeline result.
    pub collect_stats: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stop_on_first_error: false,
            stop_on_continue_false: true,
            max_processing_time: Duration::from_secs(30),
            collect_stats: true,
        }
    }
}

/// Bundle of all stage configs, consumed by the client entry point.
#[derive(Debug, Clone, Default)]
pub struct SluiceConfig {
    pub connection: ConnectionConfig,
    pub framer: FramerConfig,
    pub normalizer: NormalizerConfig,
    pub pipeline: PipelineConfig,
}
