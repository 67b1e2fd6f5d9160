//! Wire-protocol error types: SSE framing and event normalization.
//!
//! Framing errors are reported per-record and never abort the stream on
//! their own. Normalization errors carry the offending raw input so callers
//! can log or surface it; whether to skip or abort is the caller's decision.

use thiserror::Error;

/// Errors raised while framing the SSE byte stream into records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FramingError {
    /// A record's accumulated size exceeded the configured maximum. The
    /// accumulation is discarded and the stream continues.
    #[error("SSE record of {size} bytes exceeds limit of {limit} bytes")]
    RecordTooLarge { size: usize, limit: usize },
}

impl FramingError {
    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            FramingError::RecordTooLarge { .. } => "E_FRAME_TOO_LARGE",
        }
    }
}

/// Errors raised while normalizing a framed record into a canonical event.
#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    /// The record's data payload was not valid JSON.
    #[error("Invalid JSON in event payload: {detail}")]
    InvalidJson { detail: String, raw: String },

    /// The input parsed as JSON but satisfies neither dialect's minimum
    /// shape (e.g. not an object, or no usable type tag).
    #[error("Event payload fits neither the structured nor the legacy dialect")]
    UnsupportedShape { raw: String },

    /// A legacy-dialect input arrived while legacy conversion is disabled.
    #[error("Legacy event '{event_type}' received with legacy conversion disabled")]
    LegacyDisabled { event_type: String },

    /// Structural validation rejected the event: a type-specific required
    /// field is missing or empty.
    #[error("Event '{event_type}' is missing required field '{field}'")]
    MissingField { event_type: String, field: String },
}

impl NormalizeError {
    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            NormalizeError::InvalidJson { .. } => "E_NORM_JSON",
            NormalizeError::UnsupportedShape { .. } => "E_NORM_SHAPE",
            NormalizeError::LegacyDisabled { .. } => "E_NORM_LEGACY_OFF",
            NormalizeError::MissingField { .. } => "E_NORM_FIELD",
        }
    }

    /// The raw input that failed to normalize, where available.
    pub fn raw_input(&self) -> Option<&str> {
        match self {
            NormalizeError::InvalidJson { raw, .. } => Some(raw),
            NormalizeError::UnsupportedShape { raw } => Some(raw),
            _ => None,
        }
    }
}
