//! Unified error type for the sluice pipeline.
//!
//! `SluiceError` consolidates the domain-specific error types into a single
//! enum so the orchestrator and public API surface a single error family
//! with uniform categorization and retry logic.

use std::fmt;

use serde_json::json;

use super::category::ErrorCategory;
use super::handler::HandlerError;
use super::protocol::{FramingError, NormalizeError};
use super::transport::TransportError;
use crate::event::ErrorInfo;

/// Unified error type for the sluice pipeline.
#[derive(Debug, Clone)]
pub enum SluiceError {
    /// Transport failures (connect, non-2xx, missing body, mid-stream I/O).
    Transport(TransportError),

    /// SSE framing failures.
    Framing(FramingError),

    /// Event normalization failures.
    Normalize(NormalizeError),

    /// Failures inside a registered handler.
    Handler(HandlerError),

    /// Cancellation observed before the exchange resolved.
    Cancelled,
}

impl SluiceError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SluiceError::Transport(err) => match err {
                TransportError::HttpStatus { .. } | TransportError::EmptyBody => {
                    ErrorCategory::Server
                }
                TransportError::Cancelled => ErrorCategory::Cancelled,
                _ => ErrorCategory::Network,
            },
            SluiceError::Framing(_) | SluiceError::Normalize(_) => ErrorCategory::Protocol,
            SluiceError::Handler(_) => ErrorCategory::Handler,
            SluiceError::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            SluiceError::Transport(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            SluiceError::Transport(err) => err.error_code(),
            SluiceError::Framing(err) => err.error_code(),
            SluiceError::Normalize(err) => err.error_code(),
            SluiceError::Handler(err) => err.error_code(),
            SluiceError::Cancelled => "E_CANCELLED",
        }
    }

    /// Normalize into the `{code, message, details}` shape delivered to the
    /// `on_error` callback.
    pub fn to_error_info(&self) -> ErrorInfo {
        let details = match self {
            SluiceError::Transport(TransportError::HttpStatus { status, .. }) => {
                Some(json!({ "status": status }))
            }
            SluiceError::Normalize(err) => err.raw_input().map(|raw| json!({ "raw": raw })),
            SluiceError::Handler(err) => Some(json!({ "handler": err.handler_name() })),
            _ => None,
        };
        ErrorInfo {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details,
        }
    }
}

impl fmt::Display for SluiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SluiceError::Transport(err) => write!(f, "{}", err),
            SluiceError::Framing(err) => write!(f, "{}", err),
            SluiceError::Normalize(err) => write!(f, "{}", err),
            SluiceError::Handler(err) => write!(f, "{}", err),
            SluiceError::Cancelled => write!(f, "Exchange cancelled"),
        }
    }
}

impl std::error::Error for SluiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SluiceError::Transport(err) => Some(err),
            SluiceError::Framing(err) => Some(err),
            SluiceError::Normalize(err) => Some(err),
            SluiceError::Handler(err) => Some(err),
            SluiceError::Cancelled => None,
        }
    }
}

impl From<TransportError> for SluiceError {
    fn from(err: TransportError) -> Self {
        SluiceError::Transport(err)
    }
}

impl From<FramingError> for SluiceError {
    fn from(err: FramingError) -> Self {
        SluiceError::Framing(err)
    }
}

impl From<NormalizeError> for SluiceError {
    fn from(err: NormalizeError) -> Self {
        SluiceError::Normalize(err)
    }
}

impl From<HandlerError> for SluiceError {
    fn from(err: HandlerError) -> Self {
        SluiceError::Handler(err)
    }
}
