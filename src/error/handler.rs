//! Event-handler error types.
//!
//! A failure inside a registered handler is captured as a failed
//! `HandlerResult` and never aborts the pipeline pass on its own, unless
//! stop-on-first-error is configured.

use std::fmt;

/// Errors raised by one handler invocation inside a pipeline pass.
#[derive(Debug, Clone)]
pub enum HandlerError {
    /// The handler returned an error.
    Failed {
        handler: String,
        message: String,
    },

    /// The handler did not finish inside its wall-clock window.
    Timeout {
        handler: String,
        timeout_ms: u64,
    },

    /// The handler panicked; the panic was caught at the invocation boundary.
    Panicked {
        handler: String,
        message: String,
    },
}

impl HandlerError {
    /// Name of the handler the error originated from.
    pub fn handler_name(&self) -> &str {
        match self {
            HandlerError::Failed { handler, .. }
            | HandlerError::Timeout { handler, .. }
            | HandlerError::Panicked { handler, .. } => handler,
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            HandlerError::Failed { .. } => "E_HANDLER_FAILED",
            HandlerError::Timeout { .. } => "E_HANDLER_TIMEOUT",
            HandlerError::Panicked { .. } => "E_HANDLER_PANIC",
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Failed { handler, message } => {
                write!(f, "Handler '{}' failed: {}", handler, message)
            }
            HandlerError::Timeout { handler, timeout_ms } => {
                write!(f, "Handler '{}' timed out after {}ms", handler, timeout_ms)
            }
            HandlerError::Panicked { handler, message } => {
                write!(f, "Handler '{}' panicked: {}", handler, message)
            }
        }
    }
}

impl std::error::Error for HandlerError {}
