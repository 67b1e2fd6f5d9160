//! Transport-level error types.
//!
//! Errors raised while opening or draining one HTTP streaming exchange.
//! Connect-time failures are fatal to the exchange; mid-stream I/O failures
//! propagate to listeners exactly once.

use std::fmt;

/// Transport-specific error variants.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// Could not establish the HTTP connection.
    ConnectionFailed {
        url: String,
        message: String,
    },

    /// Server answered with a non-2xx status at connect time.
    HttpStatus {
        status: u16,
        message: String,
    },

    /// Server answered 2xx but the response carried no body to stream.
    EmptyBody,

    /// The request or a read timed out.
    Timeout {
        message: String,
    },

    /// Mid-stream I/O failure while draining the response body.
    Io {
        message: String,
    },

    /// The request URL could not be parsed.
    InvalidUrl {
        url: String,
    },

    /// Operation attempted in a state that does not allow it, e.g. calling
    /// `lines()` twice on the same connection.
    InvalidState {
        message: String,
    },

    /// The exchange was cancelled before it resolved. Cancellation racing an
    /// already-latched completion is not reported through this variant.
    Cancelled,
}

impl TransportError {
    /// Check if this error is likely transient and the connect can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed { .. }
            | TransportError::Timeout { .. }
            | TransportError::Io { .. } => true,
            TransportError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            TransportError::ConnectionFailed { .. } => "E_TRANSPORT_CONN",
            TransportError::HttpStatus { .. } => "E_TRANSPORT_STATUS",
            TransportError::EmptyBody => "E_TRANSPORT_NO_BODY",
            TransportError::Timeout { .. } => "E_TRANSPORT_TIMEOUT",
            TransportError::Io { .. } => "E_TRANSPORT_IO",
            TransportError::InvalidUrl { .. } => "E_TRANSPORT_URL",
            TransportError::InvalidState { .. } => "E_TRANSPORT_STATE",
            TransportError::Cancelled => "E_TRANSPORT_CANCELLED",
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectionFailed { url, message } => {
                write!(f, "Connection to {} failed: {}", url, message)
            }
            TransportError::HttpStatus { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            TransportError::EmptyBody => write!(f, "Response carried no body"),
            TransportError::Timeout { message } => write!(f, "Request timeout: {}", message),
            TransportError::Io { message } => write!(f, "Stream I/O error: {}", message),
            TransportError::InvalidUrl { url } => write!(f, "Invalid URL: {}", url),
            TransportError::InvalidState { message } => {
                write!(f, "Invalid connection state: {}", message)
            }
            TransportError::Cancelled => write!(f, "Exchange cancelled"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Classify a reqwest error into a [`TransportError`].
pub fn classify_reqwest_error(url: &str, err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            message: err.to_string(),
        }
    } else if err.is_connect() {
        TransportError::ConnectionFailed {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else if err.is_builder() {
        TransportError::InvalidUrl {
            url: url.to_string(),
        }
    } else {
        TransportError::Io {
            message: err.to_string(),
        }
    }
}
