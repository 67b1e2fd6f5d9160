//! Error category classification for unified error handling.
//!
//! Provides a high-level categorization of errors to enable consistent
//! retry policies, user messaging, and recovery decisions.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-level failures (connect, DNS, timeout, mid-stream I/O).
    /// Generally transient and retryable.
    Network,

    /// Backend/server-side failures (non-2xx responses, backend-reported
    /// errors). Generally transient and retryable after a delay.
    Server,

    /// Wire-protocol failures (framing, malformed JSON, events that fit
    /// neither dialect). Not retryable; the input itself is bad.
    Protocol,

    /// Failures inside a registered event handler (exception, timeout,
    /// panic). Scoped to one pipeline pass.
    Handler,

    /// Cooperative cancellation observed before the exchange resolved.
    Cancelled,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient
    /// and the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Handler => "handler",
            ErrorCategory::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_categories() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Server.is_retryable());
        assert!(!ErrorCategory::Protocol.is_retryable());
        assert!(!ErrorCategory::Handler.is_retryable());
        assert!(!ErrorCategory::Cancelled.is_retryable());
    }

    #[test]
    fn test_as_str() {
        assert_eq!(ErrorCategory::Network.as_str(), "network");
        assert_eq!(ErrorCategory::Protocol.as_str(), "protocol");
        assert_eq!(format!("{}", ErrorCategory::Handler), "handler");
    }
}
