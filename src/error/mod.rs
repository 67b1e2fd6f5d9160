//! Unified error handling for the sluice pipeline.
//!
//! This module provides the error architecture for the crate:
//!
//! - **Error Categories**: high-level classification for handling decisions
//! - **Domain-specific Errors**: transport, framing, normalization, handler
//! - **Unified Error Type**: [`SluiceError`] consolidates all error types
//!
//! Propagation policy: lower layers never silently swallow malformed input.
//! Framing and normalization errors are reported per-record with the
//! offending input attached; transport errors are fatal to the exchange and
//! surface once through the terminal error path; handler errors are captured
//! as failed results inside one pipeline pass.

mod category;
mod handler;
mod protocol;
mod sluice_error;
mod transport;

pub use category::ErrorCategory;
pub use handler::HandlerError;
pub use protocol::{FramingError, NormalizeError};
pub use sluice_error::SluiceError;
pub use transport::{classify_reqwest_error, TransportError};

/// Convenience result alias used across the crate.
pub type SluiceResult<T> = Result<T, SluiceError>;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_error_unification() {
        let transport: SluiceError = TransportError::EmptyBody.into();
        let framing: SluiceError = FramingError::RecordTooLarge {
            size: 10,
            limit: 5,
        }
        .into();
        let normalize: SluiceError = NormalizeError::UnsupportedShape {
            raw: "42".to_string(),
        }
        .into();
        let handler: SluiceError = HandlerError::Failed {
            handler: "h".to_string(),
            message: "m".to_string(),
        }
        .into();

        assert_eq!(transport.category(), ErrorCategory::Server);
        assert_eq!(framing.category(), ErrorCategory::Protocol);
        assert_eq!(normalize.category(), ErrorCategory::Protocol);
        assert_eq!(handler.category(), ErrorCategory::Handler);

        for err in [transport, framing, normalize, handler] {
            assert!(!err.error_code().is_empty());
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;

        let err: SluiceError = TransportError::Cancelled.into();
        assert!(err.source().is_some());
        assert!(SluiceError::Cancelled.source().is_none());
    }
}
