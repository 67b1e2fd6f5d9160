//! Trait abstractions for dependency injection.
//!
//! The transport seam lives here so the connection layer can be driven by
//! the production reqwest client or by scripted mocks in tests.

mod transport;

pub use transport::{ByteStream, HttpTransport, StreamingResponse, TransportRequest};
