//! HTTP streaming transport trait.
//!
//! Abstracts the single operation the pipeline needs from HTTP: open a
//! request and hand back the response head plus a lazily-consumed byte
//! stream. Implementations: the production reqwest adapter and scripted
//! mocks for tests.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::TransportError;

/// Lazily-consumed response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// One outbound streaming request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    /// HTTP method; the pipeline defaults to POST.
    pub method: String,
    pub headers: HashMap<String, String>,
    /// JSON body, if any.
    pub body: Option<String>,
}

impl TransportRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Response head plus the body stream.
///
/// `body` is `None` when the server answered without a streamable body;
/// the connection layer treats that as a fatal connect-time error.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Option<ByteStream>,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// Trait for opening one HTTP streaming exchange.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue the request and return the response head with its body stream.
    /// Errors here are connect-time failures; body-stream items carry
    /// mid-stream failures.
    async fn open(&self, request: &TransportRequest) -> Result<StreamingResponse, TransportError>;
}
