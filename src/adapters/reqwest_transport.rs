//! Reqwest-based HTTP streaming transport.

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::error::{classify_reqwest_error, TransportError};
use crate::traits::{HttpTransport, StreamingResponse, TransportRequest};

/// Production transport wrapping a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a pre-configured client (timeouts, pools, TLS settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    fn convert_headers(headers: &reqwest::header::HeaderMap) -> std::collections::HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn open(&self, request: &TransportRequest) -> Result<StreamingResponse, TransportError> {
        let method: reqwest::Method = request
            .method
            .parse()
            .map_err(|_| TransportError::InvalidUrl {
                url: format!("{} {}", request.method, request.url),
            })?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&request.url, &e))?;

        let status = response.status().as_u16();
        let headers = Self::convert_headers(response.headers());

        let url = request.url.clone();
        let body = response.bytes_stream().map(move |result| {
            result.map_err(|e| match classify_reqwest_error(&url, &e) {
                // Mid-stream failures are I/O, not connect failures.
                TransportError::ConnectionFailed { message, .. } => {
                    TransportError::Io { message }
                }
                other => other,
            })
        });

        Ok(StreamingResponse {
            status,
            headers,
            body: Some(Box::pin(body)),
        })
    }
}
