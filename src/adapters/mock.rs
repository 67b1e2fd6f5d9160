//! Scripted mock transport for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;

use crate::error::TransportError;
use crate::traits::{HttpTransport, StreamingResponse, TransportRequest};

/// What a [`MockTransport`] plays back per `open` call.
#[derive(Debug, Clone)]
pub struct MockScript {
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Body chunks, delivered in order. An `Err` item simulates a
    /// mid-stream I/O failure.
    pub chunks: Vec<Result<Bytes, TransportError>>,
    /// Answer with no body at all.
    pub no_body: bool,
    /// Fail this many `open` calls with a retryable error before
    /// succeeding.
    pub connect_failures: u32,
    /// Delay before each chunk, for cancellation tests.
    pub chunk_delay: Option<Duration>,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            status: 200,
            headers: [("content-type".to_string(), "text/event-stream".to_string())]
                .into_iter()
                .collect(),
            chunks: Vec::new(),
            no_body: false,
            connect_failures: 0,
            chunk_delay: None,
        }
    }
}

impl MockScript {
    /// A 200 SSE response delivering the given text chunks.
    pub fn sse(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks
                .iter()
                .map(|c| Ok(Bytes::from(c.to_string())))
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Transport playing back a [`MockScript`]; records every request.
pub struct MockTransport {
    script: MockScript,
    opens: AtomicU32,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            opens: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// How many times `open` was called.
    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn open(&self, request: &TransportRequest) -> Result<StreamingResponse, TransportError> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if attempt < self.script.connect_failures {
            return Err(TransportError::ConnectionFailed {
                url: request.url.clone(),
                message: "scripted connect failure".to_string(),
            });
        }

        if self.script.no_body {
            return Ok(StreamingResponse {
                status: self.script.status,
                headers: self.script.headers.clone(),
                body: None,
            });
        }

        let delay = self.script.chunk_delay;
        let queue: VecDeque<_> = self.script.chunks.clone().into();
        let body = stream::unfold(queue, move |mut queue| async move {
            let next = queue.pop_front()?;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Some((next, queue))
        });

        Ok(StreamingResponse {
            status: self.script.status,
            headers: self.script.headers.clone(),
            body: Some(Box::pin(body)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_mock_plays_back_chunks() {
        let transport = MockTransport::new(MockScript::sse(&["data: a\n\n", "data: b\n\n"]));
        let response = transport
            .open(&TransportRequest::post("http://mock/v1/stream"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);

        let chunks: Vec<_> = response
            .body
            .unwrap()
            .map(|c| c.unwrap())
            .collect::<Vec<_>>()
            .await;
        assert_eq!(chunks, vec![Bytes::from("data: a\n\n"), Bytes::from("data: b\n\n")]);
    }

    #[tokio::test]
    async fn test_mock_connect_failures_then_success() {
        let script = MockScript {
            connect_failures: 2,
            ..MockScript::sse(&["data: ok\n\n"])
        };
        let transport = MockTransport::new(script);
        let request = TransportRequest::post("http://mock/");

        assert!(transport.open(&request).await.is_err());
        assert!(transport.open(&request).await.is_err());
        assert!(transport.open(&request).await.is_ok());
        assert_eq!(transport.open_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_no_body() {
        let script = MockScript {
            no_body: true,
            ..Default::default()
        };
        let transport = MockTransport::new(script);
        let response = transport
            .open(&TransportRequest::post("http://mock/"))
            .await
            .unwrap();
        assert!(response.body.is_none());
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let transport = MockTransport::new(MockScript::default());
        let request = TransportRequest::post("http://mock/v1/stream").with_body("{\"p\":1}");
        transport.open(&request).await.unwrap();
        assert_eq!(
            transport.last_request().unwrap().body.as_deref(),
            Some("{\"p\":1}")
        );
    }
}
