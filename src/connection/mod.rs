//! One HTTP streaming exchange.
//!
//! A [`Connection`] owns a single request/response exchange: it opens the
//! request through the transport seam, validates the response, and exposes
//! the body as a finite, non-restartable stream of text lines with the
//! trailing partial line buffered across reads. It knows nothing about
//! event semantics.
//!
//! Cancellation is cooperative via a [`CancellationToken`]: aborting
//! unblocks the current read immediately and ends the line stream cleanly
//! rather than erroring.

mod state;

pub use state::ConnectionState;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::TransportError;
use crate::traits::{ByteStream, HttpTransport, TransportRequest};

/// Notifications delivered to registered listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionSignal {
    Open { status: u16 },
    Data { bytes: usize },
    Error { message: String },
    Close { code: Option<u16>, reason: Option<String> },
}

/// Response head persisted for diagnostics.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: u16,
    pub headers: HashMap<String, String>,
}

/// State shared with the in-flight line stream.
struct Shared {
    state: Mutex<ConnectionState>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<ConnectionSignal>>>,
    response: Mutex<Option<ResponseMeta>>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state.lock().expect("connection state poisoned")
    }

    /// Apply a transition if the DAG permits it.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.state.lock().expect("connection state poisoned");
        if state.can_transition_to(next) {
            debug!(from = state.as_str(), to = next.as_str(), "connection state");
            *state = next;
            true
        } else {
            debug!(
                from = state.as_str(),
                to = next.as_str(),
                "transition rejected"
            );
            false
        }
    }

    fn notify(&self, signal: ConnectionSignal) {
        let mut listeners = self.listeners.lock().expect("listener set poisoned");
        listeners.retain(|tx| tx.send(signal.clone()).is_ok());
    }
}

/// Owns one HTTP streaming exchange and its cancellation handle.
pub struct Connection {
    transport: Arc<dyn HttpTransport>,
    config: ConnectionConfig,
    cancel: CancellationToken,
    shared: Arc<Shared>,
    body: Mutex<Option<ByteStream>>,
}

impl Connection {
    pub fn new(transport: Arc<dyn HttpTransport>, config: ConnectionConfig) -> Self {
        Self {
            transport,
            config,
            cancel: CancellationToken::new(),
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::Idle),
                listeners: Mutex::new(Vec::new()),
                response: Mutex::new(None),
            }),
            body: Mutex::new(None),
        }
    }

    /// Handle for cooperative cancellation of this exchange.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Register a listener for `open|data|error|close` notifications.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ConnectionSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .listeners
            .lock()
            .expect("listener set poisoned")
            .push(tx);
        rx
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Connected | ConnectionState::Streaming
        )
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == ConnectionState::Streaming
    }

    /// Response status and headers, once connected.
    pub fn response_meta(&self) -> Option<ResponseMeta> {
        self.shared
            .response
            .lock()
            .expect("response meta poisoned")
            .clone()
    }

    /// Open the exchange: issue the request, validate a 2xx status and a
    /// non-empty body. Retries retryable failures up to the configured
    /// budget with a fixed delay.
    pub async fn connect(&self, request: &TransportRequest) -> Result<(), TransportError> {
        if !self.shared.transition(ConnectionState::Connecting) {
            return Err(TransportError::InvalidState {
                message: format!("connect from {}", self.state().as_str()),
            });
        }

        let mut attempt: u32 = 0;
        let result = loop {
            let open = async {
                match tokio::time::timeout(self.config.connect_timeout, self.transport.open(request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout {
                        message: format!(
                            "connect exceeded {}ms",
                            self.config.connect_timeout.as_millis()
                        ),
                    }),
                }
            };

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => Err(TransportError::Cancelled),
                result = open => result,
            };

            match outcome {
                Ok(response) => {
                    if !(200..300).contains(&response.status) {
                        let message = match response.body {
                            Some(body) => read_error_body(body).await,
                            None => "no response body".to_string(),
                        };
                        break Err(TransportError::HttpStatus {
                            status: response.status,
                            message,
                        });
                    }
                    let Some(body) = response.body else {
                        break Err(TransportError::EmptyBody);
                    };
                    *self.shared.response.lock().expect("response meta poisoned") =
                        Some(ResponseMeta {
                            status: response.status,
                            headers: response.headers,
                        });
                    *self.body.lock().expect("body slot poisoned") = Some(body);
                    break Ok(response.status);
                }
                Err(e)
                    if attempt < self.config.max_retries
                        && matches!(
                            e,
                            TransportError::ConnectionFailed { .. }
                                | TransportError::Timeout { .. }
                                | TransportError::Io { .. }
                        ) =>
                {
                    attempt += 1;
                    warn!(attempt, error = %e, "connect failed, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => break Err(e),
            }
        };

        match result {
            Ok(status) => {
                self.shared.transition(ConnectionState::Connected);
                self.shared.notify(ConnectionSignal::Open { status });
                Ok(())
            }
            Err(e) => {
                self.shared.transition(ConnectionState::Error);
                self.shared.notify(ConnectionSignal::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// The response body as a finite stream of text lines. Not restartable:
    /// a second call errors. The trailing partial line is buffered across
    /// reads and flushed once at stream end. Cancellation ends the stream
    /// cleanly.
    pub fn lines(
        &self,
    ) -> Result<
        std::pin::Pin<Box<dyn futures::Stream<Item = Result<String, TransportError>> + Send>>,
        TransportError,
    > {
        let body = self
            .body
            .lock()
            .expect("body slot poisoned")
            .take()
            .ok_or_else(|| TransportError::InvalidState {
                message: "line stream unavailable (not connected, or already taken)".to_string(),
            })?;

        self.shared.transition(ConnectionState::Streaming);

        let state = LineState {
            body,
            buffer: Vec::new(),
            done: false,
            shared: Arc::clone(&self.shared),
            cancel: self.cancel.clone(),
        };

        Ok(Box::pin(stream::unfold(state, |mut st| async move {
            loop {
                if let Some(pos) = st.buffer.iter().position(|&b| b == b'\n') {
                    let mut raw: Vec<u8> = st.buffer.drain(..=pos).collect();
                    raw.pop();
                    if raw.last() == Some(&b'\r') {
                        raw.pop();
                    }
                    let line = String::from_utf8_lossy(&raw).into_owned();
                    st.shared.notify(ConnectionSignal::Data { bytes: line.len() });
                    return Some((Ok(line), st));
                }

                if st.done {
                    if st.buffer.is_empty() {
                        return None;
                    }
                    // Final partial line, flushed exactly once.
                    let mut raw = std::mem::take(&mut st.buffer);
                    if raw.last() == Some(&b'\r') {
                        raw.pop();
                    }
                    let line = String::from_utf8_lossy(&raw).into_owned();
                    st.shared.notify(ConnectionSignal::Data { bytes: line.len() });
                    return Some((Ok(line), st));
                }

                tokio::select! {
                    _ = st.cancel.cancelled() => {
                        // Cooperative abort: clean end of stream, never an
                        // error from here.
                        st.done = true;
                    }
                    chunk = st.body.next() => match chunk {
                        Some(Ok(bytes)) => st.buffer.extend_from_slice(&bytes),
                        Some(Err(e)) => {
                            st.done = true;
                            st.buffer.clear();
                            st.shared.transition(ConnectionState::Error);
                            st.shared.notify(ConnectionSignal::Error {
                                message: e.to_string(),
                            });
                            return Some((Err(e), st));
                        }
                        None => st.done = true,
                    }
                }
            }
        })))
    }

    /// Close the exchange. Idempotent: closing an already-closing or closed
    /// connection is a no-op.
    pub fn close(&self, code: Option<u16>, reason: Option<String>) -> Result<(), TransportError> {
        let state = self.state();
        if state.is_terminal() || state == ConnectionState::Closing {
            return Ok(());
        }

        self.shared.transition(ConnectionState::Closing);
        self.cancel.cancel();
        self.shared.transition(ConnectionState::Closed);
        self.shared.notify(ConnectionSignal::Close { code, reason });
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct LineState {
    body: ByteStream,
    buffer: Vec<u8>,
    done: bool,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

/// Drain a small error body for diagnostics, bounded.
async fn read_error_body(mut body: ByteStream) -> String {
    let mut collected = Vec::new();
    while let Some(Ok(bytes)) = body.next().await {
        collected.extend_from_slice(&bytes);
        if collected.len() >= 4096 {
            break;
        }
    }
    if collected.is_empty() {
        "unexpected status".to_string()
    } else {
        String::from_utf8_lossy(&collected[..collected.len().min(4096)]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockScript, MockTransport};
    use crate::error::TransportError;
    use bytes::Bytes;
    use std::time::Duration;

    fn connection(script: MockScript) -> Connection {
        Connection::new(
            Arc::new(MockTransport::new(script)),
            ConnectionConfig {
                retry_delay: Duration::from_millis(1),
                ..Default::default()
            },
        )
    }

    fn request() -> TransportRequest {
        TransportRequest::post("http://mock/v1/stream")
    }

    async fn drain(conn: &Connection) -> Vec<String> {
        let mut lines = conn.lines().unwrap();
        let mut out = Vec::new();
        while let Some(item) = lines.next().await {
            out.push(item.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_connect_happy_path() {
        let conn = connection(MockScript::sse(&["data: x\n\n"]));
        assert_eq!(conn.state(), ConnectionState::Idle);
        conn.connect(&request()).await.unwrap();
        assert!(conn.is_connected());
        assert!(!conn.is_streaming());
        assert_eq!(conn.response_meta().unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_connect_non_2xx_is_fatal() {
        let conn = connection(MockScript::sse(&["denied"]).with_status(403));
        let err = conn.connect(&request()).await.unwrap_err();
        match err {
            TransportError::HttpStatus { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "denied");
            }
            other => panic!("Expected HttpStatus, got {:?}", other),
        }
        assert_eq!(conn.state(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn test_connect_empty_body_is_fatal() {
        let conn = connection(MockScript {
            no_body: true,
            ..Default::default()
        });
        let err = conn.connect(&request()).await.unwrap_err();
        assert!(matches!(err, TransportError::EmptyBody));
        assert_eq!(conn.state(), ConnectionState::Error);
    }

    #[tokio::test]
    async fn test_connect_retries_retryable_failures() {
        let script = MockScript {
            connect_failures: 2,
            ..MockScript::sse(&["data: ok\n\n"])
        };
        let transport = Arc::new(MockTransport::new(script));
        let conn = Connection::new(
            Arc::clone(&transport) as Arc<dyn crate::traits::HttpTransport>,
            ConnectionConfig {
                max_retries: 2,
                retry_delay: Duration::from_millis(1),
                ..Default::default()
            },
        );
        conn.connect(&request()).await.unwrap();
        assert_eq!(transport.open_count(), 3);
    }

    #[tokio::test]
    async fn test_connect_retry_budget_exhausted() {
        let script = MockScript {
            connect_failures: 5,
            ..MockScript::sse(&["data: ok\n\n"])
        };
        let conn = Connection::new(
            Arc::new(MockTransport::new(script)),
            ConnectionConfig {
                max_retries: 1,
                retry_delay: Duration::from_millis(1),
                ..Default::default()
            },
        );
        let err = conn.connect(&request()).await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let conn = connection(MockScript::sse(&["data: hel", "lo\ndata: world\n", "\n"]));
        conn.connect(&request()).await.unwrap();
        let lines = drain(&conn).await;
        assert_eq!(lines, vec!["data: hello", "data: world", ""]);
    }

    #[tokio::test]
    async fn test_final_partial_line_flushed_once() {
        let conn = connection(MockScript::sse(&["data: a\ntail without newline"]));
        conn.connect(&request()).await.unwrap();
        let lines = drain(&conn).await;
        assert_eq!(lines, vec!["data: a", "tail without newline"]);
    }

    #[tokio::test]
    async fn test_lines_not_restartable() {
        let conn = connection(MockScript::sse(&["data: x\n\n"]));
        conn.connect(&request()).await.unwrap();
        let _first = conn.lines().unwrap();
        let second = conn.lines();
        assert!(matches!(second, Err(TransportError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_mid_stream_io_error_propagates_once() {
        let script = MockScript {
            chunks: vec![
                Ok(Bytes::from("data: a\n")),
                Err(TransportError::Io {
                    message: "connection reset".to_string(),
                }),
            ],
            ..Default::default()
        };
        let conn = connection(script);
        let mut signals = conn.subscribe();
        conn.connect(&request()).await.unwrap();

        let mut lines = conn.lines().unwrap();
        assert_eq!(lines.next().await.unwrap().unwrap(), "data: a");
        assert!(lines.next().await.unwrap().is_err());
        assert!(lines.next().await.is_none());
        assert_eq!(conn.state(), ConnectionState::Error);

        let mut error_signals = 0;
        while let Ok(signal) = signals.try_recv() {
            if matches!(signal, ConnectionSignal::Error { .. }) {
                error_signals += 1;
            }
        }
        assert_eq!(error_signals, 1);
    }

    #[tokio::test]
    async fn test_cancellation_ends_stream_cleanly() {
        let script = MockScript {
            chunk_delay: Some(Duration::from_secs(60)),
            ..MockScript::sse(&["data: never\n\n"])
        };
        let conn = connection(script);
        conn.connect(&request()).await.unwrap();

        let cancel = conn.cancel_token();
        let mut lines = conn.lines().unwrap();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });

        // No error item: cancellation is a normal close path.
        assert!(lines.next().await.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let conn = connection(MockScript::sse(&["data: x\n\n"]));
        conn.connect(&request()).await.unwrap();
        conn.close(Some(1000), Some("bye".to_string())).unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);
        conn.close(None, None).unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_close_emits_single_close_signal() {
        let conn = connection(MockScript::sse(&[]));
        let mut signals = conn.subscribe();
        conn.connect(&request()).await.unwrap();
        conn.close(None, None).unwrap();
        conn.close(None, None).unwrap();

        let mut close_signals = 0;
        while let Ok(signal) = signals.try_recv() {
            if matches!(signal, ConnectionSignal::Close { .. }) {
                close_signals += 1;
            }
        }
        assert_eq!(close_signals, 1);
    }

    #[tokio::test]
    async fn test_connect_twice_rejected() {
        let conn = connection(MockScript::sse(&["data: x\n\n"]));
        conn.connect(&request()).await.unwrap();
        let err = conn.connect(&request()).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_open_signal_delivered() {
        let conn = connection(MockScript::sse(&[]));
        let mut signals = conn.subscribe();
        conn.connect(&request()).await.unwrap();
        assert_eq!(
            signals.recv().await,
            Some(ConnectionSignal::Open { status: 200 })
        );
    }
}
