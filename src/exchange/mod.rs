//! Orchestration of one request/response exchange.
//!
//! Wires transport → framer → normalizer → pipeline → callback adapter and
//! exposes a single awaitable resolution. Several signals race to terminate
//! the exchange (`run_finished`, the `[DONE]` sentinel, natural stream end,
//! a backend error, abort); the completion latch guarantees exactly one of
//! them wins, and the connection is closed exactly once.

mod latch;

pub use latch::{CompletionLatch, ExchangeOutcome};

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::callbacks::{CallbackAdapter, StreamCallbacks, StreamComplete};
use crate::config::SluiceConfig;
use crate::connection::{Connection, ConnectionState};
use crate::error::{SluiceError, TransportError};
use crate::event::{ErrorInfo, EventNormalizer};
use crate::framer::{FramedRecord, SseFramer};
use crate::pipeline::{EventHandler, HandlerPipeline};
use crate::traits::{HttpTransport, TransportRequest};

/// One logical exchange: owns the connection for its whole lifetime.
pub struct StreamExchange {
    connection: Arc<Connection>,
    framer: SseFramer,
    normalizer: EventNormalizer,
    pipeline: HandlerPipeline,
    adapter: Arc<CallbackAdapter>,
    latch: Arc<CompletionLatch>,
    latch_rx: oneshot::Receiver<ExchangeOutcome>,
    /// Framer strict mode doubles as the abort-on-protocol-error switch.
    strict: bool,
}

impl StreamExchange {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        callbacks: Arc<dyn StreamCallbacks>,
        pipeline: HandlerPipeline,
        config: &SluiceConfig,
    ) -> Self {
        let (latch, latch_rx) = CompletionLatch::new();
        let adapter = Arc::new(CallbackAdapter::new(callbacks, Arc::clone(&latch)));
        Self {
            connection: Arc::new(Connection::new(transport, config.connection.clone())),
            framer: SseFramer::new(config.framer.clone()),
            normalizer: EventNormalizer::new(config.normalizer.clone()),
            pipeline,
            adapter,
            latch,
            latch_rx,
            strict: config.framer.strict_mode,
        }
    }

    /// Handle for cooperative cancellation of this exchange.
    pub fn cancel_token(&self) -> tokio_util::sync::CancellationToken {
        self.connection.cancel_token()
    }

    /// The underlying connection, shareable so a caller can register
    /// listeners or initiate a close while the exchange is running.
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.connection)
    }

    /// The terminal adapter, for swapping callbacks mid-exchange.
    pub fn adapter(&self) -> &Arc<CallbackAdapter> {
        &self.adapter
    }

    /// Drive the exchange to its single resolution.
    ///
    /// Every termination path funnels through the latch: the winning signal
    /// reaches the callbacks, later ones are no-ops, and the connection is
    /// closed before the outcome is returned.
    pub async fn run(mut self, request: &TransportRequest) -> ExchangeOutcome {
        if let Err(e) = self.connection.connect(request).await {
            self.resolve_transport_error(e);
            return self.finish().await;
        }

        let mut lines = match self.connection.lines() {
            Ok(lines) => lines,
            Err(e) => {
                self.resolve_transport_error(e);
                return self.finish().await;
            }
        };

        let extras: Vec<Arc<dyn EventHandler>> =
            vec![Arc::clone(&self.adapter) as Arc<dyn EventHandler>];
        let mut last_thread: Option<String> = None;

        while let Some(item) = lines.next().await {
            match item {
                Ok(line) => match self.framer.feed_line(&line) {
                    Ok(Some(record)) => {
                        if !self.process_record(record, &extras, &mut last_thread).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "framing error");
                        if self.strict {
                            self.adapter
                                .resolve_error(SluiceError::from(e).to_error_info());
                            break;
                        }
                    }
                },
                Err(e) => {
                    self.resolve_transport_error(e);
                    break;
                }
            }
            if self.latch.is_fired() {
                break;
            }
        }
        drop(lines);

        // Natural end: flush the framer's trailing state.
        if !self.latch.is_fired() {
            for item in self.framer.finish() {
                if self.latch.is_fired() {
                    break;
                }
                match item {
                    Ok(record) => {
                        if !self.process_record(record, &extras, &mut last_thread).await {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "framing error at stream end");
                        if self.strict {
                            self.adapter
                                .resolve_error(SluiceError::from(e).to_error_info());
                            break;
                        }
                    }
                }
            }
        }

        if !self.latch.is_fired() {
            let cancelled = self.connection.cancel_token().is_cancelled();
            let caller_closed = self.connection.state() == ConnectionState::Closed;
            if cancelled && !caller_closed {
                // Abort before any completion signal: a genuine error.
                self.adapter
                    .resolve_error(SluiceError::Cancelled.to_error_info());
            } else {
                // Natural stream end (or caller-initiated close) counts as
                // completion.
                self.adapter.resolve_complete(StreamComplete {
                    thread_id: last_thread,
                    run_id: None,
                    message_id: None,
                });
            }
        }

        self.finish().await
    }

    /// Returns false when the drain loop should stop.
    async fn process_record(
        &mut self,
        record: FramedRecord,
        extras: &[Arc<dyn EventHandler>],
        last_thread: &mut Option<String>,
    ) -> bool {
        match self.normalizer.normalize_record(&record) {
            Ok(event) => {
                *last_thread = Some(event.thread_id.clone());
                let result = self.pipeline.process_with(&event, extras).await;
                if let Some(stats) = &result.stats {
                    debug!(
                        event_type = event.type_name(),
                        attempted = stats.attempted,
                        failed = stats.failed,
                        duration_ms = result.duration.as_millis() as u64,
                        "pipeline pass"
                    );
                }
                true
            }
            Err(e) => {
                warn!(error = %e, raw = e.raw_input().unwrap_or(""), "normalization error");
                if self.strict {
                    self.adapter
                        .resolve_error(SluiceError::from(e).to_error_info());
                    false
                } else {
                    true
                }
            }
        }
    }

    fn resolve_transport_error(&self, error: TransportError) {
        // A cancel that raced a caller-initiated close is a normal
        // termination, not an error.
        if matches!(error, TransportError::Cancelled)
            && self.connection.state() == ConnectionState::Closed
        {
            self.adapter.resolve_complete(StreamComplete::default());
            return;
        }
        self.adapter
            .resolve_error(SluiceError::from(error).to_error_info());
    }

    /// Close the connection exactly once and read the latched outcome.
    async fn finish(self) -> ExchangeOutcome {
        let _ = self.connection.close(None, None);
        match self.latch_rx.await {
            Ok(outcome) => outcome,
            Err(_) => ExchangeOutcome::Failed(ErrorInfo {
                code: "E_UNRESOLVED".to_string(),
                message: "exchange ended without a resolution".to_string(),
                details: None,
            }),
        }
    }
}
