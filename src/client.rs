//! Public client for the agent backend streaming API.
//!
//! The plugin boundary: external collaborators call [`SluiceClient::send_message`]
//! with a prompt and options and receive results only through the legacy
//! callback surface. They contain no protocol logic.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::adapters::ReqwestTransport;
use crate::callbacks::{NoopCallbacks, StreamCallbacks};
use crate::config::SluiceConfig;
use crate::error::TransportError;
use crate::exchange::{ExchangeOutcome, StreamExchange};
use crate::pipeline::HandlerPipeline;
use crate::request::{SendOptions, StreamRequest};
use crate::traits::{HttpTransport, TransportRequest};

/// Client for one backend, shared across exchanges.
///
/// Holds the process-wide handler registry and the current callback set;
/// each `send_message` call runs as its own exchange with no shared mutable
/// state beyond the registry.
pub struct SluiceClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    pipeline: HandlerPipeline,
    callbacks: RwLock<Arc<dyn StreamCallbacks>>,
    config: SluiceConfig,
    auth_token: Option<String>,
}

impl SluiceClient {
    /// Client over the production reqwest transport.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(base_url, Arc::new(ReqwestTransport::new()))
    }

    /// Client over a custom transport (tests, instrumentation).
    pub fn with_transport(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            pipeline: HandlerPipeline::new(SluiceConfig::default().pipeline),
            callbacks: RwLock::new(Arc::new(NoopCallbacks)),
            config: SluiceConfig::default(),
            auth_token: None,
        }
    }

    pub fn with_config(mut self, config: SluiceConfig) -> Self {
        self.pipeline = HandlerPipeline::new(config.pipeline.clone());
        self.config = config;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The shared handler registry. Mutations are visible to the next
    /// pipeline pass of any in-flight exchange.
    pub fn pipeline(&self) -> &HandlerPipeline {
        &self.pipeline
    }

    /// Replace the callback set used by subsequent exchanges.
    pub fn set_callbacks(&self, callbacks: Arc<dyn StreamCallbacks>) {
        *self.callbacks.write().expect("callback set poisoned") = callbacks;
    }

    fn callbacks(&self) -> Arc<dyn StreamCallbacks> {
        Arc::clone(&self.callbacks.read().expect("callback set poisoned"))
    }

    /// Build the exchange for one message without running it, so the caller
    /// can grab the cancellation handle or connection first.
    pub fn prepare(
        &self,
        prompt: &str,
        options: &SendOptions,
    ) -> Result<(StreamExchange, TransportRequest), TransportError> {
        let mut body = StreamRequest::new(prompt);
        body.thread_id = options.thread_id.clone();
        body.metadata = options.metadata.clone();

        let json = serde_json::to_string(&body).map_err(|e| TransportError::Io {
            message: format!("request body serialization failed: {}", e),
        })?;

        let mut request = TransportRequest::post(format!("{}/v1/stream", self.base_url))
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "text/event-stream")
            .with_header("Cache-Control", "no-cache")
            .with_body(json);

        if let Some(method) = &options.method {
            request.method = method.clone();
        }
        if let Some(token) = options.auth_token.as_ref().or(self.auth_token.as_ref()) {
            request
                .headers
                .insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        for (name, value) in &options.headers {
            request.headers.insert(name.clone(), value.clone());
        }

        let exchange = StreamExchange::new(
            Arc::clone(&self.transport),
            self.callbacks(),
            self.pipeline.clone(),
            &self.config,
        );
        Ok((exchange, request))
    }

    /// Send one message and drive the exchange to its single resolution.
    /// Results are also delivered through the callback surface; the returned
    /// outcome mirrors the terminal callback.
    pub async fn send_message(&self, prompt: &str, options: SendOptions) -> ExchangeOutcome {
        match self.prepare(prompt, &options) {
            Ok((exchange, request)) => {
                debug!(url = %request.url, "starting exchange");
                exchange.run(&request).await
            }
            Err(e) => ExchangeOutcome::Failed(crate::error::SluiceError::from(e).to_error_info()),
        }
    }
}
