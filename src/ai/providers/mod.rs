//! Provider adapters: one per backend, all producing the same event stream.
//!
//! Adapters never return errors. Connection failures, non-success statuses
//! and unreadable bodies are all delivered as a `Failure` event on the
//! returned stream.

pub mod ollama;
pub mod openai;
pub mod openrouter;

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{RequestBuilder, Response};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::decoder::{ChunkDecoder, LineInterpreter};
use super::events::{EventStream, FailureKind, NormalizedEvent};
use super::stream::UpstreamEvents;
use crate::core::config::AppConfig;
use crate::core::models::{RequestSpec, Transcript};
use crate::errors::RelayError;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;

/// Longest upstream error body quoted in a failure message.
const ERROR_BODY_EXCERPT_CHARS: usize = 512;

/// A backend that can stream a chat completion.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Identifier used to select this backend (`"openai"`, `"ollama"`, ...).
    fn id(&self) -> &'static str;

    /// Opens one streaming request and returns its normalized events.
    async fn open_stream(
        &self,
        transcript: &Transcript,
        spec: &RequestSpec,
        cancel: CancellationToken,
    ) -> EventStream;
}

/// HTTP client and timeouts shared by every adapter.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub client: reqwest::Client,
    /// Bounds connecting and receiving response headers.
    pub connect_timeout: Duration,
    /// Bounds each read of the response body.
    pub idle_timeout: Duration,
}

impl HttpSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            connect_timeout: config.connect_timeout,
            idle_timeout: config.idle_timeout,
        })
    }
}

/// Returns a stream holding exactly one event.
#[must_use]
pub fn single_event(event: NormalizedEvent) -> EventStream {
    futures::stream::iter([event]).boxed()
}

/// Sends `request` and, on success, streams its body through `decoder`.
///
/// Every failure before the body is reached is turned into a single
/// `Failure` event; the decode loop is never entered for those.
pub(crate) async fn send_streaming<I>(
    provider: &'static str,
    request: RequestBuilder,
    decoder: ChunkDecoder<I>,
    http: &HttpSettings,
    cancel: CancellationToken,
) -> EventStream
where
    I: LineInterpreter + 'static,
{
    let sent = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            info!(provider, "Request cancelled before the upstream responded");
            return single_event(NormalizedEvent::failure(FailureKind::Cancelled, "Request cancelled"));
        }
        sent = tokio::time::timeout(http.connect_timeout, request.send()) => sent,
    };

    let response = match sent {
        Ok(Ok(response)) => response,
        Ok(Err(e)) if e.is_timeout() => {
            warn!(provider, error = %e, "Upstream request timed out");
            return single_event(NormalizedEvent::failure(
                FailureKind::Timeout,
                format!("{provider} request timed out: {e}"),
            ));
        }
        Ok(Err(e)) => {
            warn!(provider, error = %e, "Failed to reach upstream");
            return single_event(NormalizedEvent::failure(
                FailureKind::Connection,
                format!("Failed to reach {provider}: {e}"),
            ));
        }
        Err(_) => {
            warn!(provider, "Upstream did not respond in time");
            return single_event(NormalizedEvent::failure(
                FailureKind::Timeout,
                format!(
                    "{provider} did not respond within {} seconds",
                    http.connect_timeout.as_secs()
                ),
            ));
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = read_error_body(response, http.idle_timeout).await;
        warn!(provider, status = %status, "Upstream returned an error status");
        return single_event(NormalizedEvent::failure(
            FailureKind::UpstreamStatus,
            format!("{provider} API error (status {status}): {body}"),
        ));
    }

    info!(provider, status = %status, "Upstream stream opened");
    UpstreamEvents::new(
        provider,
        Box::pin(response.bytes_stream()),
        decoder,
        cancel,
        http.idle_timeout,
    )
    .into_stream()
}

async fn read_error_body(response: Response, limit: Duration) -> String {
    let text = match tokio::time::timeout(limit, response.text()).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return format!("<unreadable body: {e}>"),
        Err(_) => return "<body read timed out>".to_string(),
    };

    let trimmed = text.trim();
    if trimmed.chars().count() > ERROR_BODY_EXCERPT_CHARS {
        let head: String = trimmed.chars().take(ERROR_BODY_EXCERPT_CHARS).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}
