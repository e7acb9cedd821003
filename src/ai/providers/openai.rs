//! Hosted OpenAI chat completions, authenticated with a bearer token.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::{ChatProvider, HttpSettings, send_streaming};
use crate::ai::events::EventStream;
use crate::ai::sse::SseDecoder;
use crate::core::config::endpoint;
use crate::core::models::{RequestSpec, Transcript, WireMessage};

pub const PROVIDER_ID: &str = "openai";

/// Request body shared by every OpenAI-compatible backend.
#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionsPayload<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl<'a> ChatCompletionsPayload<'a> {
    pub fn new(transcript: &'a Transcript, spec: &'a RequestSpec) -> Self {
        Self {
            model: &spec.model,
            messages: transcript.wire_messages(),
            stream: true,
            temperature: spec.sampling.temperature,
            max_tokens: spec.sampling.max_tokens,
            top_p: spec.sampling.top_p,
        }
    }
}

/// Builds a streaming `POST {base}/chat/completions` with bearer auth.
pub(crate) fn chat_completions_request(
    http: &HttpSettings,
    base_url: &Url,
    api_key: &str,
    payload: &ChatCompletionsPayload<'_>,
) -> RequestBuilder {
    http.client
        .post(endpoint(base_url, "chat/completions"))
        .header(AUTHORIZATION, format!("Bearer {api_key}"))
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "text/event-stream")
        .json(payload)
}

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http: HttpSettings,
    base_url: Url,
    api_key: String,
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(http: HttpSettings, base_url: Url, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn open_stream(
        &self,
        transcript: &Transcript,
        spec: &RequestSpec,
        cancel: CancellationToken,
    ) -> EventStream {
        let payload = ChatCompletionsPayload::new(transcript, spec);
        debug!(model = %spec.model, messages = payload.messages.len(), "Opening OpenAI stream");

        let request = chat_completions_request(&self.http, &self.base_url, &self.api_key, &payload);
        send_streaming("OpenAI", request, SseDecoder::default(), &self.http, cancel).await
    }
}
