//! OpenRouter: OpenAI-compatible wire format plus attribution headers.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::openai::{ChatCompletionsPayload, chat_completions_request};
use super::{ChatProvider, HttpSettings, send_streaming};
use crate::ai::events::EventStream;
use crate::ai::sse::SseDecoder;
use crate::core::models::{RequestSpec, Transcript};

pub const PROVIDER_ID: &str = "openrouter";

/// App attribution sent with every OpenRouter request.
#[derive(Debug, Clone)]
pub struct Attribution {
    pub referer: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    http: HttpSettings,
    base_url: Url,
    api_key: String,
    attribution: Attribution,
}

impl OpenRouterProvider {
    #[must_use]
    pub fn new(http: HttpSettings, base_url: Url, api_key: String, attribution: Attribution) -> Self {
        Self {
            http,
            base_url,
            api_key,
            attribution,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
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
        debug!(model = %spec.model, messages = payload.messages.len(), "Opening OpenRouter stream");

        let request = chat_completions_request(&self.http, &self.base_url, &self.api_key, &payload)
            .header("HTTP-Referer", &self.attribution.referer)
            .header("X-Title", &self.attribution.title);
        send_streaming("OpenRouter", request, SseDecoder::default(), &self.http, cancel).await
    }
}
