//! Local Ollama server: unauthenticated, newline-delimited JSON stream.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::{ChatProvider, HttpSettings, send_streaming};
use crate::ai::events::EventStream;
use crate::ai::ndjson::NdjsonDecoder;
use crate::core::config::endpoint;
use crate::core::models::{RequestSpec, Transcript, WireMessage};

pub const PROVIDER_ID: &str = "ollama";

#[derive(Debug, Serialize)]
struct OllamaChatPayload<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

impl<'a> OllamaChatPayload<'a> {
    fn new(transcript: &'a Transcript, spec: &'a RequestSpec) -> Self {
        let sampling = spec.sampling;
        let options = (!sampling.is_empty()).then_some(OllamaOptions {
            temperature: sampling.temperature,
            num_predict: sampling.max_tokens,
            top_p: sampling.top_p,
        });
        Self {
            model: &spec.model,
            messages: transcript.wire_messages(),
            stream: true,
            options,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    http: HttpSettings,
    base_url: Url,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(http: HttpSettings, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn open_stream(
        &self,
        transcript: &Transcript,
        spec: &RequestSpec,
        cancel: CancellationToken,
    ) -> EventStream {
        let payload = OllamaChatPayload::new(transcript, spec);
        debug!(model = %spec.model, messages = payload.messages.len(), "Opening Ollama stream");

        let request = self
            .http
            .client
            .post(endpoint(&self.base_url, "api/chat"))
            .header(CONTENT_TYPE, "application/json")
            .json(&payload);
        send_streaming("Ollama", request, NdjsonDecoder::default(), &self.http, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ChatMessage, Role, SamplingOverrides};

    fn spec(sampling: SamplingOverrides) -> RequestSpec {
        RequestSpec {
            provider: PROVIDER_ID.to_string(),
            model: "llama3".to_string(),
            sampling,
        }
    }

    #[test]
    fn test_payload_maps_sampling_to_options() {
        let transcript = Transcript::new("sys", vec![ChatMessage::new(Role::User, "hi")]);
        let spec = spec(SamplingOverrides {
            temperature: Some(0.25),
            max_tokens: Some(128),
            top_p: None,
        });

        let json = serde_json::to_value(OllamaChatPayload::new(&transcript, &spec)).unwrap();

        assert_eq!(json["model"], "llama3");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][1], serde_json::json!({"role": "user", "content": "hi"}));
        assert_eq!(
            json["options"],
            serde_json::json!({"temperature": 0.25, "num_predict": 128})
        );
    }

    #[test]
    fn test_payload_omits_empty_options() {
        let transcript = Transcript::new("sys", Vec::new());
        let spec = spec(SamplingOverrides::default());

        let json = serde_json::to_value(OllamaChatPayload::new(&transcript, &spec)).unwrap();

        assert!(json.get("options").is_none());
    }
}
