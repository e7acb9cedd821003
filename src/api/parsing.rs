use serde::Deserialize;
use serde_json::Value;

use crate::core::config::AppConfig;
use crate::core::models::{ChatMessage, RequestSpec, Role, SamplingOverrides, Transcript};
use crate::errors::RelayError;

/// Validated body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub sampling: SamplingOverrides,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: Role,
    content: String,
    #[serde(default)]
    timestamp: Option<i64>,
}

impl ChatRequest {
    /// Fills provider, model and sampling defaults from configuration.
    #[must_use]
    pub fn resolve_spec(&self, config: &AppConfig) -> RequestSpec {
        RequestSpec {
            provider: self
                .provider
                .clone()
                .unwrap_or_else(|| config.active_provider.clone()),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| config.default_model.clone()),
            sampling: self.sampling.or(config.sampling),
        }
    }

    /// Builds the transcript, prefixed with the configured system prompt.
    #[must_use]
    pub fn into_transcript(self, config: &AppConfig) -> Transcript {
        Transcript::new(config.system_prompt.clone(), self.messages)
    }
}

/// Parses and validates a chat request body.
///
/// # Errors
///
/// Returns an error if the body is not JSON, if `messages` is missing or not
/// an array, or if any message has an unknown role or no text content.
pub fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, RelayError> {
    let payload: Value = serde_json::from_slice(body).map_err(RelayError::InvalidBody)?;

    let raw_messages = payload
        .get("messages")
        .and_then(Value::as_array)
        .ok_or(RelayError::InvalidMessages)?;

    let messages = raw_messages
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let msg = IncomingMessage::deserialize(raw).map_err(|e| RelayError::InvalidMessage {
                index,
                reason: e.to_string(),
            })?;
            Ok(match msg.timestamp {
                Some(ts) => ChatMessage::with_timestamp(msg.role, msg.content, ts),
                None => ChatMessage::new(msg.role, msg.content),
            })
        })
        .collect::<Result<Vec<_>, RelayError>>()?;

    Ok(ChatRequest {
        messages,
        provider: non_empty_str(&payload, "provider"),
        model: non_empty_str(&payload, "model"),
        sampling: SamplingOverrides {
            temperature: payload.get("temperature").and_then(Value::as_f64).map(|v| v as f32),
            max_tokens: payload
                .get("max_tokens")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok()),
            top_p: payload.get("top_p").and_then(Value::as_f64).map(|v| v as f32),
        },
    })
}

fn non_empty_str(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
