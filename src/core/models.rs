use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single turn of a conversation. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    role: Role,
    content: String,
    /// Creation time in epoch milliseconds.
    timestamp: i64,
}

impl ChatMessage {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self::with_timestamp(role, content, chrono::Utc::now().timestamp_millis())
    }

    #[must_use]
    pub fn with_timestamp(role: Role, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Role/content pair as every backend expects it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WireMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

/// Ordered conversation sent to a backend for one generation request.
///
/// Always starts with exactly one synthesized `system` message carrying the
/// configured system prompt, followed by the caller's history in the order
/// it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    #[must_use]
    pub fn new(system_prompt: impl Into<String>, history: Vec<ChatMessage>) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::new(Role::System, system_prompt));
        messages.extend(history);
        Self { messages }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages stripped down to the role/content pairs sent upstream.
    /// Timestamps are not part of any backend protocol.
    #[must_use]
    pub fn wire_messages(&self) -> Vec<WireMessage<'_>> {
        self.messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect()
    }
}

/// Sampling parameters forwarded to the backend when set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingOverrides {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

impl SamplingOverrides {
    /// Fills every unset field from `defaults`.
    #[must_use]
    pub fn or(self, defaults: Self) -> Self {
        Self {
            temperature: self.temperature.or(defaults.temperature),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            top_p: self.top_p.or(defaults.top_p),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.max_tokens.is_none() && self.top_p.is_none()
    }
}

/// Which backend and model to use for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub provider: String,
    pub model: String,
    pub sampling: SamplingOverrides,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_starts_with_system_prompt() {
        let history = vec![
            ChatMessage::with_timestamp(Role::User, "hi", 1),
            ChatMessage::with_timestamp(Role::Assistant, "hello", 2),
            ChatMessage::with_timestamp(Role::User, "how are you?", 3),
        ];

        let transcript = Transcript::new("Be brief.", history);

        let roles: Vec<Role> = transcript.messages().iter().map(ChatMessage::role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(transcript.messages()[0].content(), "Be brief.");
    }

    #[test]
    fn test_transcript_with_empty_history_is_not_empty() {
        let transcript = Transcript::new("prompt", Vec::new());
        assert_eq!(transcript.messages().len(), 1);
        assert_eq!(transcript.messages()[0].role(), Role::System);
    }

    #[test]
    fn test_wire_messages_strip_timestamps() {
        let transcript = Transcript::new(
            "sys",
            vec![ChatMessage::with_timestamp(Role::User, "ping", 42)],
        );

        let wire = serde_json::to_value(transcript.wire_messages()).unwrap();
        assert_eq!(
            wire,
            serde_json::json!([
                {"role": "system", "content": "sys"},
                {"role": "user", "content": "ping"}
            ])
        );
    }

    #[test]
    fn test_role_deserializes_lowercase() {
        let role: Role = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(role, Role::Assistant);
        assert!(serde_json::from_str::<Role>("\"tool\"").is_err());
    }

    #[test]
    fn test_sampling_overrides_fall_back_to_defaults() {
        let defaults = SamplingOverrides {
            temperature: Some(0.7),
            max_tokens: Some(2048),
            top_p: Some(1.0),
        };
        let request = SamplingOverrides {
            temperature: Some(0.1),
            ..SamplingOverrides::default()
        };

        let merged = request.or(defaults);
        assert_eq!(merged.temperature, Some(0.1));
        assert_eq!(merged.max_tokens, Some(2048));
        assert_eq!(merged.top_p, Some(1.0));
        assert!(SamplingOverrides::default().is_empty());
        assert!(!merged.is_empty());
    }
}
