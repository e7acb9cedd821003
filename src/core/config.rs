use std::env;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::core::models::SamplingOverrides;
use crate::errors::RelayError;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENROUTER_REFERER: &str = "http://localhost:3000";
pub const DEFAULT_OPENROUTER_TITLE: &str = "Anima";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TOP_P: f32 = 1.0;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub active_provider: String,
    pub default_model: String,
    pub system_prompt: String,
    pub sampling: SamplingOverrides,
    pub openai_api_key: String,
    pub openai_base_url: Url,
    pub openrouter_api_key: String,
    pub openrouter_base_url: Url,
    pub openrouter_referer: String,
    pub openrouter_title: String,
    pub ollama_base_url: Url,
    /// Time allowed to connect and receive response headers.
    pub connect_timeout: Duration,
    /// Longest silence tolerated between two reads of an upstream body.
    pub idle_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Configuration with every value at its default.
    pub fn defaults() -> Result<Self, RelayError> {
        Self::from_lookup(|_| None)
    }

    /// Builds the configuration from an arbitrary key lookup, falling back to
    /// defaults for anything unset or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            bind_addr: text("ANIMA_BIND_ADDR", DEFAULT_BIND_ADDR),
            active_provider: text("ANIMA_ACTIVE_PROVIDER", DEFAULT_PROVIDER),
            default_model: text("ANIMA_DEFAULT_MODEL", DEFAULT_MODEL),
            system_prompt: text("ANIMA_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            sampling: SamplingOverrides {
                temperature: Some(parse_or(get("ANIMA_TEMPERATURE"), "ANIMA_TEMPERATURE", DEFAULT_TEMPERATURE)?),
                max_tokens: Some(parse_or(get("ANIMA_MAX_TOKENS"), "ANIMA_MAX_TOKENS", DEFAULT_MAX_TOKENS)?),
                top_p: Some(parse_or(get("ANIMA_TOP_P"), "ANIMA_TOP_P", DEFAULT_TOP_P)?),
            },
            openai_api_key: text("OPENAI_API_KEY", ""),
            openai_base_url: parse_url(get("OPENAI_BASE_URL"), "OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)?,
            openrouter_api_key: text("OPENROUTER_API_KEY", ""),
            openrouter_base_url: parse_url(
                get("OPENROUTER_BASE_URL"),
                "OPENROUTER_BASE_URL",
                DEFAULT_OPENROUTER_BASE_URL,
            )?,
            openrouter_referer: text("OPENROUTER_REFERER", DEFAULT_OPENROUTER_REFERER),
            openrouter_title: text("OPENROUTER_TITLE", DEFAULT_OPENROUTER_TITLE),
            ollama_base_url: parse_url(get("OLLAMA_BASE_URL"), "OLLAMA_BASE_URL", DEFAULT_OLLAMA_BASE_URL)?,
            connect_timeout: Duration::from_secs(parse_or(
                get("ANIMA_CONNECT_TIMEOUT_SECS"),
                "ANIMA_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?),
            idle_timeout: Duration::from_secs(parse_or(
                get("ANIMA_IDLE_TIMEOUT_SECS"),
                "ANIMA_IDLE_TIMEOUT_SECS",
                DEFAULT_IDLE_TIMEOUT_SECS,
            )?),
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, RelayError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| RelayError::ConfigError(format!("{}: {}", key, e))),
        None => Ok(default),
    }
}

fn parse_url(raw: Option<String>, key: &str, default: &str) -> Result<Url, RelayError> {
    let value = raw.unwrap_or_else(|| default.to_string());
    Url::parse(value.trim()).map_err(|e| RelayError::ConfigError(format!("{}: {}", key, e)))
}

/// Joins an endpoint path onto a configured base URL without dropping the
/// base's last path segment (`Url::join` would replace `/v1`).
#[must_use]
pub fn endpoint(base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.active_provider, "openai");
        assert_eq!(config.default_model, "gpt-3.5-turbo");
        assert_eq!(config.sampling.max_tokens, Some(2048));
        assert_eq!(config.ollama_base_url.as_str(), "http://localhost:11434/");
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert!(config.openai_api_key.is_empty());
    }

    #[test]
    fn test_values_are_read_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("ANIMA_ACTIVE_PROVIDER", "ollama"),
            ("ANIMA_DEFAULT_MODEL", "llama3"),
            ("ANIMA_TEMPERATURE", "0.2"),
            ("ANIMA_IDLE_TIMEOUT_SECS", "5"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434"),
        ]))
        .unwrap();

        assert_eq!(config.active_provider, "ollama");
        assert_eq!(config.default_model, "llama3");
        assert_eq!(config.sampling.temperature, Some(0.2));
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.ollama_base_url.host_str(), Some("gpu-box"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("ANIMA_DEFAULT_MODEL", "  ")])).unwrap();
        assert_eq!(config.default_model, DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = AppConfig::from_lookup(lookup_from(&[("ANIMA_MAX_TOKENS", "lots")])).unwrap_err();
        assert!(err.to_string().contains("ANIMA_MAX_TOKENS"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("OPENAI_BASE_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, RelayError::ConfigError(ref m) if m.contains("OPENAI_BASE_URL")));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let base = Url::parse("https://api.openai.com/v1").unwrap();
        assert_eq!(
            endpoint(&base, "chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );

        let base = Url::parse("http://localhost:11434").unwrap();
        assert_eq!(endpoint(&base, "/api/chat"), "http://localhost:11434/api/chat");
    }
}
