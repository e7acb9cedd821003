//! Dispatch of a request to the backend named by its identifier.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{EventStream, FailureKind, NormalizedEvent};
use super::providers::openrouter::Attribution;
use super::providers::{
    ChatProvider, HttpSettings, OllamaProvider, OpenAiProvider, OpenRouterProvider, single_event,
};
use crate::core::config::AppConfig;
use crate::core::models::{RequestSpec, Transcript};
use crate::errors::RelayError;

/// Registered backends, keyed by identifier.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn ChatProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_ids())
            .finish()
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in OpenAI, OpenRouter and Ollama adapters.
    pub fn from_config(config: &AppConfig) -> Result<Self, RelayError> {
        let http = HttpSettings::from_config(config)?;

        let mut registry = Self::new();
        registry.register(Arc::new(OpenAiProvider::new(
            http.clone(),
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
        )));
        registry.register(Arc::new(OpenRouterProvider::new(
            http.clone(),
            config.openrouter_base_url.clone(),
            config.openrouter_api_key.clone(),
            Attribution {
                referer: config.openrouter_referer.clone(),
                title: config.openrouter_title.clone(),
            },
        )));
        registry.register(Arc::new(OllamaProvider::new(
            http,
            config.ollama_base_url.clone(),
        )));
        Ok(registry)
    }

    /// Adds a backend, replacing any previous one with the same identifier.
    pub fn register(&mut self, provider: Arc<dyn ChatProvider>) {
        self.providers.insert(provider.id(), provider);
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    #[must_use]
    pub fn provider_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.providers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Routes the request to its backend.
    ///
    /// The returned stream is lazy: nothing touches the network until it is
    /// first polled. An unknown identifier yields a single configuration
    /// failure and never opens a connection.
    #[must_use]
    pub fn dispatch(
        &self,
        transcript: Transcript,
        spec: RequestSpec,
        cancel: CancellationToken,
    ) -> EventStream {
        let Some(provider) = self.providers.get(spec.provider.as_str()).map(Arc::clone) else {
            warn!(provider = %spec.provider, "Unsupported provider requested");
            return single_event(NormalizedEvent::failure(
                FailureKind::Configuration,
                format!("Unsupported provider: {}", spec.provider),
            ));
        };

        info!(provider = provider.id(), model = %spec.model, "Dispatching chat request");
        #[cfg(feature = "debug-logs")]
        debug!(transcript = ?transcript.wire_messages(), "Transcript sent upstream");
        #[cfg(not(feature = "debug-logs"))]
        debug!(
            messages = transcript.messages().len(),
            "Transcript sent upstream: [content masked, enable debug-logs feature to view]"
        );
        futures::stream::once(async move {
            provider.open_stream(&transcript, &spec, cancel).await
        })
        .flatten()
        .boxed()
    }
}
