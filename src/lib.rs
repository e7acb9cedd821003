//! # Anima
//!
//! A streaming relay between a chat client and several LLM backends.
//!
//! A chat request names a backend (`openai`, `openrouter` or `ollama`), a
//! model and a conversation. The relay opens a streaming request to that
//! backend, decodes whatever wire format it speaks into a common event
//! stream, and forwards the events to the client as server-sent events.
//!
//! ## Architecture
//!
//! - [`ai`] - upstream side: line decoders, provider adapters, dispatch
//! - [`api`] - client side: HTTP routes, request parsing, the relay encoder
//! - [`core`] - configuration and conversation models
//! - [`errors`] - errors raised before a stream is opened
//!
//! ## Example
//!
//! ```rust,no_run
//! use anima::{AppConfig, AppState, ProviderRegistry, build_router};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! anima::setup_logging();
//!
//! let config = AppConfig::from_env()?;
//! let registry = ProviderRegistry::from_config(&config)?;
//! let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
//!
//! let app = build_router(AppState::new(config, registry, CancellationToken::new()));
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod api;
pub mod core;
pub mod errors;

pub use ai::{EventStream, FailureKind, NormalizedEvent, ProviderRegistry};
pub use api::{AppState, build_router};
pub use crate::core::config::AppConfig;
pub use errors::RelayError;

/// Installs the global JSON tracing subscriber.
///
/// Verbosity comes from `RUST_LOG` and defaults to `info`. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// anima::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
