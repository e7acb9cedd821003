//! HTTP surface of the relay.
//!
//! - `POST /api/chat` streams a completion as `text/event-stream`
//! - `GET /api/providers` lists the registered backends
//! - `GET /health` liveness probe

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::parsing::parse_chat_request;
use super::relay::RelayStream;
use crate::ai::router::ProviderRegistry;
use crate::core::config::AppConfig;

/// Shared state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<ProviderRegistry>,
    /// Cancelled on server shutdown; each chat request runs under a child.
    pub shutdown: CancellationToken,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, registry: ProviderRegistry, shutdown: CancellationToken) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            shutdown,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/providers", get(providers))
        .route("/health", get(health))
        .with_state(state)
}

/// Relays one chat completion.
///
/// Validation failures are answered with a plain JSON 400 before any stream
/// is opened. Once the stream starts, every failure is delivered in-band as
/// an error frame and the response status stays 200.
#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_chat_request(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected chat request");
            return e.into_response();
        }
    };

    let spec = request.resolve_spec(&state.config);
    info!(
        provider = %spec.provider,
        model = %spec.model,
        messages = request.messages.len(),
        "Chat request received"
    );
    let transcript = request.into_transcript(&state.config);

    let cancel = state.shutdown.child_token();
    let events = state.registry.dispatch(transcript, spec, cancel.clone());
    let relay = RelayStream::new(events).with_cancel_guard(cancel.drop_guard());

    (
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(relay),
    )
        .into_response()
}

pub async fn providers(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "providers": state.registry.provider_ids(),
        "active_provider": state.config.active_provider,
        "default_model": state.config.default_model,
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
