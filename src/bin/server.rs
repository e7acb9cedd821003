use anima::{AppConfig, AppState, ProviderRegistry, build_router};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    anima::setup_logging();

    let config = AppConfig::from_env()?;
    let registry = ProviderRegistry::from_config(&config)?;
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        active_provider = %config.active_provider,
        providers = ?registry.provider_ids(),
        "Relay listening"
    );

    let shutdown = CancellationToken::new();
    let app = build_router(AppState::new(config, registry, shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Relay stopped");
    Ok(())
}

/// Waits for Ctrl-C, then cancels every in-flight upstream request.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    shutdown.cancel();
}
