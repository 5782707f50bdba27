//! # deck-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the deck control surface.
//! Configuration comes from `DECK_*` environment variables (port 8080 and
//! `./data` by default).

use anyhow::Context;
use deck_api::state::{AppConfig, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("reading DECK_* configuration")?;
    tracing::info!(?config, "configuration loaded");
    if config.auth_token.is_none() {
        tracing::warn!("DECK_AUTH_TOKEN not set; API is unauthenticated");
    }

    let recorder = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let port = config.port;
    let state = AppState::open(config);
    let app = deck_api::app(state).merge(deck_api::metrics_router(recorder));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("deck API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
