//! # deck-api — Axum API Services for deckforge
//!
//! HTTP control surface over a deck: the same command set an embedded
//! agent uses (add, update, delete, reorder, duplicate, export, import,
//! undo, redo), plus locale overrides and live rendering of section code.
//!
//! ## API Surface
//!
//! | Prefix                          | Module               | Domain                 |
//! |---------------------------------|----------------------|------------------------|
//! | `/v1/sections/*`                | [`routes::sections`] | Section CRUD, ordering |
//! | `/v1/sections/{id}/locales/*`   | [`routes::locales`]  | Locale overrides       |
//! | `/v1/sections/{id}/render*`     | [`routes::render`]   | Live rendering         |
//! | `/v1/deck/render`               | [`routes::render`]   | Live rendering         |
//! | `/v1/deck/*`                    | [`routes::deck`]     | Export/import, history |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Auto-generated OpenAPI 3.1 spec via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
///
/// Health checks (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::sections::router())
        .merge(routes::locales::router())
        .merge(routes::render::router())
        .merge(routes::deck::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state);

    // Unauthenticated health checks.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Prometheus scrape endpoint at `/metrics`, outside authentication.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        axum::routing::get(move || std::future::ready(handle.render())),
    )
}

/// Liveness check: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
