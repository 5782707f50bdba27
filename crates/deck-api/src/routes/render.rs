//! # Live Render API
//!
//! Renders section code against resolved field values. Each section goes
//! through its own error boundary: a failing section answers 200 with
//! `status: "error"` and the fallback markup, and never affects its
//! siblings. Evaluation runs on the blocking pool.
//!
//! ## Endpoints
//!
//! - `GET /v1/sections/{id}/render?locale=` — render one section
//! - `POST /v1/sections/{id}/render/retry?locale=` — reset its boundary and render again
//! - `GET /v1/deck/render?locale=` — render every section in order

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use deck_render::SectionRender;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::middleware::metrics::SECTION_RENDERS_TOTAL;
use crate::routes::LocaleQuery;
use crate::state::AppState;

/// Result of rendering one section.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionRenderResponse {
    /// `{sectionId, status, nodes, html, error?}`.
    #[schema(value_type = Object)]
    pub result: SectionRender,
}

/// Result of rendering the whole deck.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeckRenderResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// One entry per section, in deck order.
    #[schema(value_type = Vec<Object>)]
    pub sections: Vec<SectionRender>,
    /// Number of sections showing their fallback.
    pub failed: usize,
    /// Complete deck markup.
    pub html: String,
}

/// Build the render router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sections/{id}/render", get(render_section))
        .route("/v1/sections/{id}/render/retry", post(retry_section))
        .route("/v1/deck/render", get(render_deck))
}

/// GET /v1/sections/{id}/render — Render one section.
#[utoipa::path(
    get,
    path = "/v1/sections/{id}/render",
    params(("id" = String, Path, description = "Section ID"), LocaleQuery),
    responses(
        (status = 200, description = "Rendered section or its fallback", body = SectionRenderResponse),
        (status = 404, description = "Section not found", body = crate::error::ErrorBody),
    ),
    tag = "render"
)]
pub(crate) async fn render_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<SectionRenderResponse>, AppError> {
    render_one(state, id, query, false).await
}

/// POST /v1/sections/{id}/render/retry — Reset the boundary and render again.
#[utoipa::path(
    post,
    path = "/v1/sections/{id}/render/retry",
    params(("id" = String, Path, description = "Section ID"), LocaleQuery),
    responses(
        (status = 200, description = "Rendered section or its fallback", body = SectionRenderResponse),
        (status = 404, description = "Section not found", body = crate::error::ErrorBody),
    ),
    tag = "render"
)]
pub(crate) async fn retry_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<SectionRenderResponse>, AppError> {
    render_one(state, id, query, true).await
}

async fn render_one(
    state: AppState,
    id: String,
    query: LocaleQuery,
    retry: bool,
) -> Result<Json<SectionRenderResponse>, AppError> {
    let locale = query.locale()?;
    let controller = state.controller()?;
    let section = controller.section(&id)?;
    let fields = controller.resolver().resolve(&section, locale.as_ref());
    let renderer = state.renderer.clone();

    let result = tokio::task::spawn_blocking(move || {
        if retry {
            renderer.retry(&section, &fields)
        } else {
            renderer.render_section(&section, &fields)
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("render task failed: {e}")))?;

    metrics::counter!(
        SECTION_RENDERS_TOTAL,
        "status" => if result.is_ok() { "ok" } else { "error" }
    )
    .increment(1);
    Ok(Json(SectionRenderResponse { result }))
}

/// GET /v1/deck/render — Render every section in order.
#[utoipa::path(
    get,
    path = "/v1/deck/render",
    params(LocaleQuery),
    responses(
        (status = 200, description = "Rendered deck", body = DeckRenderResponse),
        (status = 422, description = "Invalid locale", body = crate::error::ErrorBody),
    ),
    tag = "render"
)]
pub(crate) async fn render_deck(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<DeckRenderResponse>, AppError> {
    let locale = query.locale()?;
    let controller = state.controller()?;
    let sections = controller.sections();
    let resolver = controller.resolver();
    let renderer = state.renderer.clone();
    let resolve_locale = locale.clone();

    let rendered = tokio::task::spawn_blocking(move || {
        let resolved = resolver.resolve_all(&sections, resolve_locale.as_ref());
        renderer.render_deck(resolved)
    })
    .await
    .map_err(|e| AppError::Internal(format!("render task failed: {e}")))?;

    let failed = rendered.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        tracing::debug!(failed, total = rendered.len(), "deck rendered with fallbacks");
    }
    let html = rendered.iter().map(|r| r.html.as_str()).collect::<String>();
    Ok(Json(DeckRenderResponse {
        locale: locale.map(|l| l.as_str().to_string()),
        sections: rendered,
        failed,
        html,
    }))
}
