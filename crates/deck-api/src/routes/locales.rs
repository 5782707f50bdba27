//! # Locale Override API
//!
//! Per-locale field overrides of a section. Saving deep-merges the body
//! into the stored overrides; the effective values are read back through
//! `GET /v1/sections/{id}?locale=` or the render endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use deck_core::LocaleCode;
use deck_store::FieldOverrides;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::DeckJson;
use crate::state::AppState;

/// Overrides stored for one (section, locale) pair.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocaleOverridesResponse {
    pub section_id: String,
    pub locale: String,
    /// Field name to overriding value, after merging.
    #[schema(value_type = Object)]
    pub overrides: FieldOverrides,
}

/// Locales that carry overrides for a section.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocaleListResponse {
    pub section_id: String,
    pub locales: Vec<String>,
}

/// Build the locale overrides router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sections/{id}/locales", get(list_locales))
        .route(
            "/v1/sections/{id}/locales/{locale}",
            put(save_overrides).delete(clear_overrides),
        )
}

/// GET /v1/sections/{id}/locales — Locales with overrides.
#[utoipa::path(
    get,
    path = "/v1/sections/{id}/locales",
    params(("id" = String, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Locales with overrides", body = LocaleListResponse),
        (status = 404, description = "Section not found", body = crate::error::ErrorBody),
    ),
    tag = "locales"
)]
pub(crate) async fn list_locales(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LocaleListResponse>, AppError> {
    let controller = state.controller()?;
    controller.section(&id)?;
    let locales = controller.overrides().locales(&id);
    Ok(Json(LocaleListResponse {
        section_id: id,
        locales,
    }))
}

/// PUT /v1/sections/{id}/locales/{locale} — Merge overrides for a locale.
#[utoipa::path(
    put,
    path = "/v1/sections/{id}/locales/{locale}",
    params(
        ("id" = String, Path, description = "Section ID"),
        ("locale" = String, Path, description = "Locale code, e.g. \"fr\""),
    ),
    request_body(content = serde_json::Value, description = "Field name to overriding value"),
    responses(
        (status = 200, description = "Merged overrides", body = LocaleOverridesResponse),
        (status = 404, description = "Section not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid locale", body = crate::error::ErrorBody),
    ),
    tag = "locales"
)]
pub(crate) async fn save_overrides(
    State(state): State<AppState>,
    Path((id, locale)): Path<(String, String)>,
    DeckJson(overrides): DeckJson<FieldOverrides>,
) -> Result<Json<LocaleOverridesResponse>, AppError> {
    let locale = LocaleCode::new(locale)?;
    let merged = state
        .controller()?
        .set_locale_override(&id, &locale, overrides)?;
    tracing::debug!(section_id = %id, locale = locale.as_str(), "locale overrides saved");
    Ok(Json(LocaleOverridesResponse {
        section_id: id,
        locale: locale.as_str().to_string(),
        overrides: merged,
    }))
}

/// DELETE /v1/sections/{id}/locales/{locale} — Drop a locale's overrides.
#[utoipa::path(
    delete,
    path = "/v1/sections/{id}/locales/{locale}",
    params(
        ("id" = String, Path, description = "Section ID"),
        ("locale" = String, Path, description = "Locale code"),
    ),
    responses(
        (status = 204, description = "Overrides removed"),
        (status = 404, description = "No overrides for this locale", body = crate::error::ErrorBody),
    ),
    tag = "locales"
)]
pub(crate) async fn clear_overrides(
    State(state): State<AppState>,
    Path((id, locale)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let locale = LocaleCode::new(locale)?;
    if state.controller()?.clear_locale_override(&id, &locale)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "no {} overrides for section {id}",
            locale.as_str()
        )))
    }
}
