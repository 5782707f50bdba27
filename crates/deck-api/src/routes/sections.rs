//! # Section API
//!
//! Section CRUD, field edits, ordering, duplication and admission of
//! external generator output. Every mutation is recorded in the deck
//! history, so it can be undone through `/v1/deck/undo`.
//!
//! ## Endpoints
//!
//! - `GET /v1/sections` — list sections in order
//! - `POST /v1/sections` — add a section from a draft
//! - `POST /v1/sections/generate` — admit raw generator output
//! - `PUT /v1/sections/order` — reorder by a full id permutation
//! - `GET /v1/sections/{id}` — one section with resolved field values
//! - `DELETE /v1/sections/{id}` — delete a user-created section
//! - `PUT /v1/sections/{id}/fields/{name}` — set one field value
//! - `POST /v1/sections/{id}/duplicate` — copy a section after itself

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use deck_core::{FieldValues, Section, SectionDraft};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::DeckJson;
use crate::routes::LocaleQuery;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// A single section.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionResponse {
    #[schema(value_type = Object)]
    pub section: Section,
}

/// The deck's sections in order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionListResponse {
    #[schema(value_type = Vec<Object>)]
    pub sections: Vec<Section>,
}

/// A section with its effective field values for one locale.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionDetailResponse {
    #[schema(value_type = Object)]
    pub section: Section,
    /// Locale the field values were resolved for; absent for author values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Effective field values, keyed by field name.
    #[schema(value_type = Object)]
    pub fields: FieldValues,
    /// Locales that carry overrides for this section.
    pub locales: Vec<String>,
}

/// Raw output of a content generator, optionally fenced in markdown.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateSectionRequest {
    /// Generator response text holding one JSON section draft.
    pub output: String,
    /// Model that produced the output.
    #[serde(default)]
    pub model: Option<String>,
}

/// New order of the deck.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    /// Every section id exactly once, in the desired order.
    pub ids: Vec<String>,
}

/// New value of one editable field.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFieldRequest {
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the sections router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sections", get(list_sections).post(create_section))
        .route("/v1/sections/generate", post(generate_section))
        .route("/v1/sections/order", put(reorder_sections))
        .route("/v1/sections/{id}", get(get_section).delete(delete_section))
        .route("/v1/sections/{id}/fields/{name}", put(update_field))
        .route("/v1/sections/{id}/duplicate", post(duplicate_section))
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /v1/sections — List sections in order.
#[utoipa::path(
    get,
    path = "/v1/sections",
    responses(
        (status = 200, description = "Sections in order", body = SectionListResponse),
        (status = 503, description = "Deck not mounted", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub(crate) async fn list_sections(
    State(state): State<AppState>,
) -> Result<Json<SectionListResponse>, AppError> {
    let sections = state.controller()?.sections();
    Ok(Json(SectionListResponse { sections }))
}

/// POST /v1/sections — Add a section at the end of the deck.
#[utoipa::path(
    post,
    path = "/v1/sections",
    request_body(content = serde_json::Value, description = "Section draft: metadata, code, editableFields"),
    responses(
        (status = 201, description = "Section created", body = SectionResponse),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub(crate) async fn create_section(
    State(state): State<AppState>,
    DeckJson(draft): DeckJson<SectionDraft>,
) -> Result<(StatusCode, Json<SectionResponse>), AppError> {
    let section = state.controller()?.add(draft)?;
    tracing::info!(section_id = %section.id, "section added");
    Ok((StatusCode::CREATED, Json(SectionResponse { section })))
}

/// POST /v1/sections/generate — Admit generator output as a new section.
#[utoipa::path(
    post,
    path = "/v1/sections/generate",
    request_body = GenerateSectionRequest,
    responses(
        (status = 201, description = "Section created from generator output", body = SectionResponse),
        (status = 422, description = "Output rejected", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub(crate) async fn generate_section(
    State(state): State<AppState>,
    DeckJson(req): DeckJson<GenerateSectionRequest>,
) -> Result<(StatusCode, Json<SectionResponse>), AppError> {
    let section = state
        .controller()?
        .admit_generated(&req.output, req.model.as_deref())?;
    tracing::info!(section_id = %section.id, "generated section admitted");
    Ok((StatusCode::CREATED, Json(SectionResponse { section })))
}

/// PUT /v1/sections/order — Reorder the deck.
#[utoipa::path(
    put,
    path = "/v1/sections/order",
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Sections in their new order", body = SectionListResponse),
        (status = 422, description = "Not a permutation of the deck", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub(crate) async fn reorder_sections(
    State(state): State<AppState>,
    DeckJson(req): DeckJson<ReorderRequest>,
) -> Result<Json<SectionListResponse>, AppError> {
    let sections = state.controller()?.reorder(&req.ids)?;
    Ok(Json(SectionListResponse { sections }))
}

/// GET /v1/sections/{id} — One section with resolved field values.
#[utoipa::path(
    get,
    path = "/v1/sections/{id}",
    params(("id" = String, Path, description = "Section ID"), LocaleQuery),
    responses(
        (status = 200, description = "Section found", body = SectionDetailResponse),
        (status = 404, description = "Section not found", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub(crate) async fn get_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<SectionDetailResponse>, AppError> {
    let locale = query.locale()?;
    let controller = state.controller()?;
    let section = controller.section(&id)?;
    let fields = controller.resolver().resolve(&section, locale.as_ref());
    let locales = controller.overrides().locales(&id);
    Ok(Json(SectionDetailResponse {
        section,
        locale: locale.map(|l| l.as_str().to_string()),
        fields,
        locales,
    }))
}

/// DELETE /v1/sections/{id} — Delete a user-created section.
#[utoipa::path(
    delete,
    path = "/v1/sections/{id}",
    params(("id" = String, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section deleted", body = SectionResponse),
        (status = 403, description = "Default section", body = crate::error::ErrorBody),
        (status = 404, description = "Section not found", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub(crate) async fn delete_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SectionResponse>, AppError> {
    let section = state.controller()?.delete(&id)?;
    state.renderer.forget(&section.id);
    tracing::info!(section_id = %section.id, "section deleted");
    Ok(Json(SectionResponse { section }))
}

/// PUT /v1/sections/{id}/fields/{name} — Set one editable field.
#[utoipa::path(
    put,
    path = "/v1/sections/{id}/fields/{name}",
    params(
        ("id" = String, Path, description = "Section ID"),
        ("name" = String, Path, description = "Editable field name"),
    ),
    request_body = UpdateFieldRequest,
    responses(
        (status = 200, description = "Field updated", body = SectionResponse),
        (status = 404, description = "Section or field not found", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub(crate) async fn update_field(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
    DeckJson(req): DeckJson<UpdateFieldRequest>,
) -> Result<Json<SectionResponse>, AppError> {
    let section = state.controller()?.update_field(&id, &name, req.value)?;
    Ok(Json(SectionResponse { section }))
}

/// POST /v1/sections/{id}/duplicate — Copy a section directly after itself.
#[utoipa::path(
    post,
    path = "/v1/sections/{id}/duplicate",
    params(("id" = String, Path, description = "Section ID")),
    responses(
        (status = 201, description = "Copy created", body = SectionResponse),
        (status = 404, description = "Section not found", body = crate::error::ErrorBody),
    ),
    tag = "sections"
)]
pub(crate) async fn duplicate_section(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SectionResponse>), AppError> {
    let section = state.controller()?.duplicate(&id)?;
    Ok((StatusCode::CREATED, Json(SectionResponse { section })))
}
