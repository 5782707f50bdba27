//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1 spec
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "deckforge API",
        version = "0.1.0",
        description = "Section CRUD, locale overrides, generator admission, live rendering, export/import and undo/redo for component-based slide decks.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Sections
        crate::routes::sections::list_sections,
        crate::routes::sections::create_section,
        crate::routes::sections::generate_section,
        crate::routes::sections::reorder_sections,
        crate::routes::sections::get_section,
        crate::routes::sections::delete_section,
        crate::routes::sections::update_field,
        crate::routes::sections::duplicate_section,
        // Locales
        crate::routes::locales::list_locales,
        crate::routes::locales::save_overrides,
        crate::routes::locales::clear_overrides,
        // Render
        crate::routes::render::render_section,
        crate::routes::render::retry_section,
        crate::routes::render::render_deck,
        // Deck
        crate::routes::deck::export_deck,
        crate::routes::deck::import_deck,
        crate::routes::deck::history_status,
        crate::routes::deck::undo,
        crate::routes::deck::redo,
        crate::routes::deck::reload,
    ),
    components(schemas(
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Section DTOs
        crate::routes::sections::SectionResponse,
        crate::routes::sections::SectionListResponse,
        crate::routes::sections::SectionDetailResponse,
        crate::routes::sections::GenerateSectionRequest,
        crate::routes::sections::ReorderRequest,
        crate::routes::sections::UpdateFieldRequest,
        // Locale DTOs
        crate::routes::locales::LocaleOverridesResponse,
        crate::routes::locales::LocaleListResponse,
        // Render DTOs
        crate::routes::render::SectionRenderResponse,
        crate::routes::render::DeckRenderResponse,
        // Deck DTOs
        crate::routes::deck::HistoryResponse,
        crate::routes::deck::DeckResponse,
    )),
    tags(
        (name = "sections", description = "Section CRUD, ordering and generator admission"),
        (name = "locales", description = "Per-locale field overrides"),
        (name = "render", description = "Live rendering with per-section error boundaries"),
        (name = "deck", description = "Export, import and history"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
///
/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
