//! # Deck API
//!
//! Whole-deck operations: export and import of versioned JSON/YAML
//! documents, and undo/redo over deck snapshots.
//!
//! ## Endpoints
//!
//! - `GET /v1/deck/export?format=json|yaml` — export document
//! - `POST /v1/deck/import?format=json|yaml` — replace the deck (resets history)
//! - `GET /v1/deck/history` — undo/redo availability
//! - `POST /v1/deck/undo` — restore the previous snapshot
//! - `POST /v1/deck/redo` — re-apply the next snapshot
//! - `POST /v1/deck/reload` — re-read storage and start a fresh history

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use deck_core::Section;
use deck_state::HistoryStatus;
use deck_store::DocumentFormat;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::state::AppState;

/// `?format=` selector of the document endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FormatQuery {
    /// `json` (default), `yaml` or `yml`.
    pub format: Option<String>,
}

impl FormatQuery {
    fn format(&self) -> Result<DocumentFormat, AppError> {
        match self.format.as_deref() {
            None => Ok(DocumentFormat::default()),
            Some(name) => name.parse().map_err(AppError::BadRequest),
        }
    }
}

/// Undo/redo availability.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub can_undo: bool,
    pub can_redo: bool,
}

impl From<HistoryStatus> for HistoryResponse {
    fn from(status: HistoryStatus) -> Self {
        Self {
            can_undo: status.can_undo,
            can_redo: status.can_redo,
        }
    }
}

/// The deck after a whole-deck operation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeckResponse {
    #[schema(value_type = Vec<Object>)]
    pub sections: Vec<Section>,
    pub history: HistoryResponse,
}

/// Build the deck router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/deck/export", get(export_deck))
        .route("/v1/deck/import", post(import_deck))
        .route("/v1/deck/history", get(history_status))
        .route("/v1/deck/undo", post(undo))
        .route("/v1/deck/redo", post(redo))
        .route("/v1/deck/reload", post(reload))
}

/// GET /v1/deck/export — Export the deck as a versioned document.
#[utoipa::path(
    get,
    path = "/v1/deck/export",
    params(FormatQuery),
    responses(
        (status = 200, description = "Export document", content_type = "application/json", body = String),
        (status = 400, description = "Unknown format", body = crate::error::ErrorBody),
    ),
    tag = "deck"
)]
pub(crate) async fn export_deck(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<impl IntoResponse, AppError> {
    let format = query.format()?;
    let text = state.controller()?.export(format)?;
    let content_type = match format {
        DocumentFormat::Json => "application/json",
        DocumentFormat::Yaml => "application/yaml",
    };
    let disposition = format!("attachment; filename=\"deck.{}\"", format.as_str());
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        text,
    ))
}

/// POST /v1/deck/import — Replace the deck with an export document.
#[utoipa::path(
    post,
    path = "/v1/deck/import",
    params(FormatQuery),
    request_body(content = String, description = "Export document text"),
    responses(
        (status = 200, description = "Imported deck", body = DeckResponse),
        (status = 400, description = "Malformed or unsupported document", body = crate::error::ErrorBody),
        (status = 422, description = "Document failed validation", body = crate::error::ErrorBody),
    ),
    tag = "deck"
)]
pub(crate) async fn import_deck(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
    body: String,
) -> Result<Json<DeckResponse>, AppError> {
    let format = query.format()?;
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("import body is empty".to_string()));
    }
    let controller = state.controller()?;
    let sections = controller.import(&body, format)?;
    Ok(Json(DeckResponse {
        sections,
        history: controller.history_status().into(),
    }))
}

/// GET /v1/deck/history — Undo/redo availability.
#[utoipa::path(
    get,
    path = "/v1/deck/history",
    responses(
        (status = 200, description = "History status", body = HistoryResponse),
    ),
    tag = "deck"
)]
pub(crate) async fn history_status(
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, AppError> {
    Ok(Json(state.controller()?.history_status().into()))
}

/// POST /v1/deck/undo — Restore the previous snapshot.
#[utoipa::path(
    post,
    path = "/v1/deck/undo",
    responses(
        (status = 200, description = "Restored deck", body = DeckResponse),
        (status = 409, description = "Nothing to undo", body = crate::error::ErrorBody),
    ),
    tag = "deck"
)]
pub(crate) async fn undo(State(state): State<AppState>) -> Result<Json<DeckResponse>, AppError> {
    let controller = state.controller()?;
    let sections = controller
        .undo()?
        .ok_or_else(|| AppError::Conflict("nothing to undo".to_string()))?;
    Ok(Json(DeckResponse {
        sections,
        history: controller.history_status().into(),
    }))
}

/// POST /v1/deck/redo — Re-apply the next snapshot.
#[utoipa::path(
    post,
    path = "/v1/deck/redo",
    responses(
        (status = 200, description = "Restored deck", body = DeckResponse),
        (status = 409, description = "Nothing to redo", body = crate::error::ErrorBody),
    ),
    tag = "deck"
)]
pub(crate) async fn redo(State(state): State<AppState>) -> Result<Json<DeckResponse>, AppError> {
    let controller = state.controller()?;
    let sections = controller
        .redo()?
        .ok_or_else(|| AppError::Conflict("nothing to redo".to_string()))?;
    Ok(Json(DeckResponse {
        sections,
        history: controller.history_status().into(),
    }))
}

/// POST /v1/deck/reload — Re-read storage and reset history.
#[utoipa::path(
    post,
    path = "/v1/deck/reload",
    responses(
        (status = 200, description = "Reloaded deck", body = DeckResponse),
    ),
    tag = "deck"
)]
pub(crate) async fn reload(State(state): State<AppState>) -> Result<Json<DeckResponse>, AppError> {
    let controller = state.controller()?;
    let sections = controller.reload();
    Ok(Json(DeckResponse {
        sections,
        history: controller.history_status().into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_defaults_to_json() {
        assert_eq!(FormatQuery::default().format().unwrap(), DocumentFormat::Json);
        let yaml = FormatQuery {
            format: Some("yml".into()),
        };
        assert_eq!(yaml.format().unwrap(), DocumentFormat::Yaml);
    }

    #[test]
    fn unknown_format_is_bad_request() {
        let query = FormatQuery {
            format: Some("xml".into()),
        };
        assert!(matches!(query.format(), Err(AppError::BadRequest(_))));
    }
}
