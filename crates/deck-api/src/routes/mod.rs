//! # API Route Modules
//!
//! - `sections` — section CRUD, field edits, ordering, duplication and
//!   admission of generator output.
//! - `locales` — per-locale field overrides of a section.
//! - `render` — live rendering of one section or the whole deck through
//!   per-section error boundaries.
//! - `deck` — whole-deck export/import and undo/redo.

pub mod deck;
pub mod locales;
pub mod render;
pub mod sections;

use deck_core::LocaleCode;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;

/// `?locale=` selector shared by the read and render endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocaleQuery {
    /// Locale whose overrides apply (e.g. "fr", "pt-BR"). Omit for author values.
    pub locale: Option<String>,
}

impl LocaleQuery {
    /// Parsed locale; blank counts as absent.
    pub fn locale(&self) -> Result<Option<LocaleCode>, AppError> {
        match self.locale.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(code) => Ok(Some(LocaleCode::new(code)?)),
        }
    }
}
