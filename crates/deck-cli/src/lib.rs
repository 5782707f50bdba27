//! # deck-cli — CLI Tool for deckforge
//!
//! Provides the `deck` command-line interface over a file-backed deck
//! (`sections.json` and `locale-overrides.json` under `--data-dir`).
//!
//! ## Subcommands
//!
//! - `deck init` — seed the default sections into an empty deck.
//! - `deck list` / `deck show` — inspect sections and resolved fields.
//! - `deck add` / `deck generate` — add a draft, or admit generator output.
//! - `deck set-field`, `deck reorder`, `deck delete`, `deck duplicate`.
//! - `deck render` — render the deck (or one section) to HTML.
//! - `deck export` / `deck import` — versioned JSON/YAML documents.
//! - `deck locale set|clear|list` — per-locale field overrides.
//!
//! Each invocation starts a fresh history, so undo/redo is only offered
//! by the long-running server.
//!
//! ```bash
//! deck --data-dir ./data init
//! deck set-field section-hero title '"Hello"'
//! deck render --locale fr --output deck.html
//! deck export --format yaml --output deck.yaml
//! ```

pub mod locale;
pub mod render;
pub mod sections;
pub mod transfer;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use deck_core::LocaleCode;
use deck_state::DEFAULT_MAX_HISTORY;
use deck_store::{DeckController, FileBackend, OverrideStore, SectionStore};
use serde_json::Value;

/// Open the deck stored under `data_dir`. Nothing is written until a command mutates it.
pub fn open_deck(data_dir: &Path) -> DeckController {
    let store = SectionStore::new(Arc::new(FileBackend::sections_in(data_dir)));
    let overrides = OverrideStore::new(Arc::new(FileBackend::overrides_in(data_dir)));
    DeckController::new(store, overrides, DEFAULT_MAX_HISTORY)
}

/// Parse a command-line value as JSON, falling back to a plain string.
///
/// `42` is a number and `"42"` a string; `Hello` (not valid JSON) is a string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Parse an optional `--locale` argument.
pub fn parse_locale(raw: Option<&str>) -> Result<Option<LocaleCode>> {
    raw.map(|code| LocaleCode::new(code).with_context(|| format!("invalid locale {code:?}")))
        .transpose()
}

/// Write `text` to `path`, or to `out` when no path is given.
pub fn emit(text: &str, path: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            writeln!(out, "{text}")?;
            Ok(())
        }
    }
}
