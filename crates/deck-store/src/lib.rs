//! # deck-store — Section Store and Deck Commands
//!
//! Persistence and mutation of a deck's sections:
//!
//! - [`store`]: CRUD and ordering with atomic whole-collection writes.
//! - [`persistence`]: the backend traits with file and in-memory media.
//! - [`overrides`] / [`resolver`]: per-locale field overrides and the
//!   effective field values derived from them.
//! - [`generator`]: admission of external generator output as drafts.
//! - [`document`]: versioned JSON/YAML export documents.
//! - [`controller`]: the command surface with deck-level undo/redo, and
//!   the process-wide [`ControlHandle`].
//! - [`seed`]: the default section set.
//!
//! ## Data Flow
//!
//! ```text
//! caller ──▶ DeckController ──▶ SectionStore ──▶ SectionBackend (file | memory)
//!                 │                  ▲
//!                 ├─ SharedHistory ──┘ (undo/redo via replace_all)
//!                 └─ OverrideStore ──▶ OverrideBackend
//! ```

pub mod controller;
pub mod document;
pub mod error;
pub mod generator;
pub mod overrides;
pub mod persistence;
pub mod resolver;
pub mod seed;
pub mod store;

pub use controller::{ControlHandle, DeckController};
pub use document::{DeckDocument, DocumentFormat, DOCUMENT_VERSION};
pub use error::StoreError;
pub use overrides::{FieldOverrides, OverrideDocument, OverrideStore};
pub use persistence::{
    FileBackend, MemoryBackend, OverrideBackend, SectionBackend, OVERRIDES_FILE, SECTIONS_FILE,
};
pub use resolver::{resolve_fields, FieldResolver};
pub use seed::{default_sections, seed_if_empty};
pub use store::SectionStore;
