//! # deck-core — Foundational Types for deckforge
//!
//! Defines the persisted data model of a presentation deck and the error
//! taxonomy shared by every other crate in the workspace. It depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `SectionId` and `LocaleCode` are validated
//!    newtypes. No bare strings for identifiers.
//!
//! 2. **One `Section` shape.** The record persisted to disk, returned over
//!    HTTP, and held in history snapshots is the same serde type, with the
//!    camelCase field names of the stored JSON document.
//!
//! 3. **UTC timestamps.** `Timestamp` is always UTC, millisecond precision.
//!
//! 4. **Arrays are atomic under merge.** [`deep_merge`] recurses into plain
//!    objects only; an override array replaces the base array wholesale.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `deck-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod merge;
pub mod section;
pub mod temporal;

pub use error::{DeckError, GeneratorError, PersistenceError, ValidationError};
pub use identity::{LocaleCode, SectionId};
pub use merge::{deep_merge, merge_into};
pub use section::{
    DraftMetadata, EditableField, FieldType, FieldValues, Section, SectionDraft,
    SectionMetadata,
};
pub use temporal::Timestamp;
