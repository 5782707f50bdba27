//! # Store Errors
//!
//! Every rejected store or controller operation carries a specific reason.
//! Nothing below the store boundary panics; I/O and parse failures arrive
//! here as [`PersistenceError`] and are either degraded (reads) or surfaced
//! (writes).

use deck_core::{GeneratorError, PersistenceError, ValidationError};
use thiserror::Error;

/// Failure of a Section Store, override store, or controller operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No section with this id exists.
    #[error("section {0} not found")]
    SectionNotFound(String),

    /// The section exists but has no field with this name.
    #[error("field {field:?} not found in section {section}")]
    FieldNotFound {
        /// Section id.
        section: String,
        /// Requested field name.
        field: String,
    },

    /// The section is part of the default set or marked non-deletable.
    #[error("section {id} cannot be deleted: {reason}")]
    Protected {
        /// Section id.
        id: String,
        /// Why deletion was refused.
        reason: &'static str,
    },

    /// A reorder payload was empty or contained duplicate ids.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Malformed input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The persistence medium failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Generator output was rejected.
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// An export document could not be encoded or decoded.
    #[error("{format} document error: {message}")]
    Document {
        /// `json` or `yaml`.
        format: &'static str,
        /// Encoder/decoder diagnostic.
        message: String,
    },

    /// The control surface is not mounted.
    #[error("control surface unavailable")]
    Unavailable,
}

impl StoreError {
    /// Whether the error was caused by the caller's input rather than the medium.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Persistence(_) | Self::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_subject() {
        let err = StoreError::FieldNotFound {
            section: "sec1".into(),
            field: "title".into(),
        };
        assert_eq!(err.to_string(), "field \"title\" not found in section sec1");
        let err = StoreError::Protected {
            id: "hero".into(),
            reason: "default sections cannot be deleted",
        };
        assert!(err.to_string().contains("default sections"));
    }

    #[test]
    fn persistence_is_not_a_client_error() {
        let err: StoreError = PersistenceError::Unavailable("disk full".into()).into();
        assert!(!err.is_client_error());
        assert!(StoreError::SectionNotFound("x".into()).is_client_error());
    }
}
