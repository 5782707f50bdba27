//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error taxonomy used throughout deckforge. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Persistence errors carry the medium (file path or storage key) they
//!   occurred against.
//! - Validation errors name the offending input so callers can report a
//!   human-readable reason.
//! - Generator errors carry the raw diagnostic from the parser or schema
//!   validator and never mutate the deck.

use thiserror::Error;

/// Top-level error type for deckforge.
#[derive(Error, Debug)]
pub enum DeckError {
    /// Malformed input to a mutation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Load or save against the persistence medium failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Output of the external content generator was rejected.
    #[error("generator error: {0}")]
    Generator(#[from] GeneratorError),
}

/// Malformed input to a mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required value was empty or missing.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the missing input.
        field: &'static str,
    },

    /// An identifier did not satisfy its format rules.
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The same section id appears more than once in a collection.
    #[error("duplicate section id: {0}")]
    DuplicateId(String),

    /// Structurally invalid payload.
    #[error("malformed input: {0}")]
    Malformed(String),
}

/// Load/save failure against a persistence medium.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Filesystem failure.
    #[error("io error on {path}: {source}")]
    Io {
        /// Path of the file being read or written.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Stored content could not be decoded.
    #[error("could not parse stored data in {medium}: {source}")]
    Parse {
        /// File path or storage key.
        medium: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// In-memory state could not be encoded for storage.
    #[error("could not encode data for storage: {0}")]
    Encode(#[source] serde_json::Error),

    /// The medium refused the write (quota, read-only, injected failure).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Rejection of output from the external content generator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    /// The generator did not return parseable JSON.
    #[error("generator returned malformed JSON: {diagnostic}")]
    MalformedJson {
        /// Parser diagnostic, including line and column.
        diagnostic: String,
        /// Leading excerpt of the raw output for operator inspection.
        excerpt: String,
    },

    /// The JSON parsed but does not have the section shape.
    #[error("generator output has unexpected shape: {}", violations.join("; "))]
    UnexpectedShape {
        /// One entry per schema violation, prefixed with the JSON pointer.
        violations: Vec<String>,
    },

    /// The output was empty.
    #[error("generator returned no content")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_field() {
        let err = ValidationError::Empty { field: "code" };
        assert_eq!(err.to_string(), "code must not be empty");
    }

    #[test]
    fn unexpected_shape_joins_violations() {
        let err = GeneratorError::UnexpectedShape {
            violations: vec!["/code: missing".into(), "/editableFields: not an object".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("/code: missing"));
        assert!(msg.contains("; /editableFields"));
    }

    #[test]
    fn deck_error_wraps_persistence() {
        let err: DeckError = PersistenceError::Unavailable("quota exceeded".into()).into();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
