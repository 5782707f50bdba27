//! # Identifier Newtypes
//!
//! `SectionId` is globally unique and immutable once assigned. Generated ids
//! follow `section-<unix-millis>-<random>`; ids supplied by callers (seed
//! data, imports) are accepted as long as they are non-empty and free of
//! whitespace and path separators, since they double as route segments.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::temporal::Timestamp;

/// Stable identifier of a section.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionId(String);

impl SectionId {
    /// Generate a fresh identifier from the current time and a random suffix.
    pub fn generate() -> Self {
        let millis = Timestamp::now().epoch_millis();
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("section-{millis}-{}", &random[..9]))
    }

    /// Validate a caller-supplied identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Empty { field: "id" });
        }
        if value.len() > 128 {
            return Err(ValidationError::InvalidIdentifier {
                value,
                reason: "longer than 128 characters",
            });
        }
        if value
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '\\' || c.is_control())
        {
            return Err(ValidationError::InvalidIdentifier {
                value,
                reason: "contains whitespace or a path separator",
            });
        }
        Ok(Self(value))
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SectionId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SectionId> for String {
    fn from(id: SectionId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for SectionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SectionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Language / translation key used to select locale overrides (`en`, `pt-BR`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleCode(String);

impl LocaleCode {
    /// Validate a locale code: ASCII alphanumerics, `-` and `_`, at most 35 chars.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Empty { field: "locale" });
        }
        if value.len() > 35
            || !value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidIdentifier {
                value,
                reason: "locale must be ASCII alphanumerics, '-' or '_'",
            });
        }
        Ok(Self(value))
    }

    /// Access the locale as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LocaleCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LocaleCode> for String {
    fn from(code: LocaleCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = SectionId::generate();
        let b = SectionId::generate();
        assert!(a.as_str().starts_with("section-"));
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_empty_and_path_like_ids() {
        assert!(SectionId::new("").is_err());
        assert!(SectionId::new("a/b").is_err());
        assert!(SectionId::new("has space").is_err());
        assert!(SectionId::new("sec1").is_ok());
    }

    #[test]
    fn id_deserialization_is_validated() {
        let ok: Result<SectionId, _> = serde_json::from_str("\"hero\"");
        assert!(ok.is_ok());
        let bad: Result<SectionId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn locale_codes() {
        assert!(LocaleCode::new("pt-BR").is_ok());
        assert!(LocaleCode::new("en_US").is_ok());
        assert!(LocaleCode::new("../etc").is_err());
        assert!(LocaleCode::new("").is_err());
    }
}
