//! # Deck Export Document
//!
//! A whole deck as one versioned document, encoded as JSON or YAML:
//!
//! ```json
//! { "version": 1, "exportedAt": "…", "sections": [ … ], "localeOverrides": { … } }
//! ```
//!
//! `localeOverrides` is omitted when empty and optional on import.

use std::str::FromStr;

use deck_core::{Section, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::overrides::OverrideDocument;

/// Current document version.
pub const DOCUMENT_VERSION: u32 = 1;

/// Serialized deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckDocument {
    pub version: u32,
    pub exported_at: Timestamp,
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "OverrideDocument::is_empty")]
    pub locale_overrides: OverrideDocument,
}

impl DeckDocument {
    /// Snapshot `sections` and `locale_overrides` as of now.
    pub fn new(sections: Vec<Section>, locale_overrides: OverrideDocument) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            exported_at: Timestamp::now(),
            sections,
            locale_overrides,
        }
    }

    /// Reject documents of a version this build cannot read.
    pub fn check_version(&self) -> Result<(), StoreError> {
        if self.version == DOCUMENT_VERSION {
            Ok(())
        } else {
            Err(ValidationError::Malformed(format!(
                "unsupported document version {} (expected {DOCUMENT_VERSION})",
                self.version
            ))
            .into())
        }
    }
}

/// Encoding of an export document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    /// Encode `document` as text.
    pub fn encode(&self, document: &DeckDocument) -> Result<String, StoreError> {
        match self {
            Self::Json => serde_json::to_string_pretty(document).map_err(|e| self.error(e)),
            Self::Yaml => serde_yaml::to_string(document).map_err(|e| self.error(e)),
        }
    }

    /// Decode and version-check a document.
    pub fn decode(&self, text: &str) -> Result<DeckDocument, StoreError> {
        let document: DeckDocument = match self {
            Self::Json => serde_json::from_str(text).map_err(|e| self.error(e))?,
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| self.error(e))?,
        };
        document.check_version()?;
        Ok(document)
    }

    fn error(&self, e: impl std::fmt::Display) -> StoreError {
        StoreError::Document {
            format: self.as_str(),
            message: e.to_string(),
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!("unknown document format: {other}")),
        }
    }
}
