//! # Section — the persisted unit of presentation content
//!
//! A section pairs a snippet of component source (`code`) with a map of
//! user-editable fields. The store treats `code` as opaque; only the render
//! pipeline looks inside it.
//!
//! ## Invariants
//!
//! - `id` is globally unique and never changes.
//! - `order` is dense and zero-based over one deck (maintained by the store).
//! - `metadata.is_default` sections can never be removed, regardless of
//!   `metadata.is_deletable`.
//! - Field mutations only touch `editable_fields[key].value` and
//!   `metadata.updated_at`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::identity::SectionId;
use crate::temporal::Timestamp;

/// Effective field values keyed by field name.
pub type FieldValues = BTreeMap<String, Value>;

/// The kind of editor a field is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Single-line text.
    Text,
    /// Multi-line text.
    Textarea,
    /// CSS color value.
    Color,
    /// Image URL or data URI.
    Image,
    /// Numeric value.
    Number,
}

impl FieldType {
    /// All field types, in declaration order.
    pub const ALL: [FieldType; 5] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Color,
        FieldType::Image,
        FieldType::Number,
    ];

    /// Wire name of the field type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Color => "color",
            Self::Image => "image",
            Self::Number => "number",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed value that can be edited without touching `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditableField {
    /// Editor kind.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Human-readable label shown in the editor.
    pub label: String,
    /// Author-specified value. Any JSON value is accepted.
    pub value: Value,
}

impl EditableField {
    /// Construct a field.
    pub fn new(field_type: FieldType, label: impl Into<String>, value: Value) -> Self {
        Self {
            field_type,
            label: label.into(),
            value,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Descriptive and lifecycle metadata of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionMetadata {
    /// Display title.
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Optional grouping category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Part of the original seed set; never deletable.
    #[serde(default)]
    pub is_default: bool,
    /// Independent override flag checked at delete time.
    #[serde(default = "default_true")]
    pub is_deletable: bool,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last mutation time.
    pub updated_at: Timestamp,
    /// Model that produced the section, if generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_model: Option<String>,
}

/// A slide of the deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Stable unique identifier.
    pub id: SectionId,
    /// Zero-based display position.
    pub order: usize,
    /// Descriptive metadata.
    pub metadata: SectionMetadata,
    /// Component source evaluated by the render pipeline.
    pub code: String,
    /// Editable fields keyed by name.
    #[serde(default)]
    pub editable_fields: BTreeMap<String, EditableField>,
    /// External capability names referenced by `code` (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

impl Section {
    /// Why this section may not be deleted, if it is protected.
    pub fn deletion_blocker(&self) -> Option<&'static str> {
        if self.metadata.is_default {
            Some("default sections cannot be deleted")
        } else if !self.metadata.is_deletable {
            Some("section is marked as not deletable")
        } else {
            None
        }
    }

    /// Whether the section can be removed from the deck.
    pub fn is_deletable(&self) -> bool {
        self.deletion_blocker().is_none()
    }

    /// Author-specified field values, without any locale overrides.
    pub fn field_values(&self) -> FieldValues {
        self.editable_fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value.clone()))
            .collect()
    }

    /// Set one field value and bump `updated_at`.
    ///
    /// Returns `false` and leaves the section untouched if the field does not exist.
    pub fn set_field_value(&mut self, name: &str, value: Value, now: Timestamp) -> bool {
        match self.editable_fields.get_mut(name) {
            Some(field) => {
                field.value = value;
                self.metadata.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// Copy this section under a fresh id with user-level lifecycle flags.
    pub fn duplicate(&self, now: Timestamp) -> Section {
        let mut copy = self.clone();
        copy.id = SectionId::generate();
        copy.metadata.title = format!("{} (copy)", self.metadata.title);
        copy.metadata.is_default = false;
        copy.metadata.is_deletable = true;
        copy.metadata.created_at = now;
        copy.metadata.updated_at = now;
        copy
    }
}

/// Metadata supplied when creating a section (manually or by a generator).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMetadata {
    /// Display title.
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Optional grouping category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Model that produced the draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_model: Option<String>,
}

/// Input of the add operation; the shape returned by the content generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDraft {
    /// Descriptive metadata.
    pub metadata: DraftMetadata,
    /// Component source.
    pub code: String,
    /// Editable fields keyed by name.
    #[serde(default)]
    pub editable_fields: BTreeMap<String, EditableField>,
    /// External capability names referenced by `code`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

impl SectionDraft {
    /// Minimal admission checks: a title and non-blank code.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.metadata.title.trim().is_empty() {
            return Err(ValidationError::Empty { field: "metadata.title" });
        }
        if self.code.trim().is_empty() {
            return Err(ValidationError::Empty { field: "code" });
        }
        if let Some(name) = self.editable_fields.keys().find(|k| k.trim().is_empty()) {
            return Err(ValidationError::InvalidIdentifier {
                value: name.clone(),
                reason: "field names must not be blank",
            });
        }
        Ok(())
    }

    /// Materialize a user-created section at `order`.
    pub fn into_section(self, id: SectionId, order: usize, now: Timestamp) -> Section {
        Section {
            id,
            order,
            metadata: SectionMetadata {
                title: self.metadata.title,
                description: self.metadata.description,
                category: self.metadata.category,
                is_default: false,
                is_deletable: true,
                created_at: now,
                updated_at: now,
                generator_model: self.metadata.generator_model,
            },
            code: self.code,
            editable_fields: self.editable_fields,
            dependencies: self.dependencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Section {
        let then = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
        let mut fields = BTreeMap::new();
        fields.insert(
            "title".to_string(),
            EditableField::new(FieldType::Text, "Title", json!("Welcome")),
        );
        Section {
            id: SectionId::new("sec1").unwrap(),
            order: 0,
            metadata: SectionMetadata {
                title: "Intro".into(),
                description: String::new(),
                category: None,
                is_default: false,
                is_deletable: true,
                created_at: then,
                updated_at: then,
                generator_model: None,
            },
            code: "function Intro({ title }) { return <h1>{title}</h1>; }".into(),
            editable_fields: fields,
            dependencies: None,
        }
    }

    #[test]
    fn serializes_camel_case_document_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("editableFields").is_some());
        assert_eq!(value["metadata"]["isDefault"], json!(false));
        assert_eq!(value["metadata"]["createdAt"], json!("2024-01-01T00:00:00.000Z"));
        assert_eq!(value["editableFields"]["title"]["type"], json!("text"));
        assert!(value.get("dependencies").is_none());
    }

    #[test]
    fn missing_is_deletable_defaults_to_true() {
        let raw = json!({
            "id": "s", "order": 0, "code": "x",
            "metadata": {
                "title": "t",
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            }
        });
        let section: Section = serde_json::from_value(raw).unwrap();
        assert!(section.metadata.is_deletable);
        assert!(section.editable_fields.is_empty());
    }

    #[test]
    fn default_sections_are_never_deletable() {
        let mut s = sample();
        s.metadata.is_default = true;
        s.metadata.is_deletable = true;
        assert!(!s.is_deletable());
        s.metadata.is_default = false;
        s.metadata.is_deletable = false;
        assert!(!s.is_deletable());
    }

    #[test]
    fn set_field_value_touches_only_value_and_timestamp() {
        let mut s = sample();
        let before = s.clone();
        let now = Timestamp::parse("2025-06-01T00:00:00Z").unwrap();
        assert!(s.set_field_value("title", json!("Hello"), now));
        assert_eq!(s.editable_fields["title"].value, json!("Hello"));
        assert_eq!(s.editable_fields["title"].label, before.editable_fields["title"].label);
        assert_eq!(s.metadata.updated_at, now);
        assert_eq!(s.metadata.created_at, before.metadata.created_at);
        assert_eq!(s.code, before.code);
    }

    #[test]
    fn set_missing_field_is_rejected_without_change() {
        let mut s = sample();
        let before = s.clone();
        assert!(!s.set_field_value("missing", json!(1), Timestamp::now()));
        assert_eq!(s, before);
    }

    #[test]
    fn duplicate_gets_fresh_identity() {
        let mut s = sample();
        s.metadata.is_default = true;
        let copy = s.duplicate(Timestamp::now());
        assert_ne!(copy.id, s.id);
        assert_eq!(copy.metadata.title, "Intro (copy)");
        assert!(copy.is_deletable());
        assert_eq!(copy.editable_fields, s.editable_fields);
    }

    #[test]
    fn draft_validation() {
        let mut draft = SectionDraft {
            metadata: DraftMetadata {
                title: "Generated".into(),
                ..Default::default()
            },
            code: "  ".into(),
            editable_fields: BTreeMap::new(),
            dependencies: None,
        };
        assert_eq!(draft.validate(), Err(ValidationError::Empty { field: "code" }));
        draft.code = "function A() { return null; }".into();
        assert!(draft.validate().is_ok());
        let section = draft.into_section(SectionId::new("g1").unwrap(), 3, Timestamp::now());
        assert_eq!(section.order, 3);
        assert!(!section.metadata.is_default);
        assert!(section.metadata.is_deletable);
    }
}
