//! Default seed set written on first run.
//!
//! Seed sections are `isDefault` and non-deletable; they can be edited and
//! reordered like any other section.

use std::collections::BTreeMap;

use deck_core::{EditableField, FieldType, Section, SectionId, SectionMetadata, Timestamp};
use serde_json::json;

use crate::error::StoreError;
use crate::store::SectionStore;

const HERO_CODE: &str = r#"import { motion } from "framer-motion";

export default function HeroSection({ title, subtitle, accentColor }) {
  return (
    <section className="hero" style={{ background: accentColor, minHeight: "100vh" }}>
      <motion.div initial={{ opacity: 0 }} animate={{ opacity: 1 }}>
        <h1>{title}</h1>
        <p className="subtitle">{subtitle}</p>
      </motion.div>
    </section>
  );
}
"#;

const CLOSING_CODE: &str = r#"const ClosingSection = ({ heading, highlights, contactEmail }) => {
  const items = highlights
    .split(",")
    .map((item) => item.trim())
    .filter((item) => item.length > 0);
  return (
    <section className="closing">
      <h2>{heading}</h2>
      <ul>
        {items.map((item, index) => <li key={index}>{item}</li>)}
      </ul>
      {contactEmail && <a href={`mailto:${contactEmail}`}>{contactEmail}</a>}
    </section>
  );
};
"#;

fn seed(
    id: &str,
    order: usize,
    title: &str,
    description: &str,
    code: &str,
    fields: Vec<(&str, EditableField)>,
    now: Timestamp,
) -> Option<Section> {
    Some(Section {
        id: SectionId::new(id).ok()?,
        order,
        metadata: SectionMetadata {
            title: title.to_string(),
            description: description.to_string(),
            category: Some("default".to_string()),
            is_default: true,
            is_deletable: false,
            created_at: now,
            updated_at: now,
            generator_model: None,
        },
        code: code.to_string(),
        editable_fields: fields
            .into_iter()
            .map(|(name, field)| (name.to_string(), field))
            .collect::<BTreeMap<_, _>>(),
        dependencies: Some(vec!["framer-motion".to_string()]),
    })
}

/// The two default sections: an opening hero and a closing slide.
pub fn default_sections(now: Timestamp) -> Vec<Section> {
    [
        seed(
            "section-hero",
            0,
            "Hero",
            "Opening slide with title and subtitle",
            HERO_CODE,
            vec![
                ("title", EditableField::new(FieldType::Text, "Title", json!("Welcome"))),
                (
                    "subtitle",
                    EditableField::new(FieldType::Textarea, "Subtitle", json!("Build decks from live components")),
                ),
                ("accentColor", EditableField::new(FieldType::Color, "Accent color", json!("#1e293b"))),
            ],
            now,
        ),
        seed(
            "section-closing",
            1,
            "Closing",
            "Summary of highlights and a contact link",
            CLOSING_CODE,
            vec![
                ("heading", EditableField::new(FieldType::Text, "Heading", json!("Thank you"))),
                (
                    "highlights",
                    EditableField::new(FieldType::Textarea, "Highlights (comma separated)", json!("Fast, Safe, Simple")),
                ),
                ("contactEmail", EditableField::new(FieldType::Text, "Contact email", json!("hello@example.com"))),
            ],
            now,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Write the seed set if the store holds no sections. Returns whether it seeded.
pub fn seed_if_empty(store: &SectionStore) -> Result<bool, StoreError> {
    if !store.try_get_all()?.is_empty() {
        return Ok(false);
    }
    store.replace_all(default_sections(Timestamp::now()))?;
    tracing::info!("seeded default sections");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;
    use std::sync::Arc;

    #[test]
    fn seed_set_is_protected_and_dense() {
        let sections = default_sections(Timestamp::now());
        assert_eq!(sections.len(), 2);
        for (i, s) in sections.iter().enumerate() {
            assert_eq!(s.order, i);
            assert!(!s.is_deletable());
        }
    }

    #[test]
    fn seeding_happens_once() {
        let store = SectionStore::new(Arc::new(MemoryBackend::new("deck-sections")));
        assert!(seed_if_empty(&store).unwrap());
        assert!(!seed_if_empty(&store).unwrap());
        assert_eq!(store.count(), 2);
    }
}
