//! # Locale Overrides
//!
//! Per-section, per-locale replacement values for editable fields, kept in
//! one document independent of the section records:
//!
//! ```text
//! { "<sectionId>": { "<locale>": { "<field>": <value>, ... }, ... }, ... }
//! ```
//!
//! `save` deep-merges the incoming partial override into whatever is stored
//! for the same (section, locale), so callers can send one field at a time.
//! `delete` drops the whole (section, locale) entry, falling back to the
//! author-specified values.

use std::collections::BTreeMap;
use std::sync::Arc;

use deck_core::{merge_into, LocaleCode};
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::persistence::OverrideBackend;

/// Field overrides of one section in one locale.
pub type FieldOverrides = Map<String, Value>;

/// The whole override document: section id → locale → field overrides.
pub type OverrideDocument = BTreeMap<String, BTreeMap<String, FieldOverrides>>;

/// Locale-override persistence over a pluggable [`OverrideBackend`].
#[derive(Debug, Clone)]
pub struct OverrideStore {
    backend: Arc<dyn OverrideBackend>,
    write_lock: Arc<Mutex<()>>,
}

impl OverrideStore {
    pub fn new(backend: Arc<dyn OverrideBackend>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Stored overrides for (section, locale); empty when absent or unreadable.
    pub fn load(&self, section_id: &str, locale: &LocaleCode) -> FieldOverrides {
        self.document()
            .get(section_id)
            .and_then(|locales| locales.get(locale.as_str()))
            .cloned()
            .unwrap_or_default()
    }

    /// Locales that carry overrides for `section_id`.
    pub fn locales(&self, section_id: &str) -> Vec<String> {
        self.document()
            .get(section_id)
            .map(|locales| locales.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Deep-merge `overrides` into the stored entry and return the result.
    pub fn save(
        &self,
        section_id: &str,
        locale: &LocaleCode,
        overrides: FieldOverrides,
    ) -> Result<FieldOverrides, StoreError> {
        self.mutate(|document| {
            let entry = document
                .entry(section_id.to_string())
                .or_default()
                .entry(locale.as_str().to_string())
                .or_default();
            let mut merged = Value::Object(std::mem::take(entry));
            merge_into(&mut merged, Value::Object(overrides));
            if let Value::Object(map) = merged {
                *entry = map;
            }
            Ok(entry.clone())
        })
    }

    /// Remove the (section, locale) entry. Returns whether anything was removed.
    pub fn delete(&self, section_id: &str, locale: &LocaleCode) -> Result<bool, StoreError> {
        self.mutate(|document| {
            let Some(locales) = document.get_mut(section_id) else {
                return Ok(false);
            };
            let removed = locales.remove(locale.as_str()).is_some();
            if locales.is_empty() {
                document.remove(section_id);
            }
            Ok(removed)
        })
    }

    /// Drop the entries of every section `live` rejects, returning how many
    /// sections were pruned. Nothing is written when nothing is pruned.
    pub fn retain_sections(&self, live: impl Fn(&str) -> bool) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock();
        let mut document = self.backend.load_all()?;
        let before = document.len();
        document.retain(|section_id, _| live(section_id));
        let pruned = before - document.len();
        if pruned > 0 {
            self.backend.save_all(&document).map_err(|e| {
                tracing::error!(error = %e, "failed to persist locale overrides");
                StoreError::from(e)
            })?;
        }
        Ok(pruned)
    }

    /// The whole document, surfacing load failures.
    pub fn try_document(&self) -> Result<OverrideDocument, StoreError> {
        Ok(self.backend.load_all()?)
    }

    /// The whole document; empty on load failure.
    pub fn document(&self) -> OverrideDocument {
        self.backend.load_all().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load locale overrides, treating as empty");
            OverrideDocument::new()
        })
    }

    /// Replace the whole document (import).
    pub fn replace_all(&self, document: OverrideDocument) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        self.backend.save_all(&document).map_err(|e| {
            tracing::error!(error = %e, "failed to persist locale overrides");
            StoreError::from(e)
        })
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut OverrideDocument) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let _guard = self.write_lock.lock();
        let mut document = self.backend.load_all()?;
        let result = f(&mut document)?;
        self.backend.save_all(&document).map_err(|e| {
            tracing::error!(error = %e, "failed to persist locale overrides");
            StoreError::from(e)
        })?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{FileBackend, MemoryBackend};
    use serde_json::json;

    fn locale(code: &str) -> LocaleCode {
        LocaleCode::new(code).unwrap()
    }

    fn obj(value: Value) -> FieldOverrides {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn absent_override_loads_empty() {
        let store = OverrideStore::new(Arc::new(MemoryBackend::new("deck-overrides")));
        assert!(store.load("sec1", &locale("pt")).is_empty());
    }

    #[test]
    fn save_deep_merges_with_existing_entry() {
        let store = OverrideStore::new(Arc::new(MemoryBackend::new("deck-overrides")));
        let pt = locale("pt");
        store
            .save("sec1", &pt, obj(json!({"title": "Olá", "card": {"heading": "A", "body": "B"}})))
            .unwrap();
        let merged = store
            .save("sec1", &pt, obj(json!({"card": {"heading": "C"}})))
            .unwrap();
        assert_eq!(
            Value::Object(merged),
            json!({"title": "Olá", "card": {"heading": "C", "body": "B"}})
        );
    }

    #[test]
    fn delete_falls_back_and_prunes_empty_sections() {
        let store = OverrideStore::new(Arc::new(MemoryBackend::new("deck-overrides")));
        let pt = locale("pt");
        store.save("sec1", &pt, obj(json!({"title": "Olá"}))).unwrap();
        assert_eq!(store.locales("sec1"), vec!["pt".to_string()]);
        assert!(store.delete("sec1", &pt).unwrap());
        assert!(!store.delete("sec1", &pt).unwrap());
        assert!(store.document().is_empty());
    }

    #[test]
    fn overrides_persist_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let de = locale("de-DE");
        {
            let store = OverrideStore::new(Arc::new(FileBackend::overrides_in(dir.path())));
            store.save("sec1", &de, obj(json!({"title": "Hallo"}))).unwrap();
        }
        let reopened = OverrideStore::new(Arc::new(FileBackend::overrides_in(dir.path())));
        assert_eq!(reopened.load("sec1", &de)["title"], json!("Hallo"));
    }

    #[test]
    fn retain_prunes_every_locale_of_dropped_sections() {
        let backend = Arc::new(MemoryBackend::new("deck-overrides"));
        let store = OverrideStore::new(backend.clone());
        store.save("sec1", &locale("pt"), obj(json!({"a": 1}))).unwrap();
        store.save("sec1", &locale("fr"), obj(json!({"a": 2}))).unwrap();
        store.save("sec2", &locale("pt"), obj(json!({"b": 1}))).unwrap();
        assert_eq!(store.retain_sections(|id| id == "sec2").unwrap(), 1);
        assert!(store.locales("sec1").is_empty());
        assert_eq!(store.locales("sec2"), ["pt"]);

        backend.set_fail_writes(true);
        assert_eq!(store.retain_sections(|id| id == "sec2").unwrap(), 0);
    }
}
