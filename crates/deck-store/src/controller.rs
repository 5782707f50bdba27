//! # Deck Controller
//!
//! The command interface an outside agent uses to manipulate a deck, with a
//! fixed method set: add, update, delete, reorder, duplicate, export,
//! import, plus undo/redo over whole-deck snapshots.
//!
//! ## History
//!
//! After each successful mutation the full ordered section list is pushed
//! through a [`SharedHistory`]. Undo and redo restore a snapshot with
//! [`SectionStore::replace_all`]; if that write fails the cursor is moved
//! back so history and medium stay in step. Loading a deck (import,
//! [`DeckController::reload`]) resets the history.
//!
//! Snapshots cover sections only. Locale overrides of a deleted section are
//! therefore kept while the delete can still be undone, and pruned when the
//! history starts over (construction and reload), once no snapshot can bring
//! the section back.
//!
//! Commands are serialized by one lock so a mutation and its history entry
//! are recorded together.
//!
//! ## Control handle
//!
//! [`ControlHandle`] is the single process-wide access point. It is empty
//! until a host mounts a controller and empty again after unmount; while
//! empty every command reports [`StoreError::Unavailable`].

use std::sync::Arc;

use deck_core::{LocaleCode, Section, SectionDraft};
use deck_state::{HistoryStatus, SharedHistory};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::document::{DeckDocument, DocumentFormat};
use crate::error::StoreError;
use crate::generator;
use crate::overrides::{FieldOverrides, OverrideStore};
use crate::resolver::FieldResolver;
use crate::store::SectionStore;

/// Deck command surface over a section store and its locale overrides.
#[derive(Debug)]
pub struct DeckController {
    store: SectionStore,
    overrides: OverrideStore,
    history: SharedHistory<Vec<Section>>,
    command_lock: Mutex<()>,
}

impl DeckController {
    /// Controller whose history starts at the currently stored deck.
    pub fn new(store: SectionStore, overrides: OverrideStore, max_history: usize) -> Self {
        let initial = store.get_all();
        let controller = Self {
            store,
            overrides,
            history: SharedHistory::new(initial.clone(), max_history),
            command_lock: Mutex::new(()),
        };
        controller.prune_overrides(&initial);
        controller
    }

    pub fn store(&self) -> &SectionStore {
        &self.store
    }

    pub fn overrides(&self) -> &OverrideStore {
        &self.overrides
    }

    pub fn resolver(&self) -> FieldResolver {
        FieldResolver::new(self.overrides.clone())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn sections(&self) -> Vec<Section> {
        self.store.get_all()
    }

    pub fn section(&self, id: &str) -> Result<Section, StoreError> {
        self.store
            .get_by_id(id)
            .ok_or_else(|| StoreError::SectionNotFound(id.to_string()))
    }

    pub fn history_status(&self) -> HistoryStatus {
        self.history.status()
    }

    // ── Section commands ─────────────────────────────────────────────

    pub fn add(&self, draft: SectionDraft) -> Result<Section, StoreError> {
        self.record(|store| store.add(draft))
    }

    /// Admit raw generator output and add it as a new section.
    pub fn admit_generated(&self, raw: &str, model: Option<&str>) -> Result<Section, StoreError> {
        let draft = generator::admit(raw, model).map_err(|e| {
            tracing::warn!(error = %e, "generator output rejected");
            e
        })?;
        self.add(draft)
    }

    pub fn update_field(&self, id: &str, field: &str, value: Value) -> Result<Section, StoreError> {
        self.record(|store| store.update_field(id, field, value))
    }

    /// Delete a section. Its locale overrides survive until the history is
    /// reset so that undo brings the translations back too.
    pub fn delete(&self, id: &str) -> Result<Section, StoreError> {
        self.record(|store| store.delete(id))
    }

    pub fn reorder<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Section>, StoreError> {
        self.record(|store| store.reorder(ids))
    }

    pub fn duplicate(&self, id: &str) -> Result<Section, StoreError> {
        self.record(|store| store.duplicate(id))
    }

    // ── Locale overrides ─────────────────────────────────────────────

    pub fn set_locale_override(
        &self,
        id: &str,
        locale: &LocaleCode,
        overrides: FieldOverrides,
    ) -> Result<FieldOverrides, StoreError> {
        self.section(id)?;
        self.overrides.save(id, locale, overrides)
    }

    pub fn clear_locale_override(&self, id: &str, locale: &LocaleCode) -> Result<bool, StoreError> {
        self.overrides.delete(id, locale)
    }

    // ── Export / import ──────────────────────────────────────────────

    pub fn export_document(&self) -> DeckDocument {
        DeckDocument::new(self.store.get_all(), self.overrides.document())
    }

    pub fn export(&self, format: DocumentFormat) -> Result<String, StoreError> {
        format.encode(&self.export_document())
    }

    /// Replace the deck with a decoded document and reset history.
    ///
    /// Overrides are written first. If the section write then fails the
    /// previous overrides are put back, and history is only reset once both
    /// documents are stored.
    pub fn import_document(&self, document: DeckDocument) -> Result<Vec<Section>, StoreError> {
        document.check_version()?;
        let _guard = self.command_lock.lock();
        let previous = self.overrides.try_document().ok();
        self.overrides.replace_all(document.locale_overrides)?;
        let sections = match self.store.replace_all(document.sections) {
            Ok(sections) => sections,
            Err(e) => {
                match previous {
                    Some(previous) => {
                        if let Err(restore) = self.overrides.replace_all(previous) {
                            tracing::error!(
                                error = %restore,
                                "failed to restore locale overrides after rejected import"
                            );
                        }
                    }
                    None => tracing::warn!(
                        "previous locale overrides were unreadable, import left them replaced"
                    ),
                }
                return Err(e);
            }
        };
        self.history.reset(sections.clone());
        tracing::info!(count = sections.len(), "deck imported");
        Ok(sections)
    }

    pub fn import(&self, text: &str, format: DocumentFormat) -> Result<Vec<Section>, StoreError> {
        let document = format.decode(text)?;
        self.import_document(document)
    }

    // ── History ──────────────────────────────────────────────────────

    /// Restore the previous snapshot. `Ok(None)` when there is nothing to undo.
    pub fn undo(&self) -> Result<Option<Vec<Section>>, StoreError> {
        let _guard = self.command_lock.lock();
        let Some(snapshot) = self.history.undo() else {
            return Ok(None);
        };
        match self.store.replace_all(snapshot) {
            Ok(restored) => Ok(Some(restored)),
            Err(e) => {
                self.history.redo();
                Err(e)
            }
        }
    }

    /// Re-apply the next snapshot. `Ok(None)` when there is nothing to redo.
    pub fn redo(&self) -> Result<Option<Vec<Section>>, StoreError> {
        let _guard = self.command_lock.lock();
        let Some(snapshot) = self.history.redo() else {
            return Ok(None);
        };
        match self.store.replace_all(snapshot) {
            Ok(restored) => Ok(Some(restored)),
            Err(e) => {
                self.history.undo();
                Err(e)
            }
        }
    }

    /// Re-read the medium and start a fresh history from it.
    pub fn reload(&self) -> Vec<Section> {
        let _guard = self.command_lock.lock();
        let sections = self.store.get_all();
        self.history.reset(sections.clone());
        self.prune_overrides(&sections);
        sections
    }

    /// Drop overrides of sections no snapshot can restore any more.
    fn prune_overrides(&self, sections: &[Section]) {
        let live = |id: &str| sections.iter().any(|s| s.id == id);
        match self.overrides.retain_sections(live) {
            Ok(0) => {}
            Ok(pruned) => tracing::info!(pruned, "pruned locale overrides of deleted sections"),
            Err(e) => tracing::warn!(error = %e, "failed to prune locale overrides"),
        }
    }

    fn record<R>(&self, f: impl FnOnce(&SectionStore) -> Result<R, StoreError>) -> Result<R, StoreError> {
        let _guard = self.command_lock.lock();
        let result = f(&self.store).map_err(|e| {
            tracing::debug!(error = %e, "deck command rejected");
            e
        })?;
        self.history.set(self.store.get_all());
        Ok(result)
    }
}

/// Process-wide handle to the mounted [`DeckController`].
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    slot: Arc<RwLock<Option<Arc<DeckController>>>>,
}

impl ControlHandle {
    /// An unmounted handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle with `controller` already mounted.
    pub fn mounted(controller: Arc<DeckController>) -> Self {
        let handle = Self::new();
        handle.mount(controller);
        handle
    }

    /// Expose `controller`, replacing any previously mounted one.
    pub fn mount(&self, controller: Arc<DeckController>) {
        *self.slot.write() = Some(controller);
        tracing::info!("control surface mounted");
    }

    /// Tear down the surface, returning the controller that was mounted.
    pub fn unmount(&self) -> Option<Arc<DeckController>> {
        let previous = self.slot.write().take();
        if previous.is_some() {
            tracing::info!("control surface unmounted");
        }
        previous
    }

    pub fn is_mounted(&self) -> bool {
        self.slot.read().is_some()
    }

    /// The mounted controller, or [`StoreError::Unavailable`].
    pub fn get(&self) -> Result<Arc<DeckController>, StoreError> {
        self.slot.read().clone().ok_or(StoreError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;
    use crate::seed::seed_if_empty;
    use deck_core::{DraftMetadata, EditableField, FieldType};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn controller() -> (DeckController, Arc<MemoryBackend>) {
        let (deck, sections, _) = controller_with_overrides();
        (deck, sections)
    }

    fn controller_with_overrides() -> (DeckController, Arc<MemoryBackend>, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new("deck-sections"));
        let store = SectionStore::new(backend.clone());
        seed_if_empty(&store).unwrap();
        let override_backend = Arc::new(MemoryBackend::new("deck-overrides"));
        let overrides = OverrideStore::new(override_backend.clone());
        (DeckController::new(store, overrides, 10), backend, override_backend)
    }

    fn translate(deck: &DeckController, id: &str, locale: &LocaleCode, label: &str) {
        deck.set_locale_override(id, locale, json!({"label": label}).as_object().cloned().unwrap())
            .unwrap();
    }

    fn draft(title: &str) -> SectionDraft {
        let mut fields = BTreeMap::new();
        fields.insert(
            "label".to_string(),
            EditableField::new(FieldType::Text, "Label", json!(title)),
        );
        SectionDraft {
            metadata: DraftMetadata {
                title: title.into(),
                ..Default::default()
            },
            code: "function S({ label }) { return <p>{label}</p>; }".into(),
            editable_fields: fields,
            dependencies: None,
        }
    }

    #[test]
    fn undo_and_redo_restore_whole_deck() {
        let (deck, _) = controller();
        let added = deck.add(draft("Extra")).unwrap();
        assert_eq!(deck.sections().len(), 3);
        assert!(deck.history_status().can_undo);

        let restored = deck.undo().unwrap().unwrap();
        assert_eq!(restored.len(), 2);
        assert!(deck.section(added.id.as_str()).is_err());

        deck.redo().unwrap().unwrap();
        assert_eq!(deck.section(added.id.as_str()).unwrap().metadata.title, "Extra");
        assert!(deck.redo().unwrap().is_none());
    }

    #[test]
    fn rejected_command_records_no_history() {
        let (deck, _) = controller();
        assert!(deck.delete("section-hero").is_err());
        assert!(!deck.history_status().can_undo);
    }

    #[test]
    fn failed_restore_keeps_history_in_step() {
        let (deck, backend) = controller();
        deck.update_field("section-hero", "title", json!("Changed")).unwrap();
        backend.set_fail_writes(true);
        assert!(deck.undo().is_err());
        backend.set_fail_writes(false);
        assert!(deck.history_status().can_undo);
        assert!(!deck.history_status().can_redo);
        let restored = deck.undo().unwrap().unwrap();
        assert_eq!(restored[0].editable_fields["title"].value, json!("Welcome"));
    }

    #[test]
    fn import_resets_history() {
        let (deck, _) = controller();
        deck.duplicate("section-hero").unwrap();
        let text = deck.export(DocumentFormat::Yaml).unwrap();
        deck.add(draft("Later")).unwrap();
        let sections = deck.import(&text, DocumentFormat::Yaml).unwrap();
        assert_eq!(sections.len(), 3);
        assert!(!deck.history_status().can_undo);
    }

    #[test]
    fn failed_override_write_leaves_import_unapplied() {
        let (deck, sections, overrides) = controller_with_overrides();
        let pt = LocaleCode::new("pt").unwrap();
        translate(&deck, "section-hero", &pt, "Olá");
        let mut document = deck.export_document();
        document.sections.truncate(1);
        document.locale_overrides.clear();
        deck.add(draft("Kept")).unwrap();
        let before = sections.raw();

        overrides.set_fail_writes(true);
        assert!(matches!(deck.import_document(document), Err(StoreError::Persistence(_))));
        overrides.set_fail_writes(false);

        assert_eq!(sections.raw(), before);
        assert_eq!(deck.sections().len(), 3);
        assert!(deck.history_status().can_undo);
        assert_eq!(deck.overrides().locales("section-hero"), ["pt"]);
    }

    #[test]
    fn failed_section_write_restores_overrides() {
        let (deck, sections, _) = controller_with_overrides();
        let pt = LocaleCode::new("pt").unwrap();
        translate(&deck, "section-hero", &pt, "Olá");
        deck.add(draft("Kept")).unwrap();
        let mut document = deck.export_document();
        document.locale_overrides.clear();

        sections.set_fail_writes(true);
        assert!(deck.import_document(document).is_err());
        sections.set_fail_writes(false);

        assert_eq!(deck.overrides().load("section-hero", &pt)["label"], json!("Olá"));
        assert!(deck.history_status().can_undo);
    }

    #[test]
    fn undoing_a_delete_brings_translations_back() {
        let (deck, _) = controller();
        let added = deck.add(draft("Temp")).unwrap();
        let id = added.id.as_str();
        let pt = LocaleCode::new("pt").unwrap();
        translate(&deck, id, &pt, "Temporário");

        deck.delete(id).unwrap();
        deck.undo().unwrap().unwrap();
        assert_eq!(deck.overrides().load(id, &pt)["label"], json!("Temporário"));

        deck.delete(id).unwrap();
        deck.reload();
        assert!(deck.overrides().locales(id).is_empty());
    }

    #[test]
    fn overrides_require_an_existing_section() {
        let (deck, _) = controller();
        let pt = LocaleCode::new("pt").unwrap();
        assert!(matches!(
            deck.set_locale_override("ghost", &pt, FieldOverrides::new()),
            Err(StoreError::SectionNotFound(_))
        ));
    }

    #[test]
    fn generator_rejection_leaves_deck_unchanged() {
        let (deck, backend) = controller();
        let before = backend.raw();
        assert!(matches!(
            deck.admit_generated("not json at all", None),
            Err(StoreError::Generator(_))
        ));
        assert_eq!(backend.raw(), before);
    }

    #[test]
    fn handle_reports_unavailable_until_mounted() {
        let (deck, _) = controller();
        let handle = ControlHandle::new();
        assert!(matches!(handle.get(), Err(StoreError::Unavailable)));
        handle.mount(Arc::new(deck));
        let shared = handle.clone();
        assert_eq!(shared.get().unwrap().sections().len(), 2);
        assert!(handle.unmount().is_some());
        assert!(!shared.is_mounted());
    }
}
