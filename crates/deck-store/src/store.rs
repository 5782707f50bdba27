//! # Section Store
//!
//! CRUD and ordering over one deck's sections, persisted as a single
//! whole-collection write per mutation.
//!
//! ## Invariants
//!
//! - Every persisted collection is sorted by `order`, and `order` is dense
//!   and zero-based. Each mutation re-densifies before writing.
//! - Ids are unique within the collection.
//! - A rejected mutation performs no write, so the medium is byte-for-byte
//!   unchanged.
//!
//! ## Failure policy
//!
//! [`SectionStore::get_all`] degrades any load failure to an empty list and
//! logs it, since missing state is a legitimate first run. Mutations refuse
//! to proceed on a load failure instead, so a corrupt document is never
//! overwritten with an empty one. A failed save is reported to the caller;
//! nothing is rolled back in memory because the store keeps no cache.
//!
//! Within one process, read-modify-write cycles are serialized by a mutex.
//! Separate processes sharing a medium get last-write-wins.

use std::collections::HashSet;
use std::sync::Arc;

use deck_core::{Section, SectionDraft, SectionId, Timestamp, ValidationError};
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::StoreError;
use crate::persistence::SectionBackend;

/// Section Store over a pluggable [`SectionBackend`].
#[derive(Debug, Clone)]
pub struct SectionStore {
    backend: Arc<dyn SectionBackend>,
    write_lock: Arc<Mutex<()>>,
}

impl SectionStore {
    pub fn new(backend: Arc<dyn SectionBackend>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// All sections in ascending `order`. Never fails.
    pub fn get_all(&self) -> Vec<Section> {
        match self.backend.load() {
            Ok(mut sections) => {
                sections.sort_by_key(|s| s.order);
                sections
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load sections, treating as empty");
                Vec::new()
            }
        }
    }

    /// All sections in ascending `order`, surfacing load failures.
    pub fn try_get_all(&self) -> Result<Vec<Section>, StoreError> {
        let mut sections = self.backend.load()?;
        sections.sort_by_key(|s| s.order);
        Ok(sections)
    }

    /// Linear lookup by id.
    pub fn get_by_id(&self, id: &str) -> Option<Section> {
        self.get_all().into_iter().find(|s| s.id == id)
    }

    /// Number of stored sections.
    pub fn count(&self) -> usize {
        self.get_all().len()
    }

    /// Upsert by id: replace wholesale if present, append otherwise.
    ///
    /// A new id always lands at the end of the deck, whatever `order` it
    /// carries.
    pub fn save(&self, mut section: Section) -> Result<Section, StoreError> {
        self.mutate(|sections| {
            let id = section.id.clone();
            match sections.iter_mut().find(|s| s.id == section.id) {
                Some(existing) => *existing = section,
                None => {
                    section.order = sections.len();
                    sections.push(section);
                }
            }
            densify(sections);
            find_cloned(sections, id.as_str())
        })
    }

    /// Remove a deletable section and close the gap in `order`.
    pub fn delete(&self, id: &str) -> Result<Section, StoreError> {
        self.mutate(|sections| {
            let position = sections
                .iter()
                .position(|s| s.id == id)
                .ok_or_else(|| StoreError::SectionNotFound(id.to_string()))?;
            if let Some(reason) = sections[position].deletion_blocker() {
                tracing::debug!(section = id, reason, "delete refused");
                return Err(StoreError::Protected {
                    id: id.to_string(),
                    reason,
                });
            }
            let removed = sections.remove(position);
            densify(sections);
            Ok(removed)
        })
    }

    /// Rewrite `order` to match the position of each id in `ids`.
    ///
    /// Stored sections missing from `ids` are dropped from the persisted
    /// output; callers must pass the complete list. Ids in `ids` that do not
    /// exist are ignored.
    pub fn reorder<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Section>, StoreError> {
        if ids.is_empty() {
            return Err(StoreError::InvalidOrder("order list is empty".into()));
        }
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id.as_ref()) {
                return Err(StoreError::InvalidOrder(format!(
                    "id {} appears more than once",
                    id.as_ref()
                )));
            }
        }

        self.mutate(|sections| {
            let mut reordered = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(pos) = sections.iter().position(|s| s.id == id.as_ref()) {
                    reordered.push(sections.swap_remove(pos));
                }
            }
            if !sections.is_empty() {
                let dropped: Vec<&str> = sections.iter().map(|s| s.id.as_str()).collect();
                tracing::warn!(?dropped, "reorder omitted stored sections, dropping them");
            }
            for (index, section) in reordered.iter_mut().enumerate() {
                section.order = index;
            }
            *sections = reordered;
            Ok(sections.clone())
        })
    }

    /// Set one field value and bump `updatedAt`.
    pub fn update_field(&self, id: &str, field: &str, value: Value) -> Result<Section, StoreError> {
        self.mutate(|sections| {
            let section = sections
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| StoreError::SectionNotFound(id.to_string()))?;
            if !section.set_field_value(field, value, Timestamp::now()) {
                return Err(StoreError::FieldNotFound {
                    section: id.to_string(),
                    field: field.to_string(),
                });
            }
            Ok(section.clone())
        })
    }

    /// Create a section from a draft at the end of the deck.
    pub fn add(&self, draft: SectionDraft) -> Result<Section, StoreError> {
        draft.validate()?;
        self.mutate(|sections| {
            let mut id = SectionId::generate();
            while sections.iter().any(|s| s.id == id) {
                id = SectionId::generate();
            }
            let section = draft.into_section(id, sections.len(), Timestamp::now());
            sections.push(section.clone());
            Ok(section)
        })
    }

    /// Copy a section under a fresh id directly after the original.
    pub fn duplicate(&self, id: &str) -> Result<Section, StoreError> {
        self.mutate(|sections| {
            let position = sections
                .iter()
                .position(|s| s.id == id)
                .ok_or_else(|| StoreError::SectionNotFound(id.to_string()))?;
            let copy = sections[position].duplicate(Timestamp::now());
            let copy_id = copy.id.clone();
            sections.insert(position + 1, copy);
            for (index, section) in sections.iter_mut().enumerate() {
                section.order = index;
            }
            find_cloned(sections, copy_id.as_str())
        })
    }

    /// Replace the whole collection (import, history restore).
    pub fn replace_all(&self, mut sections: Vec<Section>) -> Result<Vec<Section>, StoreError> {
        let mut ids = HashSet::with_capacity(sections.len());
        for section in &sections {
            if !ids.insert(section.id.as_str()) {
                return Err(ValidationError::DuplicateId(section.id.to_string()).into());
            }
        }
        densify(&mut sections);

        let _guard = self.write_lock.lock();
        self.persist(&sections)?;
        Ok(sections)
    }

    /// Load, apply `f`, and persist if `f` succeeded.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Vec<Section>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let _guard = self.write_lock.lock();
        let mut sections = self.backend.load().map_err(|e| {
            tracing::error!(error = %e, "refusing to mutate sections after load failure");
            e
        })?;
        sections.sort_by_key(|s| s.order);
        let result = f(&mut sections)?;
        self.persist(&sections)?;
        Ok(result)
    }

    fn persist(&self, sections: &[Section]) -> Result<(), StoreError> {
        self.backend.save_all(sections).map_err(|e| {
            tracing::error!(error = %e, "failed to persist sections");
            StoreError::from(e)
        })
    }
}

/// Sort by `order` (stable, so ties keep their current relative position)
/// and renumber from zero.
pub fn densify(sections: &mut [Section]) {
    sections.sort_by_key(|s| s.order);
    for (index, section) in sections.iter_mut().enumerate() {
        section.order = index;
    }
}

fn find_cloned(sections: &[Section], id: &str) -> Result<Section, StoreError> {
    sections
        .iter()
        .find(|s| s.id == id)
        .cloned()
        .ok_or_else(|| StoreError::SectionNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;
    use crate::seed::default_sections;
    use deck_core::{DraftMetadata, EditableField, FieldType};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn store_with(sections: Vec<Section>) -> (SectionStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new("deck-sections"));
        let store = SectionStore::new(backend.clone());
        store.replace_all(sections).unwrap();
        (store, backend)
    }

    fn draft(title: &str) -> SectionDraft {
        let mut fields = BTreeMap::new();
        fields.insert(
            "title".to_string(),
            EditableField::new(FieldType::Text, "Title", json!(title)),
        );
        SectionDraft {
            metadata: DraftMetadata {
                title: title.to_string(),
                ..Default::default()
            },
            code: "function Slide({ title }) { return <h1>{title}</h1>; }".into(),
            editable_fields: fields,
            dependencies: None,
        }
    }

    fn abc() -> (SectionStore, Arc<MemoryBackend>, Vec<String>) {
        let (store, backend) = store_with(Vec::new());
        let ids = ["A", "B", "C"]
            .iter()
            .map(|t| store.add(draft(t)).unwrap().id.to_string())
            .collect();
        (store, backend, ids)
    }

    #[test]
    fn add_assigns_order_equal_to_count() {
        let (store, _, ids) = abc();
        let all = store.get_all();
        assert_eq!(all.len(), 3);
        for (i, s) in all.iter().enumerate() {
            assert_eq!(s.order, i);
            assert_eq!(s.id.as_str(), ids[i]);
            assert!(!s.metadata.is_default);
        }
    }

    #[test]
    fn reorder_matches_positional_index() {
        let (store, _, ids) = abc();
        let (a, b, c) = (&ids[0], &ids[1], &ids[2]);
        store.reorder(&[c, a, b]).unwrap();
        assert_eq!(store.get_by_id(a).unwrap().order, 1);
        assert_eq!(store.get_by_id(b).unwrap().order, 2);
        assert_eq!(store.get_by_id(c).unwrap().order, 0);
    }

    #[test]
    fn reorder_with_current_order_is_idempotent() {
        let (store, _, ids) = abc();
        let before = store.get_all();
        store.reorder(&ids).unwrap();
        assert_eq!(store.get_all(), before);
    }

    #[test]
    fn reorder_drops_omitted_and_ignores_unknown() {
        let (store, _, ids) = abc();
        let result = store.reorder(&[ids[2].as_str(), "ghost", ids[0].as_str()]).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(store.count(), 2);
        assert!(store.get_by_id(&ids[1]).is_none());
        assert_eq!(store.get_by_id(&ids[0]).unwrap().order, 1);
    }

    #[test]
    fn reorder_rejects_duplicates_and_empty_lists() {
        let (store, backend, ids) = abc();
        let before = backend.raw();
        assert!(matches!(
            store.reorder(&[ids[0].as_str(), ids[0].as_str()]),
            Err(StoreError::InvalidOrder(_))
        ));
        assert!(matches!(
            store.reorder::<&str>(&[]),
            Err(StoreError::InvalidOrder(_))
        ));
        assert_eq!(backend.raw(), before);
    }

    #[test]
    fn update_field_sets_value_and_timestamp_only() {
        let (store, _, ids) = abc();
        let before = store.get_by_id(&ids[0]).unwrap();
        let after = store.update_field(&ids[0], "title", json!("Hello")).unwrap();
        assert_eq!(after.editable_fields["title"].value, json!("Hello"));
        assert!(after.metadata.updated_at >= before.metadata.updated_at);
        assert_eq!(after.code, before.code);
        assert_eq!(after.order, before.order);
        assert_eq!(after.metadata.title, before.metadata.title);
    }

    #[test]
    fn update_field_failure_leaves_medium_untouched() {
        let (store, backend, ids) = abc();
        let before = backend.raw();
        assert!(matches!(
            store.update_field("missing", "title", json!("Hello")),
            Err(StoreError::SectionNotFound(_))
        ));
        assert!(matches!(
            store.update_field(&ids[0], "nope", json!(1)),
            Err(StoreError::FieldNotFound { .. })
        ));
        assert_eq!(backend.raw(), before);
    }

    #[test]
    fn delete_protects_default_and_non_deletable() {
        let (store, backend) = store_with(default_sections(Timestamp::now()));
        let hero = store.get_all()[0].id.to_string();
        let before = backend.raw();
        assert!(matches!(store.delete(&hero), Err(StoreError::Protected { .. })));
        assert_eq!(backend.raw(), before);

        let mut locked = store.add(draft("Locked")).unwrap();
        locked.metadata.is_deletable = false;
        store.save(locked.clone()).unwrap();
        assert!(store.delete(locked.id.as_str()).is_err());
        assert!(matches!(store.delete("ghost"), Err(StoreError::SectionNotFound(_))));
    }

    #[test]
    fn delete_removes_exactly_one_and_redensifies() {
        let (store, _, ids) = abc();
        let removed = store.delete(&ids[1]).unwrap();
        assert_eq!(removed.id.as_str(), ids[1]);
        let orders: Vec<usize> = store.get_all().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn duplicate_inserts_after_original() {
        let (store, _, ids) = abc();
        let copy = store.duplicate(&ids[0]).unwrap();
        let all = store.get_all();
        assert_eq!(all[1].id, copy.id);
        assert_eq!(copy.order, 1);
        assert_eq!(copy.metadata.title, "A (copy)");
        assert_eq!(all[2].id.as_str(), ids[1]);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn save_upserts_wholesale() {
        let (store, _, ids) = abc();
        let mut b = store.get_by_id(&ids[1]).unwrap();
        b.code = "function B() { return null; }".into();
        store.save(b.clone()).unwrap();
        assert_eq!(store.get_by_id(&ids[1]).unwrap().code, b.code);
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn save_appends_new_ids_at_the_end() {
        let (store, _, ids) = abc();
        let mut fresh = store.get_by_id(&ids[0]).unwrap();
        fresh.id = SectionId::new("fresh").unwrap();
        fresh.order = 0;
        let saved = store.save(fresh).unwrap();
        assert_eq!(saved.order, 3);
        let order: Vec<_> = store.get_all().into_iter().map(|s| s.id.to_string()).collect();
        assert_eq!(order, [ids[0].as_str(), ids[1].as_str(), ids[2].as_str(), "fresh"]);
    }

    #[test]
    fn replace_all_rejects_duplicate_ids() {
        let (store, _, _) = abc();
        let mut all = store.get_all();
        all[1].id = all[0].id.clone();
        assert!(matches!(
            store.replace_all(all),
            Err(StoreError::Validation(ValidationError::DuplicateId(_)))
        ));
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn corrupt_medium_reads_empty_but_blocks_mutation() {
        let backend = Arc::new(MemoryBackend::with_raw("deck-sections", "not json"));
        let store = SectionStore::new(backend.clone());
        assert!(store.get_all().is_empty());
        assert!(matches!(store.add(draft("X")), Err(StoreError::Persistence(_))));
        assert_eq!(backend.raw().as_deref(), Some("not json"));
    }

    #[test]
    fn save_failure_is_surfaced() {
        let (store, backend, ids) = abc();
        backend.set_fail_writes(true);
        let err = store.update_field(&ids[0], "title", json!("x")).unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
        backend.set_fail_writes(false);
        assert_eq!(store.get_by_id(&ids[0]).unwrap().editable_fields["title"].value, json!("A"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::persistence::MemoryBackend;
    use crate::seed::default_sections;
    use proptest::prelude::*;

    fn deck(n: usize) -> Vec<Section> {
        let now = Timestamp::now();
        let template = default_sections(now).remove(0);
        (0..n)
            .map(|i| {
                let mut s = template.clone();
                s.id = SectionId::new(format!("s{i}")).unwrap();
                s.order = i;
                s
            })
            .collect()
    }

    proptest! {
        /// Reordering with any permutation makes order equal the input position.
        #[test]
        fn reorder_permutation(perm in (1usize..8).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())) {
            let store = SectionStore::new(Arc::new(MemoryBackend::new("deck-sections")));
            store.replace_all(deck(perm.len())).unwrap();
            let ids: Vec<String> = perm.iter().map(|i| format!("s{i}")).collect();
            let result = store.reorder(&ids).unwrap();
            for (pos, id) in ids.iter().enumerate() {
                prop_assert_eq!(result[pos].id.as_str(), id.as_str());
                prop_assert_eq!(store.get_by_id(id).unwrap().order, pos);
            }
        }

        /// Orders stay dense after any sequence of deletes and duplicates.
        #[test]
        fn orders_stay_dense(ops in prop::collection::vec((any::<bool>(), 0usize..6), 0..12)) {
            let store = SectionStore::new(Arc::new(MemoryBackend::new("deck-sections")));
            store.replace_all(deck(4)).unwrap();
            for (dup, pick) in ops {
                let all = store.get_all();
                if all.is_empty() {
                    break;
                }
                let id = all[pick % all.len()].id.to_string();
                let _ = if dup { store.duplicate(&id).map(|_| ()) } else { store.delete(&id).map(|_| ()) };
                let orders: Vec<usize> = store.get_all().iter().map(|s| s.order).collect();
                prop_assert_eq!(orders, (0..store.count()).collect::<Vec<_>>());
            }
        }
    }
}
