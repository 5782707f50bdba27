//! # Field Resolver
//!
//! Computes the effective field values of a section for a locale. For each
//! key of `editableFields`, a locale override (if any) is deep-merged onto
//! the author-specified value; otherwise the author value is used as is.
//! Override keys that name no editable field are ignored.

use deck_core::{deep_merge, FieldValues, LocaleCode, Section};

use crate::overrides::{FieldOverrides, OverrideStore};

/// Layer `overrides` over the author values of `section`.
pub fn resolve_fields(section: &Section, overrides: &FieldOverrides) -> FieldValues {
    section
        .editable_fields
        .iter()
        .map(|(name, field)| {
            let value = match overrides.get(name) {
                Some(over) => deep_merge(&field.value, over),
                None => field.value.clone(),
            };
            (name.clone(), value)
        })
        .collect()
}

/// Resolves field values against stored locale overrides.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    overrides: OverrideStore,
}

impl FieldResolver {
    pub fn new(overrides: OverrideStore) -> Self {
        Self { overrides }
    }

    /// Effective values of `section`. Without a locale, the author values.
    pub fn resolve(&self, section: &Section, locale: Option<&LocaleCode>) -> FieldValues {
        match locale {
            Some(locale) => {
                let overrides = self.overrides.load(section.id.as_str(), locale);
                resolve_fields(section, &overrides)
            }
            None => section.field_values(),
        }
    }

    /// Effective values of every section, loading the override document once.
    pub fn resolve_all<'a>(
        &self,
        sections: &'a [Section],
        locale: Option<&LocaleCode>,
    ) -> Vec<(&'a Section, FieldValues)> {
        let Some(locale) = locale else {
            return sections.iter().map(|s| (s, s.field_values())).collect();
        };
        let document = self.overrides.document();
        let empty = FieldOverrides::new();
        sections
            .iter()
            .map(|section| {
                let overrides = document
                    .get(section.id.as_str())
                    .and_then(|locales| locales.get(locale.as_str()))
                    .unwrap_or(&empty);
                (section, resolve_fields(section, overrides))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryBackend;
    use crate::seed::default_sections;
    use deck_core::Timestamp;
    use serde_json::json;
    use std::sync::Arc;

    fn overrides(value: serde_json::Value) -> FieldOverrides {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn override_wins_and_missing_keys_fall_back() {
        let section = &default_sections(Timestamp::now())[0];
        let resolved = resolve_fields(section, &overrides(json!({"title": "Bem-vindo"})));
        assert_eq!(resolved["title"], json!("Bem-vindo"));
        assert_eq!(resolved["subtitle"], section.editable_fields["subtitle"].value);
    }

    #[test]
    fn unknown_override_keys_are_ignored() {
        let section = &default_sections(Timestamp::now())[0];
        let resolved = resolve_fields(section, &overrides(json!({"ghost": 1})));
        assert!(!resolved.contains_key("ghost"));
        assert_eq!(resolved.len(), section.editable_fields.len());
    }

    #[test]
    fn resolver_reads_stored_overrides() {
        let store = OverrideStore::new(Arc::new(MemoryBackend::new("deck-overrides")));
        let sections = default_sections(Timestamp::now());
        let pt = LocaleCode::new("pt-BR").unwrap();
        store
            .save(sections[0].id.as_str(), &pt, overrides(json!({"title": "Olá"})))
            .unwrap();
        let resolver = FieldResolver::new(store);

        assert_eq!(resolver.resolve(&sections[0], Some(&pt))["title"], json!("Olá"));
        assert_eq!(resolver.resolve(&sections[0], None), sections[0].field_values());

        let all = resolver.resolve_all(&sections, Some(&pt));
        assert_eq!(all[0].1["title"], json!("Olá"));
        assert_eq!(all[1].1, sections[1].field_values());
    }
}
