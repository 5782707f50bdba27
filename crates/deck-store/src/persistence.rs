//! # Persistence Backends
//!
//! Each backend instance owns exactly one JSON document: the section
//! collection or the locale-override mapping. Every write replaces the whole
//! document in one step.
//!
//! - [`FileBackend`] writes to a temporary sibling and renames it over the
//!   target, so readers observe either the old or the new document and never
//!   a partial write. A missing file reads as "no data yet".
//! - [`MemoryBackend`] keeps the serialized document as a string, the same
//!   shape browser-local storage holds. Writes can be made to fail for
//!   exercising error paths.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use deck_core::{PersistenceError, Section};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::overrides::OverrideDocument;

/// File name of the section collection inside a data directory.
pub const SECTIONS_FILE: &str = "sections.json";
/// File name of the locale-override document inside a data directory.
pub const OVERRIDES_FILE: &str = "locale-overrides.json";

/// Medium for the section collection.
pub trait SectionBackend: Send + Sync + std::fmt::Debug {
    /// Load the stored collection. A medium with nothing stored yields an empty list.
    fn load(&self) -> Result<Vec<Section>, PersistenceError>;

    /// Replace the stored collection.
    fn save_all(&self, sections: &[Section]) -> Result<(), PersistenceError>;
}

/// Medium for the locale-override document.
pub trait OverrideBackend: Send + Sync + std::fmt::Debug {
    /// Load the whole override document.
    fn load_all(&self) -> Result<OverrideDocument, PersistenceError>;

    /// Replace the whole override document.
    fn save_all(&self, document: &OverrideDocument) -> Result<(), PersistenceError>;
}

// ─── File ────────────────────────────────────────────────────────────

/// JSON document on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend for the section collection inside `dir`.
    pub fn sections_in(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SECTIONS_FILE))
    }

    /// Backend for the override document inside `dir`.
    pub fn overrides_in(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(OVERRIDES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read<T: DeserializeOwned + Default>(&self) -> Result<T, PersistenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&raw).map_err(|source| PersistenceError::Parse {
            medium: self.path.display().to_string(),
            source,
        })
    }

    fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(PersistenceError::Encode)?;
        let io_err = |source| PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl SectionBackend for FileBackend {
    fn load(&self) -> Result<Vec<Section>, PersistenceError> {
        self.read()
    }

    fn save_all(&self, sections: &[Section]) -> Result<(), PersistenceError> {
        self.write(sections)
    }
}

impl OverrideBackend for FileBackend {
    fn load_all(&self) -> Result<OverrideDocument, PersistenceError> {
        self.read()
    }

    fn save_all(&self, document: &OverrideDocument) -> Result<(), PersistenceError> {
        self.write(document)
    }
}

// ─── Memory ──────────────────────────────────────────────────────────

/// Serialized document held in process memory under a storage key.
#[derive(Debug)]
pub struct MemoryBackend {
    key: String,
    slot: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slot: Mutex::new(None),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Start with raw stored text, valid or not.
    pub fn with_raw(key: impl Into<String>, raw: impl Into<String>) -> Self {
        let backend = Self::new(key);
        *backend.slot.lock() = Some(raw.into());
        backend
    }

    /// The raw stored text, if anything was written.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().clone()
    }

    /// Make subsequent writes fail as if the medium were full.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read<T: DeserializeOwned + Default>(&self) -> Result<T, PersistenceError> {
        match self.slot.lock().as_deref() {
            None => Ok(T::default()),
            Some(raw) => serde_json::from_str(raw).map_err(|source| PersistenceError::Parse {
                medium: self.key.clone(),
                source,
            }),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(format!(
                "quota exceeded for {}",
                self.key
            )));
        }
        let raw = serde_json::to_string(value).map_err(PersistenceError::Encode)?;
        *self.slot.lock() = Some(raw);
        Ok(())
    }
}

impl SectionBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<Section>, PersistenceError> {
        self.read()
    }

    fn save_all(&self, sections: &[Section]) -> Result<(), PersistenceError> {
        self.write(sections)
    }
}

impl OverrideBackend for MemoryBackend {
    fn load_all(&self) -> Result<OverrideDocument, PersistenceError> {
        self.read()
    }

    fn save_all(&self, document: &OverrideDocument) -> Result<(), PersistenceError> {
        self.write(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::default_sections;
    use deck_core::Timestamp;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::sections_in(dir.path());
        assert!(SectionBackend::load(&backend).unwrap().is_empty());
    }

    #[test]
    fn file_round_trip_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::sections_in(dir.path().join("nested"));
        let sections = default_sections(Timestamp::now());
        SectionBackend::save_all(&backend, &sections).unwrap();
        assert_eq!(SectionBackend::load(&backend).unwrap(), sections);
        let names: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![SECTIONS_FILE.to_string()]);
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::sections_in(dir.path());
        fs::write(backend.path(), "{ not json").unwrap();
        let err = SectionBackend::load(&backend).unwrap_err();
        assert!(matches!(err, PersistenceError::Parse { .. }));
    }

    #[test]
    fn memory_backend_can_refuse_writes() {
        let backend = MemoryBackend::new("deck-sections");
        backend.set_fail_writes(true);
        let err = SectionBackend::save_all(&backend, &[]).unwrap_err();
        assert!(matches!(err, PersistenceError::Unavailable(_)));
        assert!(backend.raw().is_none());
        backend.set_fail_writes(false);
        SectionBackend::save_all(&backend, &[]).unwrap();
        assert_eq!(backend.raw().as_deref(), Some("[]"));
    }
}
