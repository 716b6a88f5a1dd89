//! JSON-file [`DraftStore`].
//!
//! The whole store is one JSON object of `key -> string` pairs. It is read
//! once on open, kept in memory, and rewritten on every mutation through a
//! temporary file plus rename so a crash never leaves a half-written file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use hrdesk_core::error::CoreError;
use hrdesk_core::ports::DraftStore;

/// Errors from the file-backed draft store.
#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Draft file {path} is not a JSON string map: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Draft store lock poisoned")]
    Poisoned,
}

impl From<FileStoreError> for CoreError {
    fn from(err: FileStoreError) -> Self {
        CoreError::Storage(err.to_string())
    }
}

/// Draft store persisted to a single JSON file.
pub struct FileDraftStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileDraftStore {
    /// Open the store at `path`, creating it lazily on first write.
    ///
    /// A missing file is an empty store. A file that does not parse is an
    /// error rather than silently discarded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| FileStoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(FileStoreError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), drafts = entries.len(), "Opened draft file");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored drafts.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), FileStoreError> {
        let io_err = |source| FileStoreError::Io {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(entries).map_err(|source| {
            FileStoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn mutate(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), FileStoreError> {
        let mut entries = self.entries.write().map_err(|_| FileStoreError::Poisoned)?;
        let mut next = entries.clone();
        if f(&mut next) {
            // Memory only moves once the file does.
            self.persist(&next)?;
            *entries = next;
        }
        Ok(())
    }
}

impl DraftStore for FileDraftStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError> {
        let entries = self.entries.read().map_err(|_| FileStoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })?;
        tracing::trace!(key, "Draft written to file");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CoreError> {
        self.mutate(|entries| entries.remove(key).is_some())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::open(dir.path().join("drafts.json")).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.get_item("web-policy-details:1").unwrap(), None);
    }

    #[test]
    fn remove_of_unknown_key_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");
        let store = FileDraftStore::open(&path).unwrap();
        store.remove_item("emailtpl:draft:new").unwrap();
        assert!(!path.exists());
    }
}
