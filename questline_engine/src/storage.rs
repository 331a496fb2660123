//! Durable key-value storage for ledger documents.
//!
//! Each ledger owns one whole document under a stable key and rewrites it on
//! every mutation. Storage is best-effort: [`load_document`] and
//! [`save_document`] log failures and carry on, so a broken backend costs
//! durability but never gameplay.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::slug::key_file_stem;

/// Whole-document key-value storage.
pub trait SaveStore {
    /// Read the document stored under `key`, if any.
    ///
    /// # Errors
    /// Backend failures other than "not found".
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the document under `key`.
    ///
    /// # Errors
    /// Backend write failures.
    fn write(&self, key: &str, document: &str) -> Result<(), StoreError>;

    /// Delete the document under `key`. Missing keys are not an error.
    ///
    /// # Errors
    /// Backend failures.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store, used for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RefCell<HashMap<String, String>>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, simulating an unavailable backend.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Raw document text, for inspection.
    pub fn document(&self, key: &str) -> Option<String> {
        self.documents.borrow().get(key).cloned()
    }

    /// Overwrite a document directly, bypassing any ledger.
    pub fn insert_raw(&self, key: &str, document: &str) {
        self.documents.borrow_mut().insert(key.to_string(), document.to_string());
    }
}

impl SaveStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.documents.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, document: &str) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable(format!("write to '{key}' refused")));
        }
        self.documents.borrow_mut().insert(key.to_string(), document.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.documents.borrow_mut().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory (normally a save slot).
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key_file_stem(key)))
    }
}

impl SaveStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, document: &str) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        // write beside the target and rename so a crash never leaves half a document
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, document).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        debug!("wrote {} bytes to {}", document.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Load and decode the document under `key`.
///
/// Missing, unreadable or malformed documents yield `T::default()`; the cause
/// is logged with `label` so the owning ledger can be identified.
pub fn load_document<T>(store: &dyn SaveStore, key: &str, label: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("{label}: no saved document under '{key}', starting empty");
            return T::default();
        },
        Err(err) => {
            warn!("{label}: failed to read saved state: {err}");
            return T::default();
        },
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("{label}: saved document '{key}' is corrupt, starting empty: {err}");
            T::default()
        },
    }
}

/// Encode and write `value` under `key`. Returns whether the write landed.
pub fn save_document<T: Serialize>(store: &dyn SaveStore, key: &str, label: &str, value: &T) -> bool {
    let result = serde_json::to_string(value)
        .map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })
        .and_then(|doc| store.write(key, &doc));
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!("{label}: failed to save: {err}");
            false
        },
    }
}
