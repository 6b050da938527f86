//! Local key/value persistence.
//!
//! The cart and session are mirrored into a durable local store after every
//! mutation so a process restart reproduces the same state. Values are JSON
//! documents keyed by short well-known names.
//!
//! Reads tolerate absent or malformed data (both load as "no prior state");
//! writes are best-effort: a failed write is logged and swallowed because the
//! in-memory state stays correct and the next mutation rewrites the full
//! value anyway.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Key for the persisted shopping cart.
    pub const CART: &str = "abshine_cart";

    /// Key for the persisted user session.
    pub const USER: &str = "abshine_user";
}

/// Errors that can occur writing to the local store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A durable local key/value store.
///
/// Implementations hold raw JSON strings; use [`load`] and [`save`] for
/// typed access.
pub trait Storage {
    /// Read the raw value stored under `key`, if any.
    fn read(&self, key: &str) -> Option<String>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the underlying store rejects the write
    /// (e.g. disk full or permission denied).
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`, if any.
    fn remove(&mut self, key: &str);
}

/// Load a typed value from storage.
///
/// Returns `None` when the key is absent or the stored JSON fails to parse;
/// callers treat both as "no prior state".
pub fn load<T: DeserializeOwned>(storage: &impl Storage, key: &str) -> Option<T> {
    let raw = storage.read(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, %error, "discarding malformed persisted state");
            None
        }
    }
}

/// Save a typed value to storage.
///
/// Write failures are logged and swallowed: the state is still correct in
/// memory and will be written again on the next mutation.
pub fn save<T: Serialize>(storage: &mut impl Storage, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(key, %error, "failed to serialize state for persistence");
            return;
        }
    };
    if let Err(error) = storage.write(key, &raw) {
        tracing::warn!(key, %error, "failed to persist state; keeping in-memory copy");
    }
}

/// File-backed storage: one JSON document per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a file-backed store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// The directory backing this store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }
}

/// In-memory storage for tests and ephemeral runs.
///
/// Clones share the same underlying map, the way two handles to one browsing
/// origin's store would; a "restarted" client over a clone sees everything
/// the previous one wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: std::sync::Arc<std::sync::Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
    }
}
