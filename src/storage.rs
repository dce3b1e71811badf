use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to write storage file: {0}")]
    WriteError(#[from] std::io::Error),
    #[error("failed to serialize storage: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Key-value store persisted as a single JSON object on disk
#[derive(Debug)]
pub struct JsonStorage {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl JsonStorage {
    /// Load storage from disk. A missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::read_entries(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn read_entries(path: &Path) -> Map<String, Value> {
        if !path.exists() {
            return Map::new();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(entries) => {
                    debug!(path = %path.display(), keys = entries.len(), "loaded storage");
                    entries
                }
                Err(e) => {
                    error!(path = %path.display(), "failed to parse storage: {}", e);
                    Map::new()
                }
            },
            Err(e) => {
                error!(path = %path.display(), "failed to read storage: {}", e);
                Map::new()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Set a value and write the store back to disk
    pub fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value);
        self.save()
    }

    /// Remove a value and write the store back to disk
    pub fn remove(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let removed = self.lock().remove(key);
        self.save()?;
        Ok(removed)
    }

    pub fn save(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&*self.lock())?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Map<String, Value>> {
        // A poisoned map is still a valid map
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
