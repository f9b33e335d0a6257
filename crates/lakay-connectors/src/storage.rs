//! Durable key-value storage — the local persistence behind the connector
//! list and the user identity.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lakay_core::{Error, Result};
use parking_lot::RwLock;
use tracing::warn;

use crate::types::{ConnectorRecord, CONNECTORS_STORAGE_KEY};

/// String-keyed, string-valued persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per key under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::InvalidInput(format!("storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("read {}: {}", key, e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)
            .and_then(|_| std::fs::write(path, value))
            .map_err(|e| Error::Storage(format!("write {}: {}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("remove {}: {}", key, e))),
        }
    }
}

/// In-process storage; nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Read the persisted connector list, treating missing or malformed data as empty.
pub fn load_connectors(storage: &dyn KeyValueStore) -> Vec<ConnectorRecord> {
    match storage.get(CONNECTORS_STORAGE_KEY) {
        Ok(Some(data)) => serde_json::from_str(&data).unwrap_or_else(|e| {
            warn!("Discarding malformed connector list: {}", e);
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Failed to load connectors: {}", e);
            Vec::new()
        }
    }
}

/// Persist the full connector list.
pub fn save_connectors(storage: &dyn KeyValueStore, records: &[ConnectorRecord]) -> Result<()> {
    let data = serde_json::to_string_pretty(records)?;
    storage.set(CONNECTORS_STORAGE_KEY, &data)
}
