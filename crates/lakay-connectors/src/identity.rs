//! Identifier store — the locally persisted customer/agent identity pair.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::storage::KeyValueStore;
use crate::types::{UserIdentity, IDENTITY_STORAGE_KEY};

/// Owns the process-wide identity: created lazily on first access, replaced
/// only through [`IdentifierStore::regenerate`].
pub struct IdentifierStore {
    storage: Arc<dyn KeyValueStore>,
    current: Mutex<Option<UserIdentity>>,
}

impl IdentifierStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            current: Mutex::new(None),
        }
    }

    /// Return the identity, loading or generating it on first use.
    pub fn get(&self) -> UserIdentity {
        let mut current = self.current.lock();
        if let Some(identity) = current.as_ref() {
            return identity.clone();
        }

        let identity = match self.load() {
            Some(identity) => identity,
            None => self.generate_and_persist(),
        };
        *current = Some(identity.clone());
        identity
    }

    /// Discard the persisted identity and generate a new one.
    pub fn regenerate(&self) -> UserIdentity {
        let mut current = self.current.lock();
        if let Err(e) = self.storage.remove(IDENTITY_STORAGE_KEY) {
            warn!("Failed to clear persisted identity: {}", e);
        }
        let identity = self.generate_and_persist();
        info!(customer_id = %identity.customer_id, "User identifiers regenerated");
        *current = Some(identity.clone());
        identity
    }

    fn load(&self) -> Option<UserIdentity> {
        match self.storage.get(IDENTITY_STORAGE_KEY) {
            Ok(Some(data)) => match serde_json::from_str(&data) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!("Discarding malformed identity: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Identity storage unavailable: {}", e);
                None
            }
        }
    }

    fn generate_and_persist(&self) -> UserIdentity {
        let identity = generate_identity();
        let persisted = serde_json::to_string(&identity)
            .map_err(lakay_core::Error::from)
            .and_then(|data| self.storage.set(IDENTITY_STORAGE_KEY, &data));
        if let Err(e) = persisted {
            warn!("Identity not persisted, keeping it for this process only: {}", e);
        }
        identity
    }
}

fn generate_identity() -> UserIdentity {
    UserIdentity {
        customer_id: uuid::Uuid::new_v4().to_string(),
        agent_id: format!("lakay-agent-{}", uuid::Uuid::new_v4().simple()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use lakay_core::{Error, Result};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Storage("quota exceeded".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("quota exceeded".into()))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(Error::Storage("quota exceeded".into()))
        }
    }

    #[test]
    fn test_get_is_stable() {
        let store = IdentifierStore::new(Arc::new(MemoryStore::new()));
        let first = store.get();
        let second = store.get();
        assert_eq!(first, second);
        assert!(first.agent_id.starts_with("lakay-agent-"));
        assert_ne!(first.customer_id, first.agent_id);
    }

    #[test]
    fn test_regenerate_changes_customer_id() {
        let store = IdentifierStore::new(Arc::new(MemoryStore::new()));
        let before = store.get();
        let regenerated = store.regenerate();
        let after = store.get();

        assert_ne!(before.customer_id, after.customer_id);
        assert_ne!(before.agent_id, after.agent_id);
        assert_eq!(regenerated, after);
    }

    #[test]
    fn test_identity_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let first = IdentifierStore::new(Arc::new(FileStore::new(dir.path()))).get();
        let second = IdentifierStore::new(Arc::new(FileStore::new(dir.path()))).get();
        assert_eq!(first, second);
    }

    #[test]
    fn test_regenerate_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let regenerated = IdentifierStore::new(Arc::new(FileStore::new(dir.path()))).regenerate();
        let reloaded = IdentifierStore::new(Arc::new(FileStore::new(dir.path()))).get();
        assert_eq!(regenerated, reloaded);
    }

    #[test]
    fn test_malformed_identity_is_replaced() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(IDENTITY_STORAGE_KEY, "\"oops\"").unwrap();

        let identity = IdentifierStore::new(storage.clone()).get();
        let stored: UserIdentity =
            serde_json::from_str(&storage.get(IDENTITY_STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(identity, stored);
    }

    #[test]
    fn test_unavailable_storage_degrades_to_ephemeral() {
        let store = IdentifierStore::new(Arc::new(BrokenStore));
        let first = store.get();
        assert_eq!(store.get(), first);

        let regenerated = store.regenerate();
        assert_ne!(regenerated.customer_id, first.customer_id);
        assert_eq!(store.get(), regenerated);
    }
}
