//! App manager — the flows the UI triggers, composed from identity,
//! endpoint resolution, the config store and the probe.

use std::sync::Arc;

use lakay_core::{Error, Result};
use tracing::info;

use crate::endpoints::ServiceKey;
use crate::identity::IdentifierStore;
use crate::probe::ConnectionProbe;
use crate::sink::{ConfigSink, RuntimeRegistry, SharedContext, StorageSink};
use crate::storage::KeyValueStore;
use crate::store::ConfigStore;
use crate::types::{ConnectorRecord, ProbeOutcome, UserIdentity};

pub struct AppManager {
    identity: IdentifierStore,
    store: ConfigStore,
    context: Arc<SharedContext>,
    runtime: Arc<RuntimeRegistry>,
    probe: ConnectionProbe,
}

impl AppManager {
    /// Wire the standard sinks (storage, shared context, runtime registration)
    /// around the persisted connector list.
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        runtime: Arc<RuntimeRegistry>,
        probe: ConnectionProbe,
    ) -> Self {
        let initial = crate::storage::load_connectors(storage.as_ref());
        let context = Arc::new(SharedContext::new(initial.clone()));
        let sinks: Vec<Arc<dyn ConfigSink>> = vec![
            Arc::new(StorageSink::new(storage.clone())),
            context.clone(),
            runtime.clone(),
        ];
        info!("AppManager: {} connectors loaded", initial.len());

        Self {
            identity: IdentifierStore::new(storage),
            store: ConfigStore::new(initial, sinks),
            context,
            runtime,
            probe,
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn context(&self) -> &Arc<SharedContext> {
        &self.context
    }

    pub fn runtime(&self) -> &Arc<RuntimeRegistry> {
        &self.runtime
    }

    pub fn list(&self) -> Vec<ConnectorRecord> {
        self.store.list()
    }

    pub fn identity(&self) -> UserIdentity {
        self.identity.get()
    }

    /// New identity; records already in the list keep their old endpoints.
    pub fn regenerate_identity(&self) -> UserIdentity {
        self.identity.regenerate()
    }

    /// Add a recognized service under its display name.
    pub async fn add_service(&self, service_key: &str) -> Result<Vec<ConnectorRecord>> {
        let service = lookup(service_key)?;
        let endpoint = service.endpoint(&self.identity.get());
        self.store
            .add(ConnectorRecord::new(service.display_name(), endpoint))
            .await
    }

    /// Add a user-entered connector. The name is required.
    pub async fn add_custom(
        &self,
        server_name: &str,
        endpoint: &str,
    ) -> Result<Vec<ConnectorRecord>> {
        let server_name = server_name.trim();
        if server_name.is_empty() {
            return Err(Error::InvalidInput("serverName is required".into()));
        }
        self.store
            .add(ConnectorRecord::new(server_name, endpoint.trim()))
            .await
    }

    pub async fn remove(&self, index: usize) -> Result<Vec<ConnectorRecord>> {
        self.store.remove(index).await
    }

    /// Replace a service's connectors with one derived from a fresh identity.
    pub async fn regenerate_service(&self, service_key: &str) -> Result<Vec<ConnectorRecord>> {
        let service = lookup(service_key)?;
        self.store.remove_by_name(service.display_name()).await?;
        let identity = self.identity.regenerate();
        info!(service = %service, "Regenerating connector with new identifiers");
        self.store
            .add(ConnectorRecord::new(
                service.display_name(),
                service.endpoint(&identity),
            ))
            .await
    }

    /// Probe the connector at `index`, if there is one.
    pub async fn probe(&self, index: usize) -> Option<(ConnectorRecord, ProbeOutcome)> {
        let record = self.store.get(index)?;
        let outcome = self.probe.probe(&record.endpoint).await;
        info!(
            server = %record.server_name,
            "{}",
            outcome.summary(&record.server_name)
        );
        Some((record, outcome))
    }
}

fn lookup(service_key: &str) -> Result<ServiceKey> {
    ServiceKey::from_key(service_key).ok_or_else(|| Error::UnknownService(service_key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{load_connectors, FileStore, MemoryStore};

    fn manager() -> AppManager {
        AppManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RuntimeRegistry::local()),
            ConnectionProbe::default(),
        )
    }

    #[tokio::test]
    async fn test_add_gmail_uses_identity() {
        let mgr = manager();
        let identity = mgr.identity();

        let list = mgr.add_service("gmail").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].server_name, "Gmail");
        assert!(list[0]
            .endpoint
            .contains(&format!("customerId={}", identity.customer_id)));
    }

    #[tokio::test]
    async fn test_unknown_service_leaves_store_untouched() {
        let mgr = manager();
        mgr.add_service("search").await.unwrap();

        let err = mgr.add_service("myspace").await.unwrap_err();
        assert!(matches!(err, Error::UnknownService(_)));
        assert_eq!(mgr.list().len(), 1);
        assert_eq!(mgr.runtime().registrations(), 1);
    }

    #[tokio::test]
    async fn test_regenerate_identity_then_readd() {
        let mgr = manager();
        let first = mgr.add_service("gmail").await.unwrap()[0].clone();

        mgr.regenerate_identity();
        let list = mgr.add_service("gmail").await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0], first);
        assert_ne!(list[1].endpoint, first.endpoint);
    }

    #[tokio::test]
    async fn test_regenerate_service_replaces_record() {
        let mgr = manager();
        mgr.add_service("gmail").await.unwrap();
        mgr.add_service("outlook").await.unwrap();
        let before = mgr.identity();

        let list = mgr.regenerate_service("gmail").await.unwrap();
        let after = mgr.identity();

        assert_ne!(before.customer_id, after.customer_id);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].server_name, "Outlook");
        assert!(list[0].endpoint.contains(&before.customer_id));
        assert_eq!(list[1].server_name, "Gmail");
        assert!(list[1].endpoint.contains(&after.customer_id));
        assert_eq!(*mgr.context().current(), list);
    }

    #[tokio::test]
    async fn test_add_custom_requires_name() {
        let mgr = manager();
        assert!(matches!(
            mgr.add_custom("  ", "https://x").await,
            Err(Error::InvalidInput(_))
        ));
        let list = mgr.add_custom("My server", "https://my.test/sse").await.unwrap();
        assert_eq!(list[0], ConnectorRecord::new("My server", "https://my.test/sse"));
    }

    #[tokio::test]
    async fn test_list_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()));
        {
            let mgr = AppManager::new(
                storage.clone(),
                Arc::new(RuntimeRegistry::local()),
                ConnectionProbe::default(),
            );
            mgr.add_service("youtube").await.unwrap();
            mgr.add_service("teams").await.unwrap();
            mgr.remove(0).await.unwrap();
        }

        let mgr = AppManager::new(
            storage.clone(),
            Arc::new(RuntimeRegistry::local()),
            ConnectionProbe::default(),
        );
        let list = mgr.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].server_name, "Microsoft Teams");
        assert_eq!(load_connectors(storage.as_ref()), list);
        assert_eq!(*mgr.context().current(), list);
    }

    #[tokio::test]
    async fn test_probe_missing_index() {
        let mgr = manager();
        assert!(mgr.probe(0).await.is_none());
    }
}
