//! Replicate-on-write targets for the connector list.
//!
//! Every sink receives the complete list after each mutation, never a delta.

use std::sync::Arc;

use async_trait::async_trait;
use lakay_core::{Error, Result};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::storage::{save_connectors, KeyValueStore};
use crate::types::ConnectorRecord;

/// A destination that must hold the full connector list.
#[async_trait]
pub trait ConfigSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn receive(&self, records: &[ConnectorRecord]) -> Result<()>;
}

// ---------------------------------------------------------------
// Durable storage
// ---------------------------------------------------------------

/// Writes the list to key-value storage under `mcpConfig`.
pub struct StorageSink {
    storage: Arc<dyn KeyValueStore>,
}

impl StorageSink {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ConfigSink for StorageSink {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn receive(&self, records: &[ConnectorRecord]) -> Result<()> {
        save_connectors(self.storage.as_ref(), records).map_err(|e| Error::sink(self.name(), e))
    }
}

// ---------------------------------------------------------------
// Shared context
// ---------------------------------------------------------------

/// In-process publish point read by other UI regions.
pub struct SharedContext {
    tx: watch::Sender<Arc<Vec<ConnectorRecord>>>,
}

impl SharedContext {
    pub fn new(initial: Vec<ConnectorRecord>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<ConnectorRecord>>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Arc<Vec<ConnectorRecord>> {
        self.tx.borrow().clone()
    }
}

#[async_trait]
impl ConfigSink for SharedContext {
    fn name(&self) -> &'static str {
        "context"
    }

    async fn receive(&self, records: &[ConnectorRecord]) -> Result<()> {
        // send_replace succeeds even with no live subscribers.
        self.tx.send_replace(Arc::new(records.to_vec()));
        Ok(())
    }
}

// ---------------------------------------------------------------
// Chat-runtime registration
// ---------------------------------------------------------------

/// What the chat runtime currently has registered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationSnapshot {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: Vec<ConnectorRecord>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "registeredAt")]
    pub registered_at: Option<String>,
    pub registrations: u64,
}

/// Exposes the connector list to the chat runtime, optionally forwarding it
/// to a remote runtime endpoint.
pub struct RuntimeRegistry {
    snapshot: RwLock<RegistrationSnapshot>,
    remote: Option<RemoteRuntime>,
}

struct RemoteRuntime {
    client: reqwest::Client,
    url: String,
}

impl RuntimeRegistry {
    /// Registry kept in process only.
    pub fn local() -> Self {
        Self {
            snapshot: RwLock::new(RegistrationSnapshot::default()),
            remote: None,
        }
    }

    /// Registry that also POSTs every registration to `url`.
    pub fn with_remote(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            snapshot: RwLock::new(RegistrationSnapshot::default()),
            remote: Some(RemoteRuntime {
                client,
                url: url.into(),
            }),
        }
    }

    pub fn snapshot(&self) -> RegistrationSnapshot {
        self.snapshot.read().clone()
    }

    pub fn registrations(&self) -> u64 {
        self.snapshot.read().registrations
    }
}

#[async_trait]
impl ConfigSink for RuntimeRegistry {
    fn name(&self) -> &'static str {
        "runtime"
    }

    async fn receive(&self, records: &[ConnectorRecord]) -> Result<()> {
        {
            let mut snapshot = self.snapshot.write();
            snapshot.mcp_servers = records.to_vec();
            snapshot.registered_at = Some(chrono::Utc::now().to_rfc3339());
            snapshot.registrations += 1;
        }

        let Some(remote) = &self.remote else {
            return Ok(());
        };

        debug!("Registering {} MCP servers with {}", records.len(), remote.url);
        let response = remote
            .client
            .post(&remote.url)
            .json(&serde_json::json!({ "mcpServers": records }))
            .send()
            .await
            .map_err(|e| Error::sink(self.name(), e))?;

        if !response.status().is_success() {
            return Err(Error::sink(
                self.name(),
                format!("runtime answered {}", response.status()),
            ));
        }
        Ok(())
    }
}
