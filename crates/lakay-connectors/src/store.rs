//! Config store — the authoritative connector list and its fan-out.

use std::sync::Arc;

use lakay_core::{Error, Result};
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::sink::ConfigSink;
use crate::storage::{load_connectors, KeyValueStore};
use crate::types::ConnectorRecord;

type Sinks = Arc<[Arc<dyn ConfigSink>]>;

/// Owns the ordered connector list and replicates it on every mutation.
///
/// Once a mutation has changed the list its fan-out runs on its own task,
/// so dropping the calling future (a client hanging up mid-request) still
/// leaves every sink holding the new list.
pub struct ConfigStore {
    records: RwLock<Vec<ConnectorRecord>>,
    sinks: Sinks,
    /// Held for the whole of a mutation so fan-outs never interleave.
    write_gate: Arc<Mutex<()>>,
}

impl ConfigStore {
    /// Create a store with an initial list and its sinks, written in the
    /// given order on every mutation.
    pub fn new(initial: Vec<ConnectorRecord>, sinks: Vec<Arc<dyn ConfigSink>>) -> Self {
        Self {
            records: RwLock::new(initial),
            sinks: sinks.into(),
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Create a store seeded from the persisted list.
    pub fn load(storage: &dyn KeyValueStore, sinks: Vec<Arc<dyn ConfigSink>>) -> Self {
        let records = load_connectors(storage);
        info!("ConfigStore: {} connectors loaded", records.len());
        Self::new(records, sinks)
    }

    /// Current authoritative list. Never writes to a sink.
    pub fn list(&self) -> Vec<ConnectorRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ConnectorRecord> {
        self.records.read().get(index).cloned()
    }

    /// Append a record and replicate.
    pub async fn add(&self, record: ConnectorRecord) -> Result<Vec<ConnectorRecord>> {
        let gate = self.write_gate.clone().lock_owned().await;
        info!(server = %record.server_name, "Adding connector");
        let updated = {
            let mut records = self.records.write();
            records.push(record);
            records.clone()
        };
        self.replicate(gate, updated).await
    }

    /// Remove the record at `index`. Out of range is a no-op without sink writes.
    pub async fn remove(&self, index: usize) -> Result<Vec<ConnectorRecord>> {
        let gate = self.write_gate.clone().lock_owned().await;
        let updated = {
            let mut records = self.records.write();
            if index >= records.len() {
                return Ok(records.clone());
            }
            let removed = records.remove(index);
            info!(server = %removed.server_name, index, "Removed connector");
            records.clone()
        };
        self.replicate(gate, updated).await
    }

    /// Remove every record named `server_name`. No match is a no-op.
    pub async fn remove_by_name(&self, server_name: &str) -> Result<Vec<ConnectorRecord>> {
        let gate = self.write_gate.clone().lock_owned().await;
        let updated = {
            let mut records = self.records.write();
            let len_before = records.len();
            records.retain(|r| r.server_name != server_name);
            if records.len() == len_before {
                return Ok(records.clone());
            }
            info!(
                server = server_name,
                removed = len_before - records.len(),
                "Removed connectors by name"
            );
            records.clone()
        };
        self.replicate(gate, updated).await
    }

    /// `remove_by_name` followed by `add`; two separate mutations.
    pub async fn replace_by_name(
        &self,
        server_name: &str,
        record: ConnectorRecord,
    ) -> Result<Vec<ConnectorRecord>> {
        self.remove_by_name(server_name).await?;
        self.add(record).await
    }

    /// Republish the current list to every sink.
    pub async fn sync(&self) -> Result<()> {
        let gate = self.write_gate.clone().lock_owned().await;
        let current = self.list();
        self.replicate(gate, current).await.map(|_| ())
    }

    /// Fan `records` out on a spawned task that keeps the write gate until
    /// the last sink is written, then hand the list back.
    async fn replicate(
        &self,
        gate: OwnedMutexGuard<()>,
        records: Vec<ConnectorRecord>,
    ) -> Result<Vec<ConnectorRecord>> {
        let sinks = self.sinks.clone();
        let task = tokio::spawn(async move {
            let _gate = gate;
            fan_out(&sinks, &records).await.map(|()| records)
        });
        task.await
            .map_err(|e| Error::Internal(format!("connector fan-out task: {}", e)))?
    }
}

/// Write `records` to every sink in order. A failing sink does not stop
/// the rest; the first failure is returned.
async fn fan_out(sinks: &[Arc<dyn ConfigSink>], records: &[ConnectorRecord]) -> Result<()> {
    let mut first_error = None;
    for sink in sinks {
        if let Err(e) = sink.receive(records).await {
            warn!(sink = sink.name(), "Sink write failed: {}", e);
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
