//! App connectors: per-user MCP endpoints kept in sync across every consumer.
//!
//! The connector list lives in one authoritative [`ConfigStore`] and is
//! replicated on every mutation to an ordered set of sinks: durable storage,
//! the shared context other UI regions read, and the chat-runtime
//! registration. Endpoints are derived from a locally generated identity
//! ([`IdentifierStore`]) through a fixed per-service template table.

pub mod endpoints;
pub mod identity;
pub mod manager;
pub mod probe;
pub mod sink;
pub mod storage;
pub mod store;
pub mod types;

pub use endpoints::{resolve, ServiceKey};
pub use identity::IdentifierStore;
pub use manager::AppManager;
pub use probe::ConnectionProbe;
pub use sink::{ConfigSink, RuntimeRegistry, SharedContext, StorageSink};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::ConfigStore;
pub use types::*;
