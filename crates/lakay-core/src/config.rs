//! Configuration and data directory management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Paths to all Lakay data locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Key-value storage directory (`data/storage/`): connector list, identity.
    pub storage: PathBuf,
    /// Transcript injector configuration (`data/injector.json`).
    pub injector_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let paths = Self::at(root);
        paths.ensure_dirs()?;
        Ok(paths)
    }

    /// Lay out paths under `root` without touching the filesystem.
    pub fn at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            storage: root.join("storage"),
            injector_config_file: root.join("injector.json"),
            root,
        }
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.storage)?;
        Ok(())
    }
}

/// Top-level Lakay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LakayConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// DevTools websocket URL of the page hosting the chat widget.
    pub cdp_url: Option<String>,
    /// DevTools HTTP base (e.g. `http://127.0.0.1:9222`) used to discover a page
    /// when `cdp_url` is not set.
    pub cdp_http: Option<String>,
    /// Chat-runtime endpoint that receives the registered MCP server list.
    pub runtime_url: Option<String>,
    /// Upper bound for a single reachability probe.
    pub probe_timeout_secs: u64,
}

impl LakayConfig {
    /// Create configuration from environment and defaults. Directories are
    /// not created here; see [`DataPaths::ensure_dirs`].
    pub fn from_env(data_dir: impl AsRef<Path>) -> Self {
        let port = parse_env("PORT").unwrap_or(3010);
        let probe_timeout_secs = parse_env("LAKAY_PROBE_TIMEOUT_SECS").unwrap_or(10);

        Self {
            port,
            data_paths: DataPaths::at(data_dir),
            cdp_url: non_empty_env("LAKAY_CDP_URL"),
            cdp_http: non_empty_env("LAKAY_CDP_HTTP"),
            runtime_url: non_empty_env("LAKAY_RUNTIME_URL"),
            probe_timeout_secs,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = non_empty_env(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring invalid {}={}", name, raw);
            None
        }
    }
}
