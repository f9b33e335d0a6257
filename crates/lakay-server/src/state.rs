//! Shared application state.

use std::sync::Arc;

use lakay_connectors::{
    AppManager, ConnectionProbe, FileStore, KeyValueStore, MemoryStore, RuntimeRegistry,
};
use lakay_core::{LakayConfig, Result};
use lakay_voice::{CdpPage, InjectorConfig, TranscriptInjector};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Where the chat widget's page is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdpTarget {
    /// A page `webSocketDebuggerUrl`.
    Direct(String),
    /// A DevTools HTTP base; the first page target is used.
    Discover(String),
    None,
}

impl CdpTarget {
    pub fn from_config(config: &LakayConfig) -> Self {
        match (&config.cdp_url, &config.cdp_http) {
            (Some(url), _) => Self::Direct(url.clone()),
            (None, Some(base)) => Self::Discover(base.clone()),
            (None, None) => Self::None,
        }
    }

    pub fn describe(&self) -> Option<&str> {
        match self {
            Self::Direct(url) | Self::Discover(url) => Some(url),
            Self::None => None,
        }
    }
}

/// Lazily connected transcript injector.
///
/// The browser may come up after the server, so the page is connected on
/// first use and dropped after a transport error to be reconnected on the
/// next request.
pub struct VoiceLink {
    target: CdpTarget,
    config: RwLock<InjectorConfig>,
    injector: Mutex<Option<Arc<TranscriptInjector<CdpPage>>>>,
}

impl VoiceLink {
    pub fn new(target: CdpTarget, config: InjectorConfig) -> Self {
        Self {
            target,
            config: RwLock::new(config),
            injector: Mutex::new(None),
        }
    }

    pub fn target(&self) -> &CdpTarget {
        &self.target
    }

    pub fn config(&self) -> InjectorConfig {
        self.config.read().clone()
    }

    /// The connected injector, or `None` when no page is configured.
    pub async fn injector(&self) -> Result<Option<Arc<TranscriptInjector<CdpPage>>>> {
        let mut slot = self.injector.lock().await;
        if let Some(injector) = slot.as_ref() {
            return Ok(Some(injector.clone()));
        }

        let page = match &self.target {
            CdpTarget::Direct(url) => CdpPage::connect(url).await?,
            CdpTarget::Discover(base) => CdpPage::discover(base, None).await?,
            CdpTarget::None => return Ok(None),
        };
        let injector = Arc::new(TranscriptInjector::new(Arc::new(page), self.config()));
        *slot = Some(injector.clone());
        Ok(Some(injector))
    }

    /// Replace the delivery settings. The current page is dropped so the
    /// next request builds its injector from the new settings.
    pub async fn update(&self, config: InjectorConfig) {
        *self.config.write() = config;
        if self.injector.lock().await.take().is_some() {
            info!("Injector settings changed, page will be reconnected");
        }
    }

    /// Forget the current page so the next request reconnects.
    pub async fn reset(&self) {
        if self.injector.lock().await.take().is_some() {
            warn!("Dropped DevTools page after transport error");
        }
    }
}

/// File-backed storage under the data directory, or process-local storage
/// when that directory cannot be created.
fn open_storage(config: &LakayConfig) -> Arc<dyn KeyValueStore> {
    match config.data_paths.ensure_dirs() {
        Ok(()) => Arc::new(FileStore::new(&config.data_paths.storage)),
        Err(e) => {
            warn!(
                "Cannot use data directory {} ({}), connectors will not survive a restart",
                config.data_paths.root.display(),
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: LakayConfig,
    pub apps: AppManager,
    pub voice: VoiceLink,
}

impl AppState {
    pub fn new(config: LakayConfig) -> Self {
        let storage = open_storage(&config);

        let runtime = match &config.runtime_url {
            Some(url) => {
                info!("Registering MCP servers with chat runtime at {}", url);
                RuntimeRegistry::with_remote(reqwest::Client::new(), url.clone())
            }
            None => RuntimeRegistry::local(),
        };
        let probe = ConnectionProbe::new(config.probe_timeout());
        let apps = AppManager::new(storage, Arc::new(runtime), probe);

        let injector_config = InjectorConfig::load(&config.data_paths.injector_config_file);
        let target = CdpTarget::from_config(&config);
        match target.describe() {
            Some(url) => info!("Voice delivery page: {}", url),
            None => warn!("No DevTools page configured, voice delivery disabled"),
        }

        Self::from_parts(config, apps, VoiceLink::new(target, injector_config))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(config: LakayConfig, apps: AppManager, voice: VoiceLink) -> Self {
        Self {
            config,
            apps,
            voice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_at(root: &std::path::Path) -> LakayConfig {
        LakayConfig {
            port: 0,
            data_paths: lakay_core::DataPaths::at(root),
            cdp_url: None,
            cdp_http: None,
            runtime_url: None,
            probe_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_connectors_persist_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(config_at(dir.path()));
        state.apps.add_service("gmail").await.unwrap();

        assert!(dir.path().join("storage/mcpConfig.json").exists());
        let reopened = AppState::new(config_at(dir.path()));
        assert_eq!(reopened.apps.list(), state.apps.list());
    }

    #[tokio::test]
    async fn test_unusable_data_dir_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, "not a directory").unwrap();

        let state = AppState::new(config_at(&blocker));
        let list = state.apps.add_service("search").await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(blocker.is_file());

        // a second process starts empty again
        assert!(AppState::new(config_at(&blocker)).apps.list().is_empty());
    }

    #[test]
    fn test_cdp_target_prefers_direct_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_at(dir.path());
        assert_eq!(CdpTarget::from_config(&config), CdpTarget::None);

        config.cdp_http = Some("http://127.0.0.1:9222".into());
        assert_eq!(
            CdpTarget::from_config(&config),
            CdpTarget::Discover("http://127.0.0.1:9222".into())
        );

        config.cdp_url = Some("ws://127.0.0.1:9222/devtools/page/1".into());
        assert_eq!(
            CdpTarget::from_config(&config).describe(),
            Some("ws://127.0.0.1:9222/devtools/page/1")
        );
    }
}
