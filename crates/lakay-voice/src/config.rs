//! Transcript injector configuration persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lakay_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::types::{default_input_candidates, default_submit_candidates, Candidate};

/// Persisted injector configuration (`injector.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectorConfig {
    /// Wait before looking for the input, letting the widget finish rendering.
    #[serde(default = "default_settle_delay", rename = "settleDelayMs")]
    pub settle_delay_ms: u64,
    /// Wait between filling the input and submitting.
    #[serde(default = "default_submit_delay", rename = "submitDelayMs")]
    pub submit_delay_ms: u64,
    /// Wait after submitting before checking the widget took the text.
    /// `None` disables the check.
    #[serde(default = "default_confirm_delay", rename = "confirmDelayMs")]
    pub confirm_delay_ms: Option<u64>,
    #[serde(default = "default_input_candidates", rename = "inputCandidates")]
    pub input_candidates: Vec<Candidate>,
    #[serde(default = "default_submit_candidates", rename = "submitCandidates")]
    pub submit_candidates: Vec<Candidate>,
    /// Path to config file (not serialized).
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_settle_delay() -> u64 {
    100
}
fn default_submit_delay() -> u64 {
    500
}
fn default_confirm_delay() -> Option<u64> {
    Some(300)
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay(),
            submit_delay_ms: default_submit_delay(),
            confirm_delay_ms: default_confirm_delay(),
            input_candidates: default_input_candidates(),
            submit_candidates: default_submit_candidates(),
            config_path: PathBuf::new(),
        }
    }
}

impl InjectorConfig {
    /// Load config from a JSON file, or return defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: InjectorConfig = std::fs::read_to_string(config_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        config.config_path = config_path.to_path_buf();
        config
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        let path = self.config_path.display();
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("create {}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("encode {}: {}", path, e)))?;
        std::fs::write(&self.config_path, json)
            .map_err(|e| Error::Config(format!("write {}: {}", path, e)))
    }

    /// Reject settings that would leave delivery with nothing to look for.
    pub fn validate(&self) -> Result<()> {
        if self.input_candidates.is_empty() {
            return Err(Error::InvalidInput("inputCandidates must not be empty".into()));
        }
        let mut candidates = self.input_candidates.iter().chain(&self.submit_candidates);
        if let Some(blank) = candidates.find(|c| c.selector.trim().is_empty()) {
            return Err(Error::InvalidInput(format!(
                "candidate '{}' has no selector",
                blank.label
            )));
        }
        Ok(())
    }

    /// All delays zero and no confirmation check.
    pub fn immediate() -> Self {
        Self {
            settle_delay_ms: 0,
            submit_delay_ms: 0,
            confirm_delay_ms: None,
            ..Self::default()
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    pub fn confirm_delay(&self) -> Option<Duration> {
        self.confirm_delay_ms.map(Duration::from_millis)
    }
}
