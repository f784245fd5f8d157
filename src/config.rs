//! Runtime configuration, read from `.slate/config.yaml`.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Config file within the storage directory.
const CONFIG_FILE: &str = "config.yaml";

/// Tunables the tracker reads at startup. A missing file means defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Most-recent view-history entries to keep. Unset keeps everything;
    /// earlier deployments capped this, so it stays a knob.
    pub history_capacity: Option<usize>,

    /// Daemon tick interval in milliseconds.
    pub flush_interval_ms: Option<u64>,
}

impl Config {
    /// Load `<root>/.slate/config.yaml`, or defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(crate::storage::SLATE_DIR).join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path).context("Failed to read config.yaml")?;
        serde_yaml::from_str(&raw).context("Failed to parse config.yaml")
    }
}
