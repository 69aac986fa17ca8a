//! Worker settings.
//!
//! Settings are loaded from a single JSON file declaring the chains and
//! networks this worker may synchronize, plus the storage layer knobs. A
//! missing file is not fatal for the binary; it falls back to
//! [`Settings::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top level settings for the worker process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory where the storage layer keeps its data.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Seconds between storage flush passes.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Capacity of the process-wide event bus.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// The chains and networks this worker knows how to synchronize.
    #[serde(default)]
    pub chains: Vec<ChainSettings>,
}

/// One configured chain/network pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSettings {
    pub chain: String,
    pub network: String,

    #[serde(default)]
    pub config: ChainConfig,
}

/// Per chain/network synchronization configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Seconds between sync passes.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Peers the sync loop polls, as `host:port` strings.
    #[serde(default)]
    pub trusted_peers: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            flush_interval_secs: default_flush_interval_secs(),
            event_capacity: default_event_capacity(),
            chains: Vec::new(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval_secs(),
            trusted_peers: Vec::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_flush_interval_secs() -> u64 {
    60
}

fn default_event_capacity() -> usize {
    1024
}

fn default_sync_interval_secs() -> u64 {
    10
}

impl Settings {
    /// Loads the settings from a JSON file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be read or does
    /// not contain valid settings.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let data = std::fs::read_to_string(path).map_err(|source| SettingsError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&data).map_err(|source| SettingsError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the configuration for a chain/network pair, if declared.
    #[must_use]
    pub fn chain_config(&self, chain: &str, network: &str) -> Option<&ChainConfig> {
        self.chains
            .iter()
            .find(|it| it.chain == chain && it.network == network)
            .map(|it| &it.config)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings file {path}: {source}")]
    Unreadable { path: PathBuf, source: std::io::Error },

    #[error("settings file {path} is not valid: {source}")]
    Invalid { path: PathBuf, source: serde_json::Error },

    #[error("no configuration for chain {chain} on network {network}")]
    UnknownChain { chain: String, network: String },
}
