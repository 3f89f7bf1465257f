//! Configuration loading for the bridge user core.
//!
//! Configuration is loaded from a TOML file. Every section and key is
//! optional; missing values take the defaults below.

use portal_bridge_core::{SearchOptions, DEFAULT_MAX_RESULTS, DEFAULT_MIN_SIMILARITY};
use serde::Deserialize;
use std::path::PathBuf;

use crate::persistence::Whitelist;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    /// Access configuration.
    #[serde(default)]
    pub bridge: AccessConfig,
    /// Synchronization configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Search configuration.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Access configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessConfig {
    /// User ids or domains allowed to use the bridge (`*` for everyone).
    #[serde(default)]
    pub whitelist: Vec<String>,
}

/// Synchronization configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Create visible rooms during dialog sync (default: true).
    #[serde(default = "default_create_rooms")]
    pub create_rooms: bool,
    /// Sync contacts and dialogs when an authorized session starts (default: true).
    #[serde(default = "default_sync_on_start")]
    pub sync_on_start: bool,
}

/// Search configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Local search result limit (default: 5).
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Local search similarity threshold (default: 0.45).
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    /// Remote search result limit (default: 5).
    #[serde(default = "default_max_results")]
    pub remote_max_results: usize,
}

// Default value functions
fn default_create_rooms() -> bool {
    true
}

fn default_sync_on_start() -> bool {
    true
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_min_similarity() -> f64 {
    DEFAULT_MIN_SIMILARITY
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            create_rooms: default_create_rooms(),
            sync_on_start: default_sync_on_start(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            min_similarity: default_min_similarity(),
            remote_max_results: default_max_results(),
        }
    }
}

impl SearchConfig {
    /// Local search options from this section.
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            max_results: self.max_results,
            min_similarity: self.min_similarity,
        }
    }
}

impl AccessConfig {
    /// Whitelist built from this section.
    pub fn whitelist(&self) -> Whitelist {
        Whitelist::new(self.whitelist.iter().cloned())
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
