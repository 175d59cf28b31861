//! Application configuration.
//!
//! Mirrors the sections of `config.toml`; every field has a default so a
//! missing file or section is never an error.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Relational store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file (defaults to `<data_dir>/chat.db`).
    #[serde(default)]
    pub db_file: Option<PathBuf>,
}

/// Snapshot settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Write a snapshot after every export.
    #[serde(default)]
    pub enabled: bool,

    /// Snapshot directory (defaults to `<data_dir>/snapshots`).
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Progress indicator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Tick period in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Whether to draw the indicator at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            enabled: default_enabled(),
        }
    }
}

const fn default_tick_ms() -> u64 {
    100
}

const fn default_enabled() -> bool {
    true
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub progress: ProgressConfig,
}

impl AppConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".chat-archiver")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.store
            .db_file
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("chat.db"))
    }

    /// Get the snapshots directory path.
    #[must_use]
    pub fn snapshot_dir(&self) -> PathBuf {
        self.snapshot
            .dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("snapshots"))
    }

    /// Progress tick period.
    #[must_use]
    pub const fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.progress.tick_ms)
    }
}
