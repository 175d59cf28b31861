//! Configuration file management.
//!
//! Handles loading and writing the TOML configuration file.

use std::fs;
use std::path::Path;

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# chat-archiver configuration
# Auto-generated - edit as needed

[store]
# SQLite database file (default: ~/.chat-archiver/chat.db)
# db_file = "/custom/path/chat.db"

[snapshot]
# Write a JSON snapshot after every export
enabled = false

# Snapshot directory (default: ~/.chat-archiver/snapshots)
# dir = "/custom/path/snapshots"

[progress]
# Progress indicator tick period in milliseconds
tick_ms = 100

# Whether to draw the progress indicator
enabled = true
"#;

/// Load configuration from `path`, or defaults if it does not exist.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        load_config_from_file(path)
    } else {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Render configuration as TOML.
///
/// # Errors
/// Returns error if serialization fails.
pub fn render_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })
}

/// Create the default configuration file if it doesn't exist.
///
/// Returns whether a file was written.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %path.display(), "Created default configuration");

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.progress.tick_ms, 100);
        assert!(!config.snapshot.enabled);
        assert!(config.store.db_file.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.progress.tick_ms, 100);
    }

    #[test]
    fn test_ensure_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg/config.toml");

        assert!(ensure_config_exists(&path).unwrap());
        assert!(!ensure_config_exists(&path).unwrap());

        let loaded = load_config_from_file(&path).unwrap();
        assert!(loaded.progress.enabled);
    }

    #[test]
    fn test_render_roundtrips() {
        let mut config = AppConfig::default();
        config.snapshot.enabled = true;

        let rendered = render_config(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert!(parsed.snapshot.enabled);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[progress\ntick_ms = ").unwrap();

        assert!(matches!(
            load_config_from_file(&path).unwrap_err(),
            AppError::Config { .. }
        ));
    }
}
