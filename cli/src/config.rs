// Configuration management for the bondstore CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/bondstore/config.json
// - Linux: ~/.config/bondstore/config.json
// - Windows: %APPDATA%\bondstore\config.json

use anyhow::{Context, Result};
use bondstore_core::StorageSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the persistent bond store, defaults to the data directory
    pub store_path: Option<String>,

    /// Storage behaviour handed to the core
    pub storage: StorageSettings,
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("bondstore");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the data directory path (cross-platform)
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to determine data directory")?
            .join("bondstore");

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        Ok(data_dir)
    }

    /// Get the default config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from `path`, or create a default one there if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            config
                .storage
                .validate()
                .context("Invalid storage settings in config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Location of the bond store, falling back to the data directory
    pub fn resolved_store_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::data_dir()?.join("bt_config")),
        }
    }

    /// Set a config value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "store_path" => {
                self.store_path = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "max_bonded_devices" => {
                self.storage.max_bonded_devices = value.parse().context("Invalid number")?;
            }
            "restricted_mode" => {
                self.storage.restricted_mode = value.parse().context("Invalid boolean value")?;
            }
            "irk_rotation" => {
                self.storage.irk_rotation = value.parse().context("Invalid boolean value")?;
            }
            "post_writes" => {
                self.storage.post_writes = value.parse().context("Invalid boolean value")?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        self.storage.validate()?;
        Ok(())
    }

    /// Get a config value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "store_path" => self.store_path.clone(),
            "max_bonded_devices" => Some(self.storage.max_bonded_devices.to_string()),
            "restricted_mode" => Some(self.storage.restricted_mode.to_string()),
            "irk_rotation" => Some(self.storage.irk_rotation.to_string()),
            "post_writes" => Some(self.storage.post_writes.to_string()),
            _ => None,
        }
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            (
                "store_path".to_string(),
                self.store_path.clone().unwrap_or_else(|| "(auto)".to_string()),
            ),
            (
                "max_bonded_devices".to_string(),
                self.storage.max_bonded_devices.to_string(),
            ),
            ("restricted_mode".to_string(), self.storage.restricted_mode.to_string()),
            ("irk_rotation".to_string(), self.storage.irk_rotation.to_string()),
            ("post_writes".to_string(), self.storage.post_writes.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.store_path.is_none());
        assert_eq!(config.storage, StorageSettings::default());
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.storage, StorageSettings::default());
    }

    #[test]
    fn test_set_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::load_from(&path).unwrap();
        config.set("max_bonded_devices", "8").unwrap();
        config.set("store_path", "/tmp/bonds").unwrap();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.get("max_bonded_devices").as_deref(), Some("8"));
        assert_eq!(reloaded.resolved_store_path().unwrap(), PathBuf::from("/tmp/bonds"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        assert!(config.set("max_bonded_devices", "0").is_err());
        assert!(config.set("irk_rotation", "maybe").is_err());
        assert!(config.set("listen_port", "1").is_err());
    }
}
