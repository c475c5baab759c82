use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{OrmLinkError, Result};

/// Default name of the project configuration module when none is configured.
pub const DEFAULT_SETTINGS_MODULE: &str = "settings";

/// Plugin configuration, loaded once at plugin construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Fully-qualified name of the project's configuration module, the one
    /// that declares the installed-application list.
    pub settings_module: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            version: 1,
            settings_module: DEFAULT_SETTINGS_MODULE.to_string(),
        }
    }
}

/// Loads the plugin configuration from disk.
///
/// If the file does not exist, returns the default configuration.
pub fn load_config(config_path: &Path) -> Result<PluginConfig> {
    if !config_path.exists() {
        return Ok(PluginConfig::default());
    }

    let contents = fs::read_to_string(config_path).map_err(|e| OrmLinkError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    let config: PluginConfig =
        serde_json::from_str(&contents).map_err(|e| OrmLinkError::Config {
            message: format!(
                "failed to parse config file '{}': {}",
                config_path.display(),
                e
            ),
        })?;

    Ok(config)
}

/// Saves the plugin configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it into place, so a
/// partial write never corrupts the configuration.
pub fn save_config(config_path: &Path, config: &PluginConfig) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| OrmLinkError::Config {
            message: format!(
                "failed to create config directory '{}': {}",
                parent.display(),
                e
            ),
        })?;
    }

    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| OrmLinkError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| OrmLinkError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, config_path).map_err(|e| OrmLinkError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}
