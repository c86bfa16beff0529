//! Application configuration
//!
//! Holds the default and temporary file names used when staging PRMS inputs,
//! the static-files root that per-user workspaces live under, and the hosts
//! of the external model-run service. Every field has a default so a partial
//! TOML file is enough.

use crate::errors::{PrmsError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the static files tree; workspaces live in `<static_root>/user_data`
    pub static_root: PathBuf,
    /// Folder holding the default model inputs; `<static_root>/data` when unset
    pub default_data_dir: Option<PathBuf>,

    pub default_control: String,
    pub default_data: String,
    pub default_param: String,

    pub temp_control: String,
    pub temp_data: String,
    pub temp_param: String,
    /// Target name for a data file after posted values were merged into it
    pub temp_data_updated: String,

    pub model_host: String,

    pub listen: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("static"),
            default_data_dir: None,
            default_control: "LC.control".to_string(),
            default_data: "LC.data.nc".to_string(),
            default_param: "LC.param.nc".to_string(),
            temp_control: "control.control".to_string(),
            temp_data: "data.nc".to_string(),
            temp_param: "parameter.nc".to_string(),
            temp_data_updated: "data_updated.nc".to_string(),
            model_host: "https://model.example.org".to_string(),
            listen: "127.0.0.1:5000".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, or use the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            tracing::info!("No configuration file given, using defaults");
            return Ok(Self::default());
        };

        let contents = fs::read_to_string(path).map_err(|e| {
            PrmsError::ConfigError(format!("Could not read {}: {}", path.display(), e))
        })?;

        let config = Self::from_toml(&contents).map_err(|e| match e {
            PrmsError::ConfigError(msg) => {
                PrmsError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PrmsError::ConfigError(e.to_string()))
    }

    /// Folder the default model inputs are copied from.
    pub fn default_data_dir(&self) -> PathBuf {
        self.default_data_dir
            .clone()
            .unwrap_or_else(|| self.static_root.join("data"))
    }

    /// Folder containing every user's workspace.
    pub fn user_data_root(&self) -> PathBuf {
        self.static_root.join("user_data")
    }
}
