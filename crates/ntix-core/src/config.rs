//! Configuration management for ntix.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.

use crate::error::{IndexError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for ntix.
///
/// ## Example Configuration File (ntix.toml)
///
/// ```toml
/// [general]
/// log_level = "debug"
///
/// [volume]
/// cluster_size = 4096
///
/// [index]
/// name = "$I30"
/// show_sentinels = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Geometry of the volume the dumps came from
    pub volume: VolumeConfig,

    /// Which index to read and how to list it
    pub index: IndexConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
        }
    }
}

/// Volume geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Filesystem cluster size in bytes
    pub cluster_size: u32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        VolumeConfig { cluster_size: 4096 }
    }
}

/// Index selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Attribute name of the index (`$I30` for directories)
    pub name: String,

    /// Include keyless sentinel entries in listings
    pub show_sentinels: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            name: "$I30".to_string(),
            show_sentinels: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| IndexError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| IndexError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "ntix").ok_or_else(|| IndexError::ConfigError {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("ntix.toml"))
    }

    /// Reject settings the index reader cannot work with.
    pub fn validate(&self) -> Result<()> {
        let cluster_size = self.volume.cluster_size;
        if cluster_size == 0 || !cluster_size.is_power_of_two() {
            return Err(IndexError::ConfigError {
                reason: format!("cluster_size must be a power of two, got {}", cluster_size),
            });
        }
        if self.index.name.is_empty() {
            return Err(IndexError::ConfigError {
                reason: "index name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
