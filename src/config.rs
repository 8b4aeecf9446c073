// src/config.rs
//! Configuration file parsing
//!
//! Supports TOML configuration files with the following sections:
//! - [fetch] - User agents, HTTP timeout, download directory
//! - [hoist] - Recursion depth of the hoisting normalizer
//! - [manifest] - Schema version stamped on written manifests
//!
//! Every field has a default, so an empty file (or no file) is valid.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub hoist: HoistConfig,

    #[serde(default)]
    pub manifest: ManifestConfig,
}

/// Installer download settings
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// User agent of the first download attempt
    #[serde(default = "default_primary_user_agent")]
    pub primary_user_agent: String,

    /// User agent of the single retry
    #[serde(default = "default_fallback_user_agent")]
    pub fallback_user_agent: String,

    /// HTTP client timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Parent of the per-run download directory (system temp dir if unset)
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            primary_user_agent: default_primary_user_agent(),
            fallback_user_agent: default_fallback_user_agent(),
            timeout_secs: default_timeout_secs(),
            download_dir: None,
        }
    }
}

fn default_primary_user_agent() -> String {
    format!("manifold/{}", env!("CARGO_PKG_VERSION"))
}

fn default_fallback_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
        .to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

/// Hoisting normalizer settings
#[derive(Debug, Clone, Deserialize)]
pub struct HoistConfig {
    /// How many mapping levels push and pull recurse into
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for HoistConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> usize {
    2
}

/// Written manifest settings
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_version")]
    pub manifest_version: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            manifest_version: default_manifest_version(),
        }
    }
}

fn default_manifest_version() -> String {
    "1.10.0".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.fetch.timeout_secs == 0 {
            return Err(Error::ConfigError("fetch.timeout_secs must be greater than 0".to_string()));
        }
        if self.fetch.primary_user_agent.trim().is_empty() || self.fetch.fallback_user_agent.trim().is_empty() {
            return Err(Error::ConfigError("fetch user agents must not be empty".to_string()));
        }
        Ok(())
    }
}
