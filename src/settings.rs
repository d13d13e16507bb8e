//! Loader settings with persistence
//!
//! Settings are saved to `~/.config/strata/loader.toml`

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Runtime and networking settings of an [`AssetLoader`](crate::AssetLoader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Worker threads of the background runtime
    pub worker_threads: usize,
    /// Dependency fetches allowed in flight per load
    pub max_concurrent_fetches: usize,
    /// Per-request HTTP timeout in seconds
    pub http_timeout_secs: u64,
    /// How long dropping the loader waits for running tasks, in milliseconds
    pub shutdown_grace_ms: u64,
    /// User-Agent header for HTTP fetches
    pub user_agent: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            max_concurrent_fetches: 8,
            http_timeout_secs: 30,
            shutdown_grace_ms: 2000,
            user_agent: format!("strata/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl LoaderSettings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("strata"))
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("loader.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No loader settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content).unwrap_or_else(|e| {
                warn!("Failed to parse loader settings: {}, using defaults", e);
                Self::default()
            }),
            Err(e) => {
                warn!("Failed to read loader settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Parse settings from TOML; missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(dir) = Self::config_dir() else {
            anyhow::bail!("Could not determine config directory");
        };

        let path = dir.join("loader.toml");

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved loader settings to {:?}", path);
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
