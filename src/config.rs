//! Configuration management for tkp
//!
//! Handles config file loading/saving. The one setting the app cannot do
//! without is the source URL; the rest tune the player and cache.
//! Config is stored at ~/.config/tkp/config.toml. `TKP_SOURCE_URL` is read
//! by clap as `--source`, never from here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::VideoCache;
use crate::feed::DEFAULT_PRELOAD_SECS;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebDAV/HTTP listing URL (directory page or JSON array)
    pub source_url: Option<String>,
    /// mpv binary to launch
    pub player_path: Option<String>,
    /// Cache directory override
    pub cache_dir: Option<PathBuf>,
    /// Forward buffer for the next page, in seconds
    pub preload_secs: Option<u32>,
    /// Connect timeout for listing fetches, in seconds
    pub connect_timeout_secs: Option<u64>,
}

impl Config {
    /// Get config file path (~/.config/tkp/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tkp").join("config.toml"))
    }

    /// Load config from a specific file; missing or invalid files give defaults
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Store a new source URL (blank clears it)
    pub fn set_source_url(&mut self, url: &str) {
        let url = url.trim();
        self.source_url = if url.is_empty() {
            None
        } else {
            Some(url.to_string())
        };
    }

    pub fn player_command(&self) -> &str {
        self.player_path.as_deref().unwrap_or("mpv")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(VideoCache::default_dir)
    }

    pub fn preload_secs(&self) -> u32 {
        self.preload_secs.unwrap_or(DEFAULT_PRELOAD_SECS)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs.unwrap_or(10))
    }
}

/// Config plus the file it was loaded from
#[derive(Debug, Clone)]
pub struct ConfigStore {
    pub config: Config,
    path: Option<PathBuf>,
}

impl ConfigStore {
    /// Load from an explicit path or the default location
    pub fn open(path: Option<PathBuf>) -> Self {
        let path = path.or_else(Config::path);
        let config = path.as_deref().map(Config::load_from).unwrap_or_default();
        Self { config, path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.config.save_to(path)
    }
}
