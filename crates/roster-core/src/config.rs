//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! where the users API lives, which credentials to send, and how the page
//! one snapshot behaves.
//!
//! Configuration is stored at `~/.config/roster-admin/config.json`.
//! `ROSTER_API_URL`, `ROSTER_API_KEY` and `ROSTER_AUTH_TOKEN` override the
//! file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_BASE_URL;
use crate::cache::InvalidationPolicy;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "roster-admin";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Public key the demo users API expects
const DEFAULT_API_KEY: &str = "reqres-free-v1";

/// Page one snapshot older than this is refetched.
/// Matches the five minutes a listing is considered fresh.
const DEFAULT_SNAPSHOT_MAX_AGE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub auth_token: Option<String>,
    /// Drop the persisted page one whenever the roster is invalidated
    pub clear_snapshot_on_invalidate: bool,
    /// 0 disables expiry
    pub snapshot_max_age_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            api_key: Some(DEFAULT_API_KEY.to_string()),
            auth_token: None,
            clear_snapshot_on_invalidate: true,
            snapshot_max_age_minutes: DEFAULT_SNAPSHOT_MAX_AGE_MINUTES,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `ROSTER_*` overrides from the given lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ROSTER_API_URL").filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(key) = lookup("ROSTER_API_KEY") {
            self.api_key = Some(key).filter(|v| !v.is_empty());
        }
        if let Some(token) = lookup("ROSTER_AUTH_TOKEN") {
            self.auth_token = Some(token).filter(|v| !v.is_empty());
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn invalidation_policy(&self) -> InvalidationPolicy {
        if self.clear_snapshot_on_invalidate {
            InvalidationPolicy::ClearPersisted
        } else {
            InvalidationPolicy::KeepPersisted
        }
    }

    pub fn snapshot_max_age(&self) -> Option<Duration> {
        (self.snapshot_max_age_minutes > 0).then(|| Duration::minutes(self.snapshot_max_age_minutes))
    }
}
