//! Client configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! covers the API endpoint, the fixed header set the vendor API expects,
//! retry and refresh timing, and the last used username.
//!
//! Configuration is stored at `~/.config/flexgo/config.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, RetryPolicy};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "flexgo";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Token file name in cache directory
const TOKEN_FILE: &str = "token.json";

pub const DEFAULT_API_URL: &str = "https://api.climatixic.com";

/// User agent of the vendor's iOS app; the API gateway expects an app-like client.
pub const DEFAULT_USER_AGENT: &str = "Flexit%20GO/2.0.6 CFNetwork/1128.0.1 Darwin/19.6.0";

pub const DEFAULT_TIME_ZONE: &str = "Europe/Stockholm";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    /// Value of the `Ocp-Apim-Subscription-Key` header.
    pub subscription_key: Option<String>,
    pub user_agent: String,
    pub accept_language: String,
    pub content_type: String,
    /// Additional headers sent with every request.
    pub extra_headers: BTreeMap<String, String>,
    /// IANA zone token expiry is expressed in, both in memory and in the token file.
    pub time_zone: String,
    /// Where the session token is persisted; `None` uses the cache directory.
    pub token_file: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub retries: u32,
    pub retry_delay_secs: u64,
    /// Upper bound on the time one call may spend across all its attempts.
    pub retry_deadline_secs: Option<u64>,
    /// Tokens are refreshed this long before they actually expire.
    pub refresh_margin_minutes: i64,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            subscription_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-us".to_string(),
            content_type: "application/json; charset=utf-8".to_string(),
            extra_headers: BTreeMap::new(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            token_file: None,
            request_timeout_secs: 20,
            retries: 3,
            retry_delay_secs: 10,
            retry_deadline_secs: None,
            refresh_margin_minutes: 60,
            last_username: None,
        }
    }
}

impl Config {
    /// Load the config from the default location, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
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

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Resolved token file location.
    pub fn token_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.token_file {
            return Ok(path.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(TOKEN_FILE))
    }

    pub fn tz(&self) -> Result<Tz, ApiError> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|e| ApiError::Config(format!("time zone {:?}: {}", self.time_zone, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_margin(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.refresh_margin_minutes.max(0))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retries.max(1),
            delay: Duration::from_secs(self.retry_delay_secs),
            deadline: self.retry_deadline_secs.map(Duration::from_secs),
        }
    }
}
