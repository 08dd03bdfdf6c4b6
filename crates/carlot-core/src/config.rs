//! Application configuration management.
//!
//! Configuration is stored at `~/.config/carlot/config.json`. Every field
//! is optional; unset fields fall back to built-in defaults. The API URL and
//! data directory can also be overridden from the environment.
//!
//! Local storage is scoped to the API origin, so switching endpoints never
//! mixes two collections: `<data_dir>/<host>[_<port>]/`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_URL;
use crate::query::DEFAULT_PAGE_SIZE;

/// Application name used for config/data directory paths
const APP_NAME: &str = "carlot";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default HTTP request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the API URL
pub const ENV_API_URL: &str = "CARLOT_API_URL";

/// Environment variable overriding the data directory
pub const ENV_DATA_DIR: &str = "CARLOT_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub page_size: Option<usize>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
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

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply `CARLOT_API_URL` / `CARLOT_DATA_DIR` if set
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_DATA_DIR).ok().map(PathBuf::from),
        );
    }

    /// Replace fields with any non-empty override
    pub fn apply_overrides(&mut self, api_url: Option<String>, data_dir: Option<PathBuf>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = Some(url);
        }
        if let Some(dir) = data_dir.filter(|d| !d.as_os_str().is_empty()) {
            self.data_dir = Some(dir);
        }
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn page_size(&self) -> usize {
        self.page_size.filter(|&n| n > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Base directory for local data (logs, storage)
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Directory holding the local collection for the configured API origin
    pub fn storage_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(origin_dir_name(self.api_url())))
    }
}

/// Filesystem-safe name for a URL's origin: "example.com" or "localhost_8080"
fn origin_dir_name(url: &str) -> String {
    let Ok(url) = Url::parse(url) else {
        return "default".to_string();
    };
    let Some(host) = url.host_str() else {
        return "default".to_string();
    };

    let host: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();

    match url.port() {
        Some(port) => format!("{}_{}", host, port),
        None => host,
    }
}
