use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "MRAG_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub theme: Option<String>,
    pub health_timeout_secs: u64,
    pub query_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub notification_lifetime_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            theme: None,
            health_timeout_secs: 10,
            query_timeout_secs: 120,
            upload_timeout_secs: 300,
            notification_lifetime_ms: 5000,
        }
    }

    /// Load from the user config dir, falling back to defaults when the file
    /// doesn't exist. `MRAG_API_URL` wins over the file.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_base_url = url;
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Persist `theme`, leaving every other field as the file has it.
    /// Environment overrides are not written back.
    pub fn save_theme(theme: &str) -> Result<()> {
        Self::save_theme_to(&Self::get_config_path()?, theme)
    }

    pub fn save_theme_to(path: &Path, theme: &str) -> Result<()> {
        let mut config = Self::load_from(path).unwrap_or_else(|_| Self::new());
        config.theme = Some(theme.to_string());
        config.save_to(path)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            health: Duration::from_secs(self.health_timeout_secs),
            query: Duration::from_secs(self.query_timeout_secs),
            upload: Duration::from_secs(self.upload_timeout_secs),
        }
    }

    pub fn timings(&self) -> Timings {
        Timings {
            notification_lifetime: Duration::from_millis(self.notification_lifetime_ms),
            ..Timings::default()
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("mrag").join("config.json"))
    }
}

/// Per-request timeouts applied by the API client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub health: Duration,
    pub query: Duration,
    pub upload: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Config::new().timeouts()
    }
}

/// Timer constants for the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub notification_lifetime: Duration,
    pub progress_interval: Duration,
    pub progress_step: u8,
    pub progress_ceiling: u8,
    /// Pause between a successful upload response and activating the document
    pub activation_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            notification_lifetime: Duration::from_millis(5000),
            progress_interval: Duration::from_millis(200),
            progress_step: 10,
            progress_ceiling: 90,
            activation_delay: Duration::from_millis(500),
        }
    }
}
