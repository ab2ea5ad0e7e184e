//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Defines the structs for the Telegram connection, the upstream train API, the poller
//! and storage/logging locations.

use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reads the YAML file, falling back to defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_env: default_token_env(),
        }
    }
}

impl TelegramConfig {
    /// Explicit token first, then the configured environment variable.
    pub fn resolve_token(&self) -> Result<String> {
        let token = match &self.token {
            Some(token) => token.clone(),
            None => std::env::var(&self.token_env).unwrap_or_default(),
        };
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(anyhow!(
                "No bot token supplied; set telegram.token or {}",
                self.token_env
            ));
        }
        Ok(token)
    }
}

fn default_token_env() -> String {
    "TRAIN_BOT_TOKEN".to_string()
}

/// Upstream train data API.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://scraper.infotren.dcdev.ro/v3".to_string()
}
fn default_api_timeout() -> u64 {
    15
}

/// Subscription check cycle settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollerConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_check_timeout")]
    pub check_timeout_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            workers: default_workers(),
            check_timeout_secs: default_check_timeout(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs.max(1))
    }
}

fn default_interval() -> u64 {
    90
}
fn default_workers() -> usize {
    8
}
fn default_check_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// IANA name of the service timezone, e.g. `Europe/Bucharest`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_web_app_url")]
    pub web_app_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            web_app_url: default_web_app_url(),
        }
    }
}

impl ServiceConfig {
    pub fn zone(&self) -> Result<Tz> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid service.timezone {:?}: {}", self.timezone, e))
    }
}

fn default_timezone() -> String {
    "Europe/Bucharest".to_string()
}
fn default_web_app_url() -> String {
    "https://kai.infotren.dcdev.ro/view-train.html".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_state_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> String {
    "data/state.json".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub directory: String,
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_dir() -> String {
    "data".to_string()
}
fn default_log_file() -> String {
    "session.log".to_string()
}
fn default_log_filter() -> String {
    "info,teloxide=warn,reqwest=warn,hyper=warn".to_string()
}
