//! Configuration management
//!
//! Settings live in `settings.json` inside the Vuluz directory:
//! ```json
//! {
//!   "app": {
//!     "apiBaseUrl": "http://localhost:8080",
//!     "currency": "IDR",
//!     "requestTimeoutSecs": 30,
//!     "idleTimeoutMins": 15,
//!     "demoMode": false
//!   }
//! }
//! ```
//! Keys this crate does not manage are kept as-is on save.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::http::API_BASE_URL_ENV;
use crate::domain::AmountLimits;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_CURRENCY: &str = "IDR";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_IDLE_TIMEOUT_MINS: i64 = 15;

/// Environment variable forcing demo mode on or off
pub const DEMO_MODE_ENV: &str = "VULUZ_DEMO_MODE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    idle_timeout_mins: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transfer_limits: Option<AmountLimits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    top_up_limits: Option<AmountLimits>,
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Vuluz configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub currency: String,
    pub request_timeout: Duration,
    pub idle_timeout_mins: i64,
    pub transfer_limits: AmountLimits,
    pub top_up_limits: AmountLimits,
    /// Use the offline in-memory backend instead of the REST API
    pub demo_mode: bool,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            idle_timeout_mins: DEFAULT_IDLE_TIMEOUT_MINS,
            transfer_limits: AmountLimits::transfer(),
            top_up_limits: AmountLimits::top_up(),
            demo_mode: false,
            _raw_settings: SettingsFile::default(),
        }
    }
}

fn read_settings(settings_path: &Path) -> Result<SettingsFile> {
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

impl Config {
    /// Load config from the Vuluz directory
    ///
    /// `VULUZ_API_BASE_URL` overrides the stored base URL and
    /// `VULUZ_DEMO_MODE` the stored demo flag.
    pub fn load(vuluz_dir: &Path) -> Result<Self> {
        let raw = read_settings(&vuluz_dir.join("settings.json"))?;
        let app = &raw.app;

        let api_base_url = std::env::var(API_BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| app.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let demo_mode = match std::env::var(DEMO_MODE_ENV).ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => app.demo_mode,
        };

        Ok(Self {
            api_base_url,
            currency: app
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            request_timeout: Duration::from_secs(
                app.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            idle_timeout_mins: app.idle_timeout_mins.unwrap_or(DEFAULT_IDLE_TIMEOUT_MINS),
            transfer_limits: app.transfer_limits.unwrap_or_else(AmountLimits::transfer),
            top_up_limits: app.top_up_limits.unwrap_or_else(AmountLimits::top_up),
            demo_mode,
            _raw_settings: raw,
        })
    }

    /// Save config to the Vuluz directory
    ///
    /// Only fields this crate manages are written; everything else in the
    /// file is preserved.
    pub fn save(&self, vuluz_dir: &Path) -> Result<()> {
        let settings_path = vuluz_dir.join("settings.json");
        let mut settings = read_settings(&settings_path)?;

        settings.app.api_base_url = Some(self.api_base_url.clone());
        settings.app.currency = Some(self.currency.clone());
        settings.app.request_timeout_secs = Some(self.request_timeout.as_secs());
        settings.app.idle_timeout_mins = Some(self.idle_timeout_mins);
        settings.app.demo_mode = self.demo_mode;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Point the client at another backend
    pub fn set_api_base_url(&mut self, url: &str) -> Result<()> {
        let trimmed = url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("API base URL cannot be empty");
        }
        url::Url::parse(trimmed)?;
        self.api_base_url = trimmed.to_string();
        Ok(())
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }

    pub fn idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.idle_timeout_mins)
    }
}
