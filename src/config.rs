use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::DEFAULT_TTL_SECS;
use crate::content::gemini;
use crate::error::AppError;
use crate::geolocate::DEFAULT_GEOLOCATION_URL;
use crate::session::DEFAULT_HISTORY_LIMIT;
use crate::weather::TempUnit;

pub const DEFAULT_CONFIG_PATH: &str = "skycast.toml";

const MAX_TIMEOUT_SECS: u64 = 120;
/// One week
const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 3600;

/// Settings loaded from skycast.toml, then overridden by the environment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub openweather_api_key: String,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_geolocation_url")]
    pub geolocation_url: String,
    /// Provider unit system. Snapshots are canonical metric.
    #[serde(default = "default_units")]
    pub units: String,
    /// Unit shown when a session starts
    #[serde(default)]
    pub display_unit: TempUnit,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Bound on the combined current + forecast fetch
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: String::new(),
            gemini_api_key: None,
            base_url: default_base_url(),
            gemini_base_url: default_gemini_base_url(),
            gemini_model: default_gemini_model(),
            geolocation_url: default_geolocation_url(),
            units: default_units(),
            display_unit: TempUnit::default(),
            request_timeout_secs: default_request_timeout(),
            resolve_timeout_secs: default_resolve_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_base_url() -> String { "https://api.openweathermap.org/data/2.5".to_string() }
fn default_gemini_base_url() -> String { gemini::DEFAULT_BASE_URL.to_string() }
fn default_gemini_model() -> String { gemini::DEFAULT_MODEL.to_string() }
fn default_geolocation_url() -> String { DEFAULT_GEOLOCATION_URL.to_string() }
fn default_units() -> String { "metric".to_string() }
fn default_request_timeout() -> u64 { 10 }
fn default_resolve_timeout() -> u64 { 15 }
fn default_cache_ttl() -> u64 { DEFAULT_TTL_SECS as u64 }
fn default_history_limit() -> usize { DEFAULT_HISTORY_LIMIT }

impl AppConfig {
    /// Read the TOML file if it exists, then apply environment overrides.
    /// A missing file at the default path is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env(env);
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = set("OPENWEATHER_API_KEY") {
            self.openweather_api_key = key;
        }
        if let Some(key) = set("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Some(url) = set("OPENWEATHER_BASE_URL") {
            self.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.openweather_api_key.trim().is_empty() {
            return Err(AppError::config(
                "OPENWEATHER_API_KEY not set. Add it to .env or skycast.toml.",
            ));
        }
        if !self.units.eq_ignore_ascii_case("metric") {
            return Err(AppError::config(format!(
                "units must be \"metric\", got \"{}\"",
                self.units
            )));
        }
        for (name, secs) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("resolve_timeout_secs", self.resolve_timeout_secs),
        ] {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(AppError::config(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_TIMEOUT_SECS, secs
                )));
            }
        }
        if self.cache_ttl_secs == 0 || self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(AppError::config(format!(
                "cache_ttl_secs must be between 1 and {}, got {}",
                MAX_CACHE_TTL_SECS, self.cache_ttl_secs
            )));
        }
        for (name, url) in [
            ("base_url", &self.base_url),
            ("gemini_base_url", &self.gemini_base_url),
            ("geolocation_url", &self.geolocation_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::config(format!("{} must be an http(s) URL: {}", name, url)));
            }
        }
        Ok(())
    }

    /// Generative key, if any. Logs the fallback once when absent.
    pub fn gemini_key(&self) -> Option<&str> {
        match self.gemini_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Some(key),
            _ => {
                warn!("GEMINI_API_KEY not set, lifestyle content will use the static table");
                None
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Result<chrono::Duration, AppError> {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| AppError::config(format!("cache_ttl_secs out of range: {}", self.cache_ttl_secs)))
    }
}
