use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};

use crate::model::Coordinates;
use crate::provider::AlertSource;

/// Environment variables that override the config file, matching the
/// deployment surface of the hosted bot.
pub const ENV_API_KEY: &str = "OPEN_WEATHER_MAP_API_KEY";
pub const ENV_DEFAULT_LATITUDE: &str = "DEFAULT_LATITUDE";
pub const ENV_DEFAULT_LONGITUDE: &str = "DEFAULT_LONGITUDE";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// default_latitude = 36.1798
/// default_longitude = -86.7411
/// alert_source = "onecall"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// OpenWeatherMap API key, shared by the geocoding and one-call endpoints.
    pub api_key: Option<String>,

    /// Coordinates used for the bare `weather` command.
    pub default_latitude: Option<f64>,
    pub default_longitude: Option<f64>,

    /// Where alerts come from: "onecall" (inline) or "nws" (zone lookup).
    pub alert_source: Option<String>,
}

impl Config {
    /// API key, if configured.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Default coordinates, present only when both halves are set.
    pub fn default_coordinates(&self) -> Option<Coordinates> {
        match (self.default_latitude, self.default_longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        }
    }

    /// Return the alert source as a strongly-typed id, defaulting to the
    /// inline one-call variant when unset.
    pub fn alert_source(&self) -> crate::Result<AlertSource> {
        match self.alert_source.as_deref() {
            Some(s) => AlertSource::try_from(s),
            None => Ok(AlertSource::OneCall),
        }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn set_default_coordinates(&mut self, coords: Coordinates) {
        self.default_latitude = Some(coords.latitude);
        self.default_longitude = Some(coords.longitude);
    }

    pub fn set_alert_source(&mut self, source: AlertSource) {
        self.alert_source = Some(source.to_string());
    }

    /// Load config from disk (an empty default if the file doesn't exist
    /// yet), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            // First run: no config file, start empty.
            Self::default()
        };

        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Apply environment variable overrides on top of whatever the file had.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var(ENV_API_KEY) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Some(lat) = parse_env_f64(ENV_DEFAULT_LATITUDE) {
            self.default_latitude = Some(lat);
        }
        if let Some(lon) = parse_env_f64(ENV_DEFAULT_LONGITUDE) {
            self.default_longitude = Some(lon);
        }
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherbot", "weatherbot")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn parse_env_f64(name: &str) -> Option<f64> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {name}: {raw:?} is not a number");
            None
        }
    }
}
