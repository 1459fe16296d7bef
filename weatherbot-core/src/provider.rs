use crate::{
    Config,
    error::{Error, Result},
    model::{Alert, Coordinates, Observation, Place, ResolvedLocation},
    provider::{nws::NwsProvider, openweather::OpenWeatherProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod nws;
pub mod openweather;

/// Where active alerts come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSource {
    /// Inline with the one-call payload; no extra round trips.
    OneCall,
    /// National Weather Service zone lookup, sent as a second message.
    Nws,
}

impl AlertSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSource::OneCall => "onecall",
            AlertSource::Nws => "nws",
        }
    }

    pub const fn all() -> &'static [AlertSource] {
        &[AlertSource::OneCall, AlertSource::Nws]
    }
}

impl std::fmt::Display for AlertSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AlertSource {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "onecall" => Ok(AlertSource::OneCall),
            "nws" => Ok(AlertSource::Nws),
            _ => Err(Error::Configuration(format!(
                "Unknown alert source '{value}'. Supported sources: onecall, nws."
            ))),
        }
    }
}

/// Geocoding seam: query/zip/coordinates in, coordinates and labels out.
#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    /// Best-match free-form geocode (result limit 1).
    async fn direct(&self, query: &str) -> Result<ResolvedLocation>;

    /// Geocode a postal/zip code.
    async fn by_zip(&self, zip: &str) -> Result<ResolvedLocation>;

    /// Reverse geocode coordinates to a place label.
    async fn reverse(&self, coords: Coordinates) -> Result<Place>;
}

/// Current-conditions seam.
#[async_trait]
pub trait ConditionsProvider: Send + Sync + Debug {
    /// Fetch current conditions (and any inline alerts) for coordinates.
    async fn observe(&self, coords: Coordinates) -> Result<Observation>;
}

/// Separate-alert-fetch seam, used when the alert source is `nws`.
#[async_trait]
pub trait AlertProvider: Send + Sync + Debug {
    /// Active alerts for the jurisdiction covering the coordinates. An
    /// empty list is a valid outcome, including for locations outside the
    /// provider's coverage.
    async fn active_alerts(&self, coords: Coordinates) -> Result<Vec<Alert>>;
}

/// Construct the geocoding provider from config.
pub fn location_provider_from_config(config: &Config) -> Result<Box<dyn LocationProvider>> {
    Ok(Box::new(OpenWeatherProvider::new(require_api_key(config)?)))
}

/// Construct the conditions provider from config.
pub fn conditions_provider_from_config(config: &Config) -> Result<Box<dyn ConditionsProvider>> {
    Ok(Box::new(OpenWeatherProvider::new(require_api_key(config)?)))
}

/// Construct the separate alert provider from config; `None` when alerts
/// arrive inline with the one-call payload.
pub fn alert_provider_from_config(config: &Config) -> Result<Option<Box<dyn AlertProvider>>> {
    match config.alert_source()? {
        AlertSource::OneCall => Ok(None),
        AlertSource::Nws => Ok(Some(Box::new(NwsProvider::new()?))),
    }
}

fn require_api_key(config: &Config) -> Result<String> {
    config
        .api_key()
        .map(str::to_owned)
        .ok_or_else(|| Error::Configuration("No API Key configured.".to_string()))
}
