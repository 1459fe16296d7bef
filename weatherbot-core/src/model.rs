use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Best-effort label for a set of coordinates. Optional fields are absent
/// when the geocoding provider does not supply them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl Place {
    /// `"{name}, {region}"` when a region is present, else
    /// `"{name}, {country}"`, else the bare name.
    pub fn label(&self) -> String {
        if let Some(region) = &self.region {
            format!("{}, {}", self.name, region)
        } else if let Some(country) = &self.country {
            format!("{}, {}", self.name, country)
        } else {
            self.name.clone()
        }
    }
}

/// Coordinates plus the place label the resolver attached to them.
#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    pub place: Place,
}

/// Current conditions as reported by the weather provider.
///
/// Temperatures stay in Kelvin until formatting time; Fahrenheit and
/// Celsius are derived there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Coarse grouping, e.g. "Rain".
    pub summary: String,
    /// Long form, e.g. "broken clouds".
    pub description: String,
    pub temperature_k: f64,
    pub feels_like_k: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    pub uv_index: f64,
    /// Provider icon id, e.g. "10n".
    pub icon: String,
    /// Observation time, Unix epoch seconds.
    pub observed_at: i64,
}

/// An active weather alert. One-call alerts carry `tags` but no
/// severity/certainty; NWS zone alerts are the other way around.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Alert {
    pub event: String,
    pub headline: Option<String>,
    pub description: String,
    pub severity: Option<String>,
    pub certainty: Option<String>,
    pub areas: Option<String>,
    pub instruction: Option<String>,
    pub sender: Option<String>,
    /// Unix epoch seconds.
    pub starts_at: i64,
    pub ends_at: Option<i64>,
    pub tags: Vec<String>,
}

impl Alert {
    /// Headline when present, otherwise the event name.
    pub fn title(&self) -> &str {
        self.headline.as_deref().unwrap_or(&self.event)
    }
}

/// Everything a single one-call round trip returns: the provider's own
/// coordinates for the observation, its UTC offset, current conditions,
/// and any inline alerts (normalized to empty when absent).
#[derive(Debug, Clone)]
pub struct Observation {
    pub coordinates: Coordinates,
    pub utc_offset_secs: i32,
    pub current: CurrentConditions,
    pub alerts: Vec<Alert>,
}

/// A resolved place joined with its observation; the formatter's input.
#[derive(Debug, Clone)]
pub struct WeatherReport {
    pub place: Place,
    pub observation: Observation,
}

impl WeatherReport {
    /// Display label for the report's location, falling back to raw
    /// coordinates when reverse geocoding produced nothing.
    pub fn location_label(&self) -> String {
        if self.place.name.is_empty() {
            let c = self.observation.coordinates;
            format!("{:.4},{:.4}", c.latitude, c.longitude)
        } else {
            self.place.label()
        }
    }
}
