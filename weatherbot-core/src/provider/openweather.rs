use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{
    Alert, Coordinates, CurrentConditions, Observation, Place, ResolvedLocation,
};

use super::{ConditionsProvider, LocationProvider};

const ONE_CALL_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";
const GEO_DIRECT_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";
const GEO_ZIP_URL: &str = "https://api.openweathermap.org/geo/1.0/zip";
const GEO_REVERSE_URL: &str = "https://api.openweathermap.org/geo/1.0/reverse";

/// OpenWeatherMap client: Geocoding API 1.0 plus One Call 3.0, sharing one
/// API key and HTTP client.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http: Client::new(),
        }
    }

    async fn fetch_one_call(&self, coords: Coordinates) -> Result<Observation> {
        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();

        let res = self
            .http
            .get(ONE_CALL_URL)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            // The body's own error code and message beat the transport status.
            if let Some(message) = application_error(&body) {
                return Err(Error::Provider(message));
            }
            return Err(Error::Provider(format!(
                "one-call request failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        parse_one_call(&body)
    }
}

#[async_trait]
impl ConditionsProvider for OpenWeatherProvider {
    async fn observe(&self, coords: Coordinates) -> Result<Observation> {
        self.fetch_one_call(coords).await
    }
}

#[async_trait]
impl LocationProvider for OpenWeatherProvider {
    async fn direct(&self, query: &str) -> Result<ResolvedLocation> {
        let res = self
            .http
            .get(GEO_DIRECT_URL)
            .query(&[("q", query), ("limit", "1"), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(Error::Provider(format!(
                "direct geocode failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        parse_geo_best_match(&body, query)
    }

    async fn by_zip(&self, zip: &str) -> Result<ResolvedLocation> {
        let res = self
            .http
            .get(GEO_ZIP_URL)
            .query(&[("zip", zip), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(zip.to_string()));
        }
        if !status.is_success() {
            return Err(Error::Provider(format!(
                "zip geocode failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        parse_geo_zip(&body)
    }

    async fn reverse(&self, coords: Coordinates) -> Result<Place> {
        let lat = coords.latitude.to_string();
        let lon = coords.longitude.to_string();

        let res = self
            .http
            .get(GEO_REVERSE_URL)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("limit", "1"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(Error::Provider(format!(
                "reverse geocode failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        let matches: Vec<OwGeoPlace> = serde_json::from_str(&body)
            .map_err(|e| Error::Provider(format!("unexpected reverse geocode response: {e}")))?;

        matches
            .into_iter()
            .next()
            .map(OwGeoPlace::into_place)
            .ok_or_else(|| {
                Error::NotFound(format!("{},{}", coords.latitude, coords.longitude))
            })
    }
}

#[derive(Debug, Deserialize)]
struct OwGeoPlace {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
    state: Option<String>,
}

impl OwGeoPlace {
    fn into_place(self) -> Place {
        Place {
            name: self.name,
            region: self.state,
            country: self.country,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwGeoZip {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWeatherLine {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrent {
    dt: i64,
    temp: f64,
    feels_like: f64,
    humidity: u8,
    #[serde(default)]
    wind_speed: f64,
    #[serde(default)]
    uvi: f64,
    #[serde(default)]
    weather: Vec<OwWeatherLine>,
}

#[derive(Debug, Deserialize)]
struct OwAlert {
    sender_name: Option<String>,
    event: String,
    #[serde(default)]
    start: i64,
    end: Option<i64>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OwOneCall {
    lat: f64,
    lon: f64,
    #[serde(default)]
    timezone_offset: i32,
    current: Option<OwCurrent>,
    #[serde(default)]
    alerts: Vec<OwAlert>,
}

/// Detect an application-level error status embedded in a response body.
/// OpenWeatherMap reports errors as `{"cod": ..., "message": ...}` where
/// `cod` may be a number or a string.
fn application_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let code = value
        .get("cod")
        .and_then(|c| c.as_i64().or_else(|| c.as_str().and_then(|s| s.parse().ok())))?;
    if code == 200 {
        return None;
    }
    let message = value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown provider error");
    Some(message.to_string())
}

fn parse_one_call(body: &str) -> Result<Observation> {
    if let Some(message) = application_error(body) {
        return Err(Error::Provider(message));
    }

    let parsed: OwOneCall = serde_json::from_str(body)
        .map_err(|e| Error::Provider(format!("unexpected one-call response: {e}")))?;

    let current = parsed.current.ok_or_else(|| {
        Error::DataUnavailable("one-call response has no current section".to_string())
    })?;

    let (summary, description, icon) = current
        .weather
        .into_iter()
        .next()
        .map(|w| (w.main, w.description, w.icon))
        .unwrap_or_else(|| ("Unknown".to_string(), "Unknown".to_string(), String::new()));

    let alerts: Vec<Alert> = parsed
        .alerts
        .into_iter()
        .map(|a| Alert {
            event: a.event,
            description: a.description,
            sender: a.sender_name,
            starts_at: a.start,
            ends_at: a.end,
            tags: a.tags,
            ..Alert::default()
        })
        .collect();

    debug!(alerts = alerts.len(), "parsed one-call response");

    Ok(Observation {
        coordinates: Coordinates { latitude: parsed.lat, longitude: parsed.lon },
        utc_offset_secs: parsed.timezone_offset,
        current: CurrentConditions {
            summary,
            description,
            temperature_k: current.temp,
            feels_like_k: current.feels_like,
            humidity_pct: current.humidity,
            wind_speed: current.wind_speed,
            uv_index: current.uvi,
            icon,
            observed_at: current.dt,
        },
        alerts,
    })
}

fn parse_geo_best_match(body: &str, query: &str) -> Result<ResolvedLocation> {
    let matches: Vec<OwGeoPlace> = serde_json::from_str(body)
        .map_err(|e| Error::Provider(format!("unexpected direct geocode response: {e}")))?;

    matches
        .into_iter()
        .next()
        .map(|m| ResolvedLocation {
            coordinates: Coordinates { latitude: m.lat, longitude: m.lon },
            place: m.into_place(),
        })
        .ok_or_else(|| Error::NotFound(query.to_string()))
}

fn parse_geo_zip(body: &str) -> Result<ResolvedLocation> {
    let parsed: OwGeoZip = serde_json::from_str(body)
        .map_err(|e| Error::Provider(format!("unexpected zip geocode response: {e}")))?;

    Ok(ResolvedLocation {
        coordinates: Coordinates { latitude: parsed.lat, longitude: parsed.lon },
        place: Place { name: parsed.name, region: None, country: parsed.country },
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_CALL_FIXTURE: &str = r#"{
        "lat": 36.1622,
        "lon": -86.7744,
        "timezone": "America/Chicago",
        "timezone_offset": -21600,
        "current": {
            "dt": 1766110733,
            "temp": 283.15,
            "feels_like": 282.57,
            "humidity": 90,
            "wind_speed": 3.6,
            "uvi": 0.16,
            "weather": [
                {"id": 803, "main": "Rain", "description": "broken clouds", "icon": "10n"}
            ]
        },
        "alerts": [
            {
                "sender_name": "NWS Nashville TN",
                "event": "Flood Advisory",
                "start": 1766105778,
                "end": 1766116800,
                "description": "* WHAT...Flooding caused by excessive rainfall is expected.",
                "tags": ["Flood"]
            }
        ]
    }"#;

    #[test]
    fn parse_one_call_maps_current_and_alerts() {
        let obs = parse_one_call(ONE_CALL_FIXTURE).expect("fixture parses");
        assert_eq!(obs.coordinates.latitude, 36.1622);
        assert_eq!(obs.utc_offset_secs, -21600);
        assert_eq!(obs.current.summary, "Rain");
        assert_eq!(obs.current.description, "broken clouds");
        assert_eq!(obs.current.temperature_k, 283.15);
        assert_eq!(obs.current.humidity_pct, 90);
        assert_eq!(obs.current.icon, "10n");
        assert_eq!(obs.current.observed_at, 1766110733);
        assert_eq!(obs.alerts.len(), 1);

        let alert = &obs.alerts[0];
        assert_eq!(alert.event, "Flood Advisory");
        assert_eq!(alert.sender.as_deref(), Some("NWS Nashville TN"));
        assert_eq!(alert.starts_at, 1766105778);
        assert_eq!(alert.ends_at, Some(1766116800));
        assert_eq!(alert.tags, vec!["Flood".to_string()]);
        assert!(alert.severity.is_none());
    }

    #[test]
    fn parse_one_call_normalizes_missing_alerts_to_empty() {
        let body = r#"{
            "lat": 51.5, "lon": -0.12, "timezone_offset": 0,
            "current": {"dt": 1, "temp": 288.15, "feels_like": 288.15, "humidity": 50,
                        "wind_speed": 1.0, "uvi": 0.0,
                        "weather": [{"main": "Clouds", "description": "scattered clouds", "icon": "03n"}]}
        }"#;
        let obs = parse_one_call(body).expect("parses without alerts");
        assert!(obs.alerts.is_empty());
    }

    #[test]
    fn parse_one_call_without_current_is_data_unavailable() {
        let body = r#"{"lat": 1.0, "lon": 2.0, "timezone_offset": 0}"#;
        let err = parse_one_call(body).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(_)));
    }

    #[test]
    fn embedded_error_code_beats_parsing() {
        let body = r#"{"cod": 401, "message": "Invalid API key."}"#;
        let err = parse_one_call(body).unwrap_err();
        match err {
            Error::Provider(msg) => assert_eq!(msg, "Invalid API key."),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn embedded_error_code_may_be_a_string() {
        let body = r#"{"cod": "404", "message": "city not found"}"#;
        assert_eq!(application_error(body), Some("city not found".to_string()));
        assert_eq!(application_error(r#"{"cod": 200}"#), None);
        assert_eq!(application_error("not json"), None);
    }

    #[test]
    fn parse_direct_best_match() {
        let body = r#"[
            {"name": "Denver", "lat": 39.7392364, "lon": -104.984862,
             "country": "US", "state": "Colorado"}
        ]"#;
        let resolved = parse_geo_best_match(body, "denver,co,us").expect("one match");
        assert_eq!(resolved.place.label(), "Denver, Colorado");
        assert_eq!(resolved.coordinates.latitude, 39.7392364);
    }

    #[test]
    fn parse_direct_empty_array_is_not_found() {
        let err = parse_geo_best_match("[]", "nowhere, ZZ").unwrap_err();
        match err {
            Error::NotFound(query) => assert_eq!(query, "nowhere, ZZ"),
            other => panic!("expected not-found, got {other:?}"),
        }
    }

    #[test]
    fn parse_zip_has_no_region() {
        let body = r#"{"zip": "37206", "name": "Nashville", "lat": 36.1798,
                       "lon": -86.7411, "country": "US"}"#;
        let resolved = parse_geo_zip(body).expect("zip parses");
        assert_eq!(resolved.place.label(), "Nashville, US");
        assert!(resolved.place.region.is_none());
    }
}
