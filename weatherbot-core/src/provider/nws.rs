use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Alert, Coordinates};

use super::AlertProvider;

const NWS_BASE_URL: &str = "https://api.weather.gov";

// api.weather.gov rejects requests without an identifying User-Agent.
const USER_AGENT: &str = "weatherbot/0.1 (weatherbot)";

/// National Weather Service client: resolves coordinates to a county zone,
/// then fetches the zone's active alerts. No API key required.
#[derive(Debug, Clone)]
pub struct NwsProvider {
    http: Client,
}

impl NwsProvider {
    pub fn new() -> Result<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }

    async fn fetch_zone(&self, coords: Coordinates) -> Result<Option<String>> {
        let url = format!("{NWS_BASE_URL}/points/{},{}", coords.latitude, coords.longitude);
        let res = self.http.get(&url).send().await?;

        let status = res.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            // Outside NWS coverage. Expected for non-US locations.
            debug!("no NWS point data for {},{}", coords.latitude, coords.longitude);
            return Ok(None);
        }

        let body = res.text().await?;
        if !status.is_success() {
            return Err(Error::Provider(format!(
                "points lookup failed with status {status}"
            )));
        }

        parse_zone(&body)
    }

    async fn fetch_zone_alerts(&self, zone: &str) -> Result<Vec<Alert>> {
        let url = format!("{NWS_BASE_URL}/alerts/active/zone/{zone}");
        let res = self.http.get(&url).send().await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(Error::Provider(format!(
                "zone alerts request failed with status {status}"
            )));
        }

        parse_alerts(&body)
    }
}

#[async_trait]
impl AlertProvider for NwsProvider {
    async fn active_alerts(&self, coords: Coordinates) -> Result<Vec<Alert>> {
        let Some(zone) = self.fetch_zone(coords).await? else {
            return Ok(Vec::new());
        };
        debug!("fetching active alerts for zone {zone}");
        self.fetch_zone_alerts(&zone).await
    }
}

#[derive(Debug, Deserialize)]
struct NwsPoints {
    properties: NwsPointProperties,
}

#[derive(Debug, Deserialize)]
struct NwsPointProperties {
    county: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NwsAlertCollection {
    #[serde(default)]
    features: Vec<NwsFeature>,
}

#[derive(Debug, Deserialize)]
struct NwsFeature {
    properties: NwsAlertProperties,
}

#[derive(Debug, Deserialize)]
struct NwsAlertProperties {
    event: String,
    headline: Option<String>,
    description: Option<String>,
    severity: Option<String>,
    certainty: Option<String>,
    #[serde(rename = "areaDesc")]
    area_desc: Option<String>,
    instruction: Option<String>,
    response: Option<String>,
    #[serde(rename = "senderName")]
    sender_name: Option<String>,
    effective: Option<DateTime<FixedOffset>>,
    onset: Option<DateTime<FixedOffset>>,
    ends: Option<DateTime<FixedOffset>>,
    expires: Option<DateTime<FixedOffset>>,
}

/// Extract the county zone code from a points response. A missing county
/// means the coordinates are outside supported coverage, which is an
/// expected outcome rather than a fault.
fn parse_zone(body: &str) -> Result<Option<String>> {
    let parsed: NwsPoints = serde_json::from_str(body)
        .map_err(|e| Error::Provider(format!("unexpected points response: {e}")))?;

    // The county is a URL like https://api.weather.gov/zones/county/TNC037;
    // the zone code is its final path segment.
    Ok(parsed
        .properties
        .county
        .as_deref()
        .and_then(|county| county.rsplit('/').next())
        .filter(|zone| !zone.is_empty())
        .map(str::to_owned))
}

fn parse_alerts(body: &str) -> Result<Vec<Alert>> {
    let parsed: NwsAlertCollection = serde_json::from_str(body)
        .map_err(|e| Error::Provider(format!("unexpected zone alerts response: {e}")))?;

    Ok(parsed
        .features
        .into_iter()
        .map(|feature| {
            let p = feature.properties;
            Alert {
                event: p.event,
                headline: p.headline,
                description: p.description.unwrap_or_default(),
                severity: p.severity,
                certainty: p.certainty,
                areas: p.area_desc,
                instruction: p.instruction.or(p.response),
                sender: p.sender_name,
                starts_at: p
                    .effective
                    .or(p.onset)
                    .map(|t| t.timestamp())
                    .unwrap_or_default(),
                ends_at: p.ends.or(p.expires).map(|t| t.timestamp()),
                tags: Vec::new(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_zone_takes_the_final_path_segment() {
        let body = r#"{"properties": {
            "county": "https://api.weather.gov/zones/county/TNC037",
            "gridId": "OHX"
        }}"#;
        let zone = parse_zone(body).expect("points fixture parses");
        assert_eq!(zone.as_deref(), Some("TNC037"));
    }

    #[test]
    fn parse_zone_without_county_is_empty_not_an_error() {
        let body = r#"{"properties": {"gridId": "OHX"}}"#;
        let zone = parse_zone(body).expect("points fixture parses");
        assert!(zone.is_none());
    }

    #[test]
    fn parse_alerts_maps_properties() {
        let body = r#"{"features": [{
            "properties": {
                "event": "Flood Advisory",
                "headline": "Flood Advisory issued December 18 at 6:56PM CST",
                "description": "* WHAT...Flooding caused by excessive rainfall is expected.",
                "severity": "Minor",
                "certainty": "Likely",
                "areaDesc": "Cheatham, TN; Davidson, TN",
                "instruction": "Turn around, don't drown.",
                "response": "Avoid",
                "senderName": "NWS Nashville TN",
                "effective": "2025-12-18T18:56:00-06:00",
                "ends": "2025-12-18T22:00:00-06:00"
            }
        }]}"#;
        let alerts = parse_alerts(body).expect("alerts fixture parses");
        assert_eq!(alerts.len(), 1);

        let alert = &alerts[0];
        assert_eq!(alert.event, "Flood Advisory");
        assert_eq!(alert.severity.as_deref(), Some("Minor"));
        assert_eq!(alert.areas.as_deref(), Some("Cheatham, TN; Davidson, TN"));
        assert_eq!(alert.instruction.as_deref(), Some("Turn around, don't drown."));
        assert_eq!(alert.sender.as_deref(), Some("NWS Nashville TN"));
        assert_eq!(alert.starts_at, 1766105760);
        assert_eq!(alert.ends_at, Some(1766116800));
        assert!(alert.tags.is_empty());
    }

    #[test]
    fn parse_alerts_instruction_falls_back_to_response() {
        let body = r#"{"features": [{
            "properties": {"event": "Red Flag Warning", "response": "Monitor"}
        }]}"#;
        let alerts = parse_alerts(body).expect("alerts fixture parses");
        assert_eq!(alerts[0].instruction.as_deref(), Some("Monitor"));
    }

    #[test]
    fn parse_alerts_empty_feature_list_is_valid() {
        let alerts = parse_alerts(r#"{"features": []}"#).expect("empty is valid");
        assert!(alerts.is_empty());
    }
}
