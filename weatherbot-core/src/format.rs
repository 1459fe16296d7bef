//! Adapter-conditional rendering: one output shape per chat surface.

use chrono::{FixedOffset, Offset, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use tracing::info;

use crate::model::{Alert, WeatherReport};

/// Oldest host protocol major version whose Discord adapter supports rich
/// embeds; older hosts get the plain-text fallback.
pub const MIN_DISCORD_EMBED_MAJOR: u64 = 11;

const WEATHER_COLOR: u32 = 0xEB6E4B;
const WEATHER_COLOR_HEX: &str = "#eb6e4b";

const OPENWEATHER_NAME: &str = "OpenWeather";
const OPENWEATHER_URL: &str = "https://openweathermap.org/";
const OPENWEATHER_ICON: &str = "https://github.com/openweathermap.png";
const OPENWEATHER_FOOTER: &str = "Weather data provided by OpenWeather";

const NWS_NAME: &str = "Weather.gov";
const NWS_FOOTER: &str = "Alerts provided by the National Weather Service";
const WARNING_ICON: &str =
    "https://a.slack-edge.com/production-standard-emoji-assets/14.0/apple-small/26a0-fe0f.png";

/// The closed set of output shapes, selected once per session from the
/// host adapter identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Slack,
    Discord,
}

impl OutputFormat {
    /// Pick the output shape for an adapter identity and host protocol
    /// version. Matching is case-insensitive substring matching, so
    /// adapter names like "slack-adapter" select the Slack shape.
    pub fn detect(adapter: &str, host_version: &str) -> Self {
        let lower = adapter.to_lowercase();
        if lower.contains("slack") {
            return OutputFormat::Slack;
        }
        if lower.contains("discord") {
            if major_version(host_version) >= MIN_DISCORD_EMBED_MAJOR {
                return OutputFormat::Discord;
            }
            info!("host version {host_version} predates Discord embeds, using plain text");
            return OutputFormat::Plain;
        }
        OutputFormat::Plain
    }
}

fn major_version(version: &str) -> u64 {
    version
        .trim()
        .split('.')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// A message ready for the adapter to send.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Rendered {
    Text(String),
    Slack(SlackMessage),
    Discord(DiscordMessage),
}

impl Rendered {
    /// The plain string, when this is a plain-text message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Rendered::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlackMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SlackAttachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    pub fallback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_icon: Option<String>,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
    pub fields: Vec<SlackField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlackField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscordMessage {
    pub embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscordEmbed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<DiscordAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<DiscordFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<DiscordThumbnail>,
    pub fields: Vec<DiscordField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscordAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscordFooter {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscordThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscordField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Kelvin to Fahrenheit, rounded to the nearest integer.
pub fn kelvin_to_fahrenheit(k: f64) -> i64 {
    (((k - 273.15) * 9.0 / 5.0) + 32.0).round() as i64
}

/// Kelvin to Celsius, rounded to the nearest integer.
pub fn kelvin_to_celsius(k: f64) -> i64 {
    (k - 273.15).round() as i64
}

fn temp_pair(k: f64) -> String {
    format!("{}F/{}C", kelvin_to_fahrenheit(k), kelvin_to_celsius(k))
}

/// Alert severity to attachment/embed color.
fn severity_color(severity: Option<&str>) -> u32 {
    match severity.map(str::to_lowercase).as_deref() {
        Some("extreme") => 0xFF3838,
        Some("severe") => 0xFFB302,
        Some("moderate") => 0xFCE83A,
        Some("minor") => 0x56F000,
        _ => 0xA4ABB6,
    }
}

fn hex_color(color: u32) -> String {
    format!("#{color:06X}")
}

fn map_link(report: &WeatherReport) -> String {
    let c = report.observation.coordinates;
    format!(
        "https://openweathermap.org/weathermap?zoom=12&lat={}&lon={}",
        c.latitude, c.longitude
    )
}

fn icon_url(icon: &str) -> Option<String> {
    if icon.is_empty() {
        None
    } else {
        Some(format!("https://openweathermap.org/img/wn/{icon}@4x.png"))
    }
}

fn iso8601(epoch: i64) -> Option<String> {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Render an epoch in the location's local time, e.g. "Dec 18, 2025 6:56 PM".
fn local_time(epoch: i64, utc_offset_secs: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(utc_offset_secs).unwrap_or(Utc.fix());
    Utc.timestamp_opt(epoch, 0)
        .single()
        .map(|t| t.with_timezone(&offset).format("%b %-d, %Y %-I:%M %p").to_string())
}

fn effective_range(alert: &Alert, utc_offset_secs: i32) -> Option<String> {
    if alert.starts_at == 0 {
        return None;
    }
    let start = local_time(alert.starts_at, utc_offset_secs)?;
    match alert.ends_at.and_then(|end| local_time(end, utc_offset_secs)) {
        Some(end) => Some(format!("{start} - {end}")),
        None => Some(start),
    }
}

/// `(name, value, short/inline)` triples for an alert's detail fields.
/// Shared by the Slack and Discord shapes.
fn alert_fields(alert: &Alert, utc_offset_secs: i32) -> Vec<(String, String, bool)> {
    let mut fields = Vec::new();
    if let Some(severity) = &alert.severity {
        fields.push(("Severity".to_string(), severity.clone(), true));
    }
    if let Some(certainty) = &alert.certainty {
        fields.push(("Certainty".to_string(), certainty.clone(), true));
    }
    if let Some(areas) = &alert.areas {
        fields.push(("Areas Affected".to_string(), areas.clone(), false));
    }
    if let Some(instruction) = &alert.instruction {
        fields.push(("Instructions / Response".to_string(), instruction.clone(), false));
    }
    if let Some(range) = effective_range(alert, utc_offset_secs) {
        fields.push(("Effective".to_string(), range, true));
    }
    if !alert.tags.is_empty() {
        fields.push(("Tags".to_string(), alert.tags.join(", "), true));
    }
    fields
}

/// The universal one-line fallback.
fn fallback_line(report: &WeatherReport) -> String {
    let current = &report.observation.current;
    format!(
        "Currently {} and {} in {}",
        current.description,
        temp_pair(current.temperature_k),
        report.location_label(),
    )
}

fn plain_report(report: &WeatherReport) -> String {
    let mut out = fallback_line(report);
    for alert in &report.observation.alerts {
        out.push_str("\n- ");
        out.push_str(alert.title());
    }
    out
}

fn fenced(description: &str) -> String {
    format!("```\n{description}\n```")
}

fn conditions_attachment(report: &WeatherReport) -> SlackAttachment {
    let current = &report.observation.current;
    SlackAttachment {
        title: Some(format!("Weather for {}", report.location_label())),
        title_link: Some(map_link(report)),
        fallback: fallback_line(report),
        author_name: Some(OPENWEATHER_NAME.to_string()),
        author_link: Some(OPENWEATHER_URL.to_string()),
        author_icon: Some(OPENWEATHER_ICON.to_string()),
        color: WEATHER_COLOR_HEX.to_string(),
        thumb_url: icon_url(&current.icon),
        fields: vec![
            SlackField {
                title: "Conditions".to_string(),
                value: format!("{} ({})", current.summary, current.description),
                short: true,
            },
            SlackField {
                title: "Temperature".to_string(),
                value: temp_pair(current.temperature_k),
                short: true,
            },
            SlackField {
                title: "Feels Like".to_string(),
                value: temp_pair(current.feels_like_k),
                short: true,
            },
            SlackField {
                title: "Humidity".to_string(),
                value: format!("{}%", current.humidity_pct),
                short: true,
            },
        ],
        footer: Some(OPENWEATHER_FOOTER.to_string()),
        ts: Some(current.observed_at),
        ..SlackAttachment::default()
    }
}

fn alert_attachment(alert: &Alert, utc_offset_secs: i32) -> SlackAttachment {
    SlackAttachment {
        title: Some(alert.event.clone()),
        fallback: format!("{}: {}", alert.title(), alert.description),
        text: Some(fenced(&alert.description)),
        author_name: Some(alert.sender.clone().unwrap_or_else(|| NWS_NAME.to_string())),
        author_icon: Some(WARNING_ICON.to_string()),
        color: hex_color(severity_color(alert.severity.as_deref())),
        mrkdwn_in: vec!["text".to_string()],
        fields: alert_fields(alert, utc_offset_secs)
            .into_iter()
            .map(|(title, value, short)| SlackField { title, value, short })
            .collect(),
        footer: Some(NWS_FOOTER.to_string()),
        ts: (alert.starts_at != 0).then_some(alert.starts_at),
        ..SlackAttachment::default()
    }
}

fn conditions_embed(report: &WeatherReport) -> DiscordEmbed {
    let current = &report.observation.current;
    DiscordEmbed {
        title: format!("Weather for {}", report.location_label()),
        url: Some(map_link(report)),
        color: WEATHER_COLOR,
        timestamp: iso8601(current.observed_at),
        author: Some(DiscordAuthor {
            name: OPENWEATHER_NAME.to_string(),
            url: Some(OPENWEATHER_URL.to_string()),
            icon_url: Some(OPENWEATHER_ICON.to_string()),
        }),
        footer: Some(DiscordFooter { text: OPENWEATHER_FOOTER.to_string() }),
        thumbnail: icon_url(&current.icon).map(|url| DiscordThumbnail { url }),
        fields: vec![
            DiscordField {
                name: "Conditions".to_string(),
                value: format!("{} ({})", current.summary, current.description),
                inline: true,
            },
            DiscordField {
                name: "Temperature".to_string(),
                value: temp_pair(current.temperature_k),
                inline: true,
            },
            DiscordField {
                name: "Feels Like".to_string(),
                value: temp_pair(current.feels_like_k),
                inline: true,
            },
            DiscordField {
                name: "Humidity".to_string(),
                value: format!("{}%", current.humidity_pct),
                inline: true,
            },
        ],
        ..DiscordEmbed::default()
    }
}

fn alert_embed(alert: &Alert, utc_offset_secs: i32) -> DiscordEmbed {
    DiscordEmbed {
        title: alert.event.clone(),
        color: severity_color(alert.severity.as_deref()),
        description: Some(fenced(&alert.description)),
        timestamp: (alert.starts_at != 0).then(|| iso8601(alert.starts_at)).flatten(),
        footer: Some(DiscordFooter {
            text: alert.sender.clone().unwrap_or_else(|| NWS_FOOTER.to_string()),
        }),
        fields: alert_fields(alert, utc_offset_secs)
            .into_iter()
            .map(|(name, value, inline)| DiscordField { name, value, inline })
            .collect(),
        ..DiscordEmbed::default()
    }
}

/// Format a full report (conditions plus any inline alerts) as a single
/// message in the requested shape.
pub fn render_report(report: &WeatherReport, format: OutputFormat) -> Rendered {
    let offset = report.observation.utc_offset_secs;
    match format {
        OutputFormat::Plain => Rendered::Text(plain_report(report)),
        OutputFormat::Slack => {
            let mut attachments = vec![conditions_attachment(report)];
            attachments
                .extend(report.observation.alerts.iter().map(|a| alert_attachment(a, offset)));
            Rendered::Slack(SlackMessage { text: None, attachments })
        }
        OutputFormat::Discord => {
            let mut embeds = vec![conditions_embed(report)];
            embeds.extend(report.observation.alerts.iter().map(|a| alert_embed(a, offset)));
            Rendered::Discord(DiscordMessage { embeds })
        }
    }
}

/// Format a standalone alert list (the second message of the two-provider
/// variant). Callers skip sending entirely when the list is empty.
pub fn render_alerts(alerts: &[Alert], utc_offset_secs: i32, format: OutputFormat) -> Rendered {
    match format {
        OutputFormat::Plain => Rendered::Text(
            alerts.iter().map(|a| format!("- {}", a.title())).collect::<Vec<_>>().join("\n"),
        ),
        OutputFormat::Slack => Rendered::Slack(SlackMessage {
            text: None,
            attachments: alerts.iter().map(|a| alert_attachment(a, utc_offset_secs)).collect(),
        }),
        OutputFormat::Discord => Rendered::Discord(DiscordMessage {
            embeds: alerts.iter().map(|a| alert_embed(a, utc_offset_secs)).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, CurrentConditions, Observation, Place, WeatherReport};

    fn sample_report(alerts: Vec<Alert>) -> WeatherReport {
        WeatherReport {
            place: Place { name: "Nashville".to_string(), country: Some("US".to_string()), ..Place::default() },
            observation: Observation {
                coordinates: Coordinates { latitude: 36.1622, longitude: -86.7744 },
                utc_offset_secs: -21600,
                current: CurrentConditions {
                    summary: "Rain".to_string(),
                    description: "broken clouds".to_string(),
                    temperature_k: 283.15,
                    feels_like_k: 282.57,
                    humidity_pct: 90,
                    wind_speed: 3.6,
                    uv_index: 0.16,
                    icon: "10n".to_string(),
                    observed_at: 1766110733,
                },
                alerts,
            },
        }
    }

    fn sample_alert() -> Alert {
        Alert {
            event: "Flood Advisory".to_string(),
            description: "* WHAT...Flooding caused by excessive rainfall is expected.".to_string(),
            sender: Some("NWS Nashville TN".to_string()),
            starts_at: 1766105778,
            ends_at: Some(1766116800),
            tags: vec!["Flood".to_string()],
            ..Alert::default()
        }
    }

    #[test]
    fn kelvin_conversions_round_to_nearest() {
        assert_eq!(kelvin_to_fahrenheit(283.15), 50);
        assert_eq!(kelvin_to_celsius(283.15), 10);
        assert_eq!(kelvin_to_fahrenheit(288.66), 60);
        assert_eq!(kelvin_to_celsius(288.66), 16);
        assert_eq!(kelvin_to_celsius(273.15), 0);
        assert_eq!(kelvin_to_fahrenheit(273.15), 32);
    }

    #[test]
    fn detect_matches_substrings_case_insensitively() {
        assert_eq!(OutputFormat::detect("slack-adapter", "11.0.0"), OutputFormat::Slack);
        assert_eq!(OutputFormat::detect("SlackAdapter", "3.0.0"), OutputFormat::Slack);
        assert_eq!(OutputFormat::detect("discord", "11.0.0"), OutputFormat::Discord);
        assert_eq!(OutputFormat::detect("shell", "11.0.0"), OutputFormat::Plain);
        assert_eq!(OutputFormat::detect("", "11.0.0"), OutputFormat::Plain);
    }

    #[test]
    fn old_hosts_degrade_discord_to_plain() {
        assert_eq!(OutputFormat::detect("discord", "10.2.1"), OutputFormat::Plain);
        assert_eq!(OutputFormat::detect("discord", "garbage"), OutputFormat::Plain);
        assert_eq!(OutputFormat::detect("discord", "12.0.0-beta.1"), OutputFormat::Discord);
    }

    #[test]
    fn degraded_discord_output_equals_plain_output() {
        let report = sample_report(vec![sample_alert()]);
        let degraded = OutputFormat::detect("discord", "10.0.0");
        assert_eq!(
            render_report(&report, degraded).as_text(),
            render_report(&report, OutputFormat::Plain).as_text(),
        );
    }

    #[test]
    fn plain_report_appends_one_line_per_alert() {
        let report = sample_report(vec![sample_alert()]);
        let rendered = render_report(&report, OutputFormat::Plain);
        assert_eq!(
            rendered.as_text().expect("plain text"),
            "Currently broken clouds and 50F/10C in Nashville, US\n- Flood Advisory",
        );
    }

    #[test]
    fn slack_report_has_one_attachment_per_alert_plus_conditions() {
        let report = sample_report(vec![sample_alert(), sample_alert()]);
        let Rendered::Slack(message) = render_report(&report, OutputFormat::Slack) else {
            panic!("expected a slack payload");
        };
        assert_eq!(message.attachments.len(), 3);

        let conditions = &message.attachments[0];
        assert_eq!(conditions.title.as_deref(), Some("Weather for Nashville, US"));
        assert_eq!(
            conditions.title_link.as_deref(),
            Some("https://openweathermap.org/weathermap?zoom=12&lat=36.1622&lon=-86.7744"),
        );
        assert_eq!(conditions.fallback, "Currently broken clouds and 50F/10C in Nashville, US");
        assert_eq!(conditions.color, "#eb6e4b");
        assert_eq!(
            conditions.thumb_url.as_deref(),
            Some("https://openweathermap.org/img/wn/10n@4x.png"),
        );
        assert_eq!(conditions.fields[0].value, "Rain (broken clouds)");
        assert_eq!(conditions.fields[1].value, "50F/10C");
        assert_eq!(conditions.fields[2].value, "49F/9C");
        assert_eq!(conditions.fields[3].value, "90%");
        assert_eq!(conditions.ts, Some(1766110733));

        let alert = &message.attachments[1];
        assert_eq!(alert.title.as_deref(), Some("Flood Advisory"));
        assert_eq!(alert.author_name.as_deref(), Some("NWS Nashville TN"));
        // One-call alerts have no severity; default color applies.
        assert_eq!(alert.color, "#A4ABB6");
        assert_eq!(alert.ts, Some(1766105778));
    }

    #[test]
    fn discord_report_uses_integer_colors_and_iso_timestamps() {
        let report = sample_report(vec![sample_alert()]);
        let Rendered::Discord(message) = render_report(&report, OutputFormat::Discord) else {
            panic!("expected a discord payload");
        };
        assert_eq!(message.embeds.len(), 2);

        let conditions = &message.embeds[0];
        assert_eq!(conditions.color, 0xEB6E4B);
        assert_eq!(conditions.timestamp.as_deref(), Some("2025-12-19T02:18:53.000Z"));
        assert_eq!(conditions.title, "Weather for Nashville, US");

        let alert = &message.embeds[1];
        assert_eq!(alert.color, 0xA4ABB6);
        assert_eq!(alert.footer.as_ref().map(|f| f.text.as_str()), Some("NWS Nashville TN"));
        assert!(alert.description.as_deref().unwrap_or_default().starts_with("```\n"));
    }

    #[test]
    fn severity_colors_follow_the_lookup_table() {
        assert_eq!(severity_color(Some("Extreme")), 0xFF3838);
        assert_eq!(severity_color(Some("severe")), 0xFFB302);
        assert_eq!(severity_color(Some("Moderate")), 0xFCE83A);
        assert_eq!(severity_color(Some("minor")), 0x56F000);
        assert_eq!(severity_color(Some("Unknown")), 0xA4ABB6);
        assert_eq!(severity_color(None), 0xA4ABB6);
    }

    #[test]
    fn alert_fields_render_effective_range_in_local_time() {
        let alert = sample_alert();
        let fields = alert_fields(&alert, -21600);
        let effective = fields
            .iter()
            .find(|(name, _, _)| name == "Effective")
            .expect("effective field present");
        assert_eq!(effective.1, "Dec 18, 2025 6:56 PM - Dec 18, 2025 10:00 PM");

        let tags = fields.iter().find(|(name, _, _)| name == "Tags").expect("tags field present");
        assert_eq!(tags.1, "Flood");
    }

    #[test]
    fn nws_alert_fields_carry_severity_details() {
        let alert = Alert {
            event: "Red Flag Warning".to_string(),
            severity: Some("Severe".to_string()),
            certainty: Some("Likely".to_string()),
            areas: Some("Fire Weather Zone 239".to_string()),
            instruction: Some("Avoid outdoor burning.".to_string()),
            ..Alert::default()
        };
        let fields = alert_fields(&alert, 0);
        let names: Vec<&str> = fields.iter().map(|(name, _, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Severity", "Certainty", "Areas Affected", "Instructions / Response"]);

        let attachment = alert_attachment(&alert, 0);
        assert_eq!(attachment.color, "#FFB302");
    }

    #[test]
    fn standalone_alert_rendering() {
        let alerts = vec![sample_alert()];
        let rendered = render_alerts(&alerts, -21600, OutputFormat::Plain);
        assert_eq!(rendered.as_text(), Some("- Flood Advisory"));

        let Rendered::Slack(message) = render_alerts(&alerts, -21600, OutputFormat::Slack) else {
            panic!("expected a slack payload");
        };
        assert_eq!(message.attachments.len(), 1);
    }

    #[test]
    fn slack_serialization_omits_absent_fields() {
        let report = sample_report(Vec::new());
        let rendered = render_report(&report, OutputFormat::Slack);
        let value = serde_json::to_value(&rendered).expect("serializable");

        assert!(value.get("text").is_none());
        let attachment = &value["attachments"][0];
        assert!(attachment.get("mrkdwn_in").is_none());
        assert_eq!(attachment["footer"], "Weather data provided by OpenWeather");
    }
}
