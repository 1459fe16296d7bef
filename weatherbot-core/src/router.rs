//! Command routing: match incoming chat text, drive the resolve → fetch →
//! format chain, and hand the resulting messages back to the adapter.

use tracing::{debug, error};

use crate::Config;
use crate::error::{Error, Result};
use crate::format::{self, OutputFormat, Rendered};
use crate::geocode::{self, LocationQuery};
use crate::model::{Coordinates, WeatherReport};
use crate::provider::{
    AlertProvider, ConditionsProvider, LocationProvider, alert_provider_from_config,
    conditions_provider_from_config, location_provider_from_config,
};

/// The command word the router answers to.
pub const TRIGGER: &str = "weather";

const NOT_FOUND_REPLY: &str = "Sorry, I couldn’t find that location.";
const FETCH_FAILED_REPLY: &str = "Sorry, I couldn’t retrieve weather data for that location.";

/// Match incoming text against the trigger word and classify its argument.
/// Returns `None` when the message is not a weather command at all.
pub fn parse_command(text: &str) -> Option<LocationQuery> {
    let trimmed = text.trim();
    let (first, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest),
        None => (trimmed, ""),
    };
    if !first.eq_ignore_ascii_case(TRIGGER) {
        return None;
    }
    Some(LocationQuery::classify(rest))
}

/// One weather command handler wired to its providers. Stateless between
/// commands; each incoming message is an independent request chain.
pub struct WeatherBot {
    locations: Box<dyn LocationProvider>,
    conditions: Box<dyn ConditionsProvider>,
    alerts: Option<Box<dyn AlertProvider>>,
    default_coordinates: Option<Coordinates>,
    format: OutputFormat,
}

impl WeatherBot {
    /// Wire a bot from configuration. Fails with a user-facing
    /// configuration message when the API key is missing.
    pub fn from_config(config: &Config, format: OutputFormat) -> Result<Self> {
        Ok(Self {
            locations: location_provider_from_config(config)?,
            conditions: conditions_provider_from_config(config)?,
            alerts: alert_provider_from_config(config)?,
            default_coordinates: config.default_coordinates(),
            format,
        })
    }

    /// Wire a bot from explicit providers.
    pub fn new(
        locations: Box<dyn LocationProvider>,
        conditions: Box<dyn ConditionsProvider>,
        alerts: Option<Box<dyn AlertProvider>>,
        default_coordinates: Option<Coordinates>,
        format: OutputFormat,
    ) -> Self {
        Self { locations, conditions, alerts, default_coordinates, format }
    }

    /// Answer a chat message. `None` means the text is not a weather
    /// command; otherwise the returned messages are sent in order.
    pub async fn respond(&self, text: &str) -> Option<Vec<Rendered>> {
        let query = parse_command(text)?;
        debug!(?query, "handling weather command");
        Some(match self.handle(&query).await {
            Ok(messages) => messages,
            Err(err) => vec![Rendered::Text(error_reply(&err))],
        })
    }

    async fn handle(&self, query: &LocationQuery) -> Result<Vec<Rendered>> {
        let resolved =
            geocode::resolve(self.locations.as_ref(), query, self.default_coordinates).await?;
        let mut observation = self.conditions.observe(resolved.coordinates).await?;

        let Some(alert_provider) = &self.alerts else {
            // Inline alerts: everything fits in a single message.
            let report = WeatherReport { place: resolved.place, observation };
            return Ok(vec![format::render_report(&report, self.format)]);
        };

        // Separate fetch step: drop inline alerts so they are not
        // delivered twice, send conditions first, alerts second.
        observation.alerts.clear();
        let coordinates = observation.coordinates;
        let offset = observation.utc_offset_secs;
        let report = WeatherReport { place: resolved.place, observation };
        let mut messages = vec![format::render_report(&report, self.format)];

        match alert_provider.active_alerts(coordinates).await {
            Ok(alerts) if alerts.is_empty() => {}
            Ok(alerts) => messages.push(format::render_alerts(&alerts, offset, self.format)),
            Err(err) => {
                // The conditions message already went out; it stands.
                error!("alert fetch failed: {err}");
                messages.push(Rendered::Text(FETCH_FAILED_REPLY.to_string()));
            }
        }

        Ok(messages)
    }
}

/// Build a bot and answer a single command, turning construction-time
/// configuration problems into the same user-facing reply a mid-chain
/// failure would get. No network call is attempted when the API key is
/// missing.
pub async fn respond_once(
    config: &Config,
    format: OutputFormat,
    text: &str,
) -> Option<Vec<Rendered>> {
    parse_command(text)?;
    Some(match WeatherBot::from_config(config, format) {
        Ok(bot) => bot.respond(text).await.unwrap_or_default(),
        Err(err) => vec![Rendered::Text(error_reply(&err))],
    })
}

fn error_reply(err: &Error) -> String {
    match err {
        Error::Configuration(message) => message.clone(),
        Error::NotFound(query) => {
            debug!("no geocoding match for {query:?}");
            NOT_FOUND_REPLY.to_string()
        }
        // Full detail goes to the log, never to the user.
        Error::Provider(_) | Error::DataUnavailable(_) => {
            error!("weather lookup failed: {err}");
            FETCH_FAILED_REPLY.to_string()
        }
    }
}
