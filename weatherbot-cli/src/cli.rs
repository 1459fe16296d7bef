use anyhow::Context;
use clap::{Parser, Subcommand};

use weatherbot_core::{AlertSource, Config, Coordinates, OutputFormat, Rendered, router};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherbot", version, about = "OpenWeatherMap chat plugin")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key, default location, and alert source.
    Configure,

    /// Answer a single chat command, e.g. `ask "weather 37206"`.
    Ask {
        /// The chat message, e.g. "weather nashville, tn".
        text: Vec<String>,

        /// Adapter identity used to pick the output shape
        /// (anything containing "slack" or "discord" gets rich payloads).
        #[arg(long, default_value = "shell")]
        adapter: String,

        /// Host protocol version reported to the formatter.
        #[arg(long = "adapter-version", default_value = "11.0.0")]
        adapter_version: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Ask { text, adapter, adapter_version } => {
                ask(&text.join(" "), &adapter, &adapter_version).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let mut key_prompt = inquire::Text::new("OpenWeatherMap API key:");
    if let Some(existing) = config.api_key.as_deref() {
        key_prompt = key_prompt.with_default(existing);
    }
    let api_key = key_prompt.prompt()?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let latitude = prompt_coordinate("Default latitude (blank to skip):")?;
    let longitude = prompt_coordinate("Default longitude (blank to skip):")?;
    if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
        config.set_default_coordinates(Coordinates { latitude, longitude });
    }

    let sources: Vec<&str> = AlertSource::all().iter().map(|s| s.as_str()).collect();
    let source = inquire::Select::new("Alert source:", sources).prompt()?;
    config.set_alert_source(AlertSource::try_from(source)?);

    config.save()?;
    println!("Saved {}", Config::config_file_path()?.display());
    Ok(())
}

fn prompt_coordinate(message: &str) -> anyhow::Result<Option<f64>> {
    let raw = inquire::Text::new(message).prompt()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed
        .parse::<f64>()
        .with_context(|| format!("{trimmed:?} is not a number"))?;
    Ok(Some(value))
}

async fn ask(text: &str, adapter: &str, adapter_version: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let format = OutputFormat::detect(adapter, adapter_version);

    let Some(replies) = router::respond_once(&config, format, text).await else {
        println!("Not a weather command. Try: weather | weather <zip> | weather <city>, <state>");
        return Ok(());
    };

    for reply in replies {
        match reply {
            Rendered::Text(line) => println!("{line}"),
            payload => println!("{}", serde_json::to_string_pretty(&payload)?),
        }
    }
    Ok(())
}
