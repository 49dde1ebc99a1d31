use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, PasswordDisplayMode};
use nearcast_core::{
    Config, Coordinate, FixedLocationSource, LocationAcquirer, PermissionGate, Pipeline,
    PipelineError, RefreshOutcome, provider_from_config,
};

use crate::{permission::PromptPermissionGate, terminal::TerminalScreen};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nearcast", version, about = "Current weather where you are")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and an optional fixed location.
    Configure,

    /// Show the weather for the current location.
    Show {
        /// Latitude of the location fix; overrides the configured location.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude of the location fix.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// OpenWeather API key; overrides the configured key.
        #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Treat location permission as already granted.
        #[arg(long)]
        allow_location: bool,

        /// Exit after the initial load instead of offering refreshes.
        #[arg(long)]
        once: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { lat, lon, api_key, allow_location, once } => {
                let coordinate = match (lat, lon) {
                    (Some(lat), Some(lon)) => Some(
                        Coordinate::new(lat, lon).context("Invalid --lat/--lon")?,
                    ),
                    _ => None,
                };
                show(coordinate, api_key, allow_location, once).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.api_key = Some(api_key.trim().to_string());

    let wants_location = Confirm::new("Set a fixed location for this device?")
        .with_default(config.location.is_some())
        .prompt()
        .context("Failed to read answer")?;

    if wants_location {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please type a number")
            .prompt()
            .context("Failed to read latitude")?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please type a number")
            .prompt()
            .context("Failed to read longitude")?;

        config.set_fixed_location(Coordinate::new(latitude, longitude)?);
    } else {
        config.location = None;
    }

    let path = config.save()?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

async fn show(
    coordinate: Option<Coordinate>,
    api_key: Option<String>,
    allow_location: bool,
    once: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let provider = provider_from_config(&config, api_key.as_deref())?;

    let coordinate = match coordinate {
        Some(c) => Some(c),
        None => config.fixed_location()?,
    };

    let gate: Arc<dyn PermissionGate> = if allow_location {
        Arc::new(PromptPermissionGate::pre_granted())
    } else {
        Arc::new(PromptPermissionGate::default())
    };
    let acquirer = LocationAcquirer::new(
        gate,
        Arc::new(FixedLocationSource::new(coordinate)),
        config.timeouts.location(),
    );

    let screen = Arc::new(TerminalScreen::default());
    let pipeline = Pipeline::new(acquirer, Arc::new(provider), screen.clone(), config.timeouts);

    let teardown = pipeline.teardown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            teardown.teardown();
        }
    });

    loop {
        let outcome = pipeline.refresh().await;
        if outcome == RefreshOutcome::Failed(PipelineError::Cancelled) {
            break;
        }

        if once || !screen.refresh_enabled() || !ask_refresh().await {
            break;
        }
    }

    pipeline.teardown();
    Ok(())
}

/// The refresh tap.
async fn ask_refresh() -> bool {
    let answer = tokio::task::spawn_blocking(|| {
        Confirm::new("Refresh?").with_default(true).prompt()
    })
    .await;

    matches!(answer, Ok(Ok(true)))
}
