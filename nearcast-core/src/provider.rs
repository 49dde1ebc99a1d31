use crate::{
    Config, Coordinate, WeatherObservation, error::PipelineError,
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Weather Fetcher seam: one outbound call per coordinate.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(
        &self,
        coordinate: Coordinate,
    ) -> Result<WeatherObservation, PipelineError>;
}

/// Construct the OpenWeather provider from config and an optional explicit key.
pub fn provider_from_config(
    config: &Config,
    api_key: Option<&str>,
) -> anyhow::Result<OpenWeatherProvider> {
    let api_key = config.resolve_api_key(api_key)?;
    OpenWeatherProvider::with_base_url(api_key, config.base_url(), config.timeouts.http())
}
