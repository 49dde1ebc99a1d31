use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    error::PipelineError,
    model::{Condition, Coordinate, WeatherObservation},
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    endpoint: Url,
    http: Client,
}

impl OpenWeatherProvider {
    /// `base_url` is the API root, e.g. `https://api.openweathermap.org/data/2.5`.
    pub fn with_base_url(api_key: String, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&format!("{}/weather", base_url.trim_end_matches('/')))
            .with_context(|| format!("Invalid OpenWeather base URL: {base_url}"))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { api_key, endpoint, http })
    }

    async fn fetch_current(&self, coordinate: Coordinate) -> Result<WeatherObservation, PipelineError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            lat = coordinate.latitude(),
            lon = coordinate.longitude(),
            "Requesting current weather (appid redacted)"
        );

        let res = self
            .http
            .get(self.endpoint.clone())
            .query(&[
                ("lat", coordinate.latitude().to_string()),
                ("lon", coordinate.longitude().to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| transport_error("send request to OpenWeather", &e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| transport_error("read OpenWeather response body", &e))?;

        if !status.is_success() {
            return Err(PipelineError::Network(format!(
                "OpenWeather request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        parse_current(&body)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(
        &self,
        coordinate: Coordinate,
    ) -> Result<WeatherObservation, PipelineError> {
        self.fetch_current(coordinate).await
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: i64,
    pressure: i64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i64,
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    deg: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: Option<i64>,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    sys: OwSys,
}

/// Decode a `/weather` body; an empty `weather` array is a parse failure.
pub(crate) fn parse_current(body: &str) -> Result<WeatherObservation, PipelineError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::Parse(format!("invalid OpenWeather JSON: {e}")))?;

    if parsed.weather.is_empty() {
        return Err(PipelineError::Parse(
            "OpenWeather response contained no weather conditions".to_string(),
        ));
    }

    let observation_time = parsed.dt.and_then(unix_to_utc).unwrap_or_else(Utc::now);

    let conditions = parsed
        .weather
        .into_iter()
        .map(|w| Condition {
            code: w.id,
            category: w.main,
            description: w.description,
            icon: w.icon,
        })
        .collect();

    Ok(WeatherObservation {
        location_name: parsed.name,
        country: parsed.sys.country,
        temperature_c: parsed.main.temp,
        humidity_pct: parsed.main.humidity,
        pressure_hpa: parsed.main.pressure,
        wind_speed_mps: parsed.wind.speed,
        wind_deg: parsed.wind.deg,
        conditions,
        observation_time,
    })
}

fn transport_error(action: &str, err: &reqwest::Error) -> PipelineError {
    if err.is_timeout() {
        PipelineError::Network(format!("Timed out trying to {action}"))
    } else {
        PipelineError::Network(format!("Failed to {action}: {err}"))
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
