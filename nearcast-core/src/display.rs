//! Mapping from a [`WeatherObservation`] to the six on-screen strings.

use chrono::{DateTime, Utc};

use crate::{error::PipelineError, model::WeatherObservation};

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherDisplay {
    pub location: String,
    pub country: String,
    pub temperature: String,
    pub description: String,
    pub humidity: String,
    pub wind: String,
    pub pressure: String,
    pub observed_at: DateTime<Utc>,
}

impl TryFrom<&WeatherObservation> for WeatherDisplay {
    type Error = PipelineError;

    fn try_from(obs: &WeatherObservation) -> Result<Self, Self::Error> {
        let condition = obs.primary_condition().ok_or_else(|| {
            PipelineError::Parse("observation has no weather conditions".to_string())
        })?;

        Ok(Self {
            location: obs.location_name.clone(),
            country: obs.country.clone(),
            temperature: format!("{}°C", obs.temperature_c.trunc() as i64),
            description: capitalize_first(&condition.description),
            humidity: format!("{}%", obs.humidity_pct),
            wind: format!("{:?} m/s", obs.wind_speed_mps),
            pressure: format!("{} hPa", obs.pressure_hpa),
            observed_at: obs.observation_time,
        })
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;

    fn observation(temp: f64, wind: f64) -> WeatherObservation {
        WeatherObservation {
            location_name: "Berlin".into(),
            country: "DE".into(),
            temperature_c: temp,
            humidity_pct: 60,
            pressure_hpa: 1012,
            wind_speed_mps: wind,
            wind_deg: Some(200),
            conditions: vec![Condition {
                code: 800,
                category: "Clear".into(),
                description: "clear sky".into(),
                icon: "01d".into(),
            }],
            observation_time: Utc::now(),
        }
    }

    #[test]
    fn formats_berlin_observation() {
        let display = WeatherDisplay::try_from(&observation(18.4, 3.1)).unwrap();

        assert_eq!(display.location, "Berlin");
        assert_eq!(display.temperature, "18°C");
        assert_eq!(display.description, "Clear sky");
        assert_eq!(display.humidity, "60%");
        assert_eq!(display.wind, "3.1 m/s");
        assert_eq!(display.pressure, "1012 hPa");
    }

    #[test]
    fn temperature_truncates_toward_zero() {
        assert_eq!(WeatherDisplay::try_from(&observation(18.9, 0.0)).unwrap().temperature, "18°C");
        assert_eq!(WeatherDisplay::try_from(&observation(-0.7, 0.0)).unwrap().temperature, "0°C");
        assert_eq!(WeatherDisplay::try_from(&observation(-3.2, 0.0)).unwrap().temperature, "-3°C");
    }

    #[test]
    fn whole_wind_speed_keeps_one_decimal() {
        assert_eq!(WeatherDisplay::try_from(&observation(1.0, 3.0)).unwrap().wind, "3.0 m/s");
        assert_eq!(WeatherDisplay::try_from(&observation(1.0, 0.0)).unwrap().wind, "0.0 m/s");
    }

    #[test]
    fn empty_conditions_is_parse_error() {
        let mut obs = observation(18.4, 3.1);
        obs.conditions.clear();

        assert!(matches!(WeatherDisplay::try_from(&obs), Err(PipelineError::Parse(_))));
    }

    #[test]
    fn capitalizes_unicode_and_empty() {
        assert_eq!(capitalize_first("überwiegend bewölkt"), "Überwiegend bewölkt");
        assert_eq!(capitalize_first(""), "");
    }
}
