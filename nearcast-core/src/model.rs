use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A single resolved geographic fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside [-90, 90] / [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, PipelineError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(PipelineError::LocationUnavailable(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(PipelineError::LocationUnavailable(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }

        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// One entry of the provider's `weather` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub code: i64,
    pub category: String,
    pub description: String,
    pub icon: String,
}

/// Parsed result of one weather call. `conditions` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub location_name: String,
    pub country: String,
    pub temperature_c: f64,
    pub humidity_pct: i64,
    pub pressure_hpa: i64,
    pub wind_speed_mps: f64,
    pub wind_deg: Option<i64>,
    pub conditions: Vec<Condition>,
    pub observation_time: DateTime<Utc>,
}

impl WeatherObservation {
    /// The condition shown on screen.
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.conditions.first()
    }
}

/// The two location permission identifiers the OS knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Fine,
    Coarse,
}

impl Permission {
    pub const fn all() -> &'static [Permission] {
        &[Permission::Fine, Permission::Coarse]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// Answer to a combined permission prompt, one state per identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionGrants {
    pub fine: PermissionState,
    pub coarse: PermissionState,
}

impl PermissionGrants {
    pub fn new(fine: PermissionState, coarse: PermissionState) -> Self {
        Self { fine, coarse }
    }

    /// Either grant lets the pipeline continue; coarse is not treated differently.
    pub fn any_granted(&self) -> bool {
        self.fine == PermissionState::Granted || self.coarse == PermissionState::Granted
    }
}
