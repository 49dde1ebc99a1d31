//! Core library for the `nearcast` weather screen.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The Location Acquirer and its OS seams (permission gate, location source)
//! - The OpenWeather fetcher behind the [`WeatherProvider`] abstraction
//! - The refresh pipeline that drives a [`WeatherScreen`]
//!
//! It is used by `nearcast-cli`, but any front-end that implements the
//! screen and OS traits can drive the same pipeline.

pub mod config;
pub mod display;
pub mod error;
pub mod location;
pub mod model;
pub mod pipeline;
pub mod provider;

pub use config::{Config, FixedLocation, Timeouts};
pub use display::WeatherDisplay;
pub use error::PipelineError;
pub use location::{FixedLocationSource, LocationAcquirer, LocationSource, PermissionGate};
pub use model::{
    Condition, Coordinate, Permission, PermissionGrants, PermissionState, WeatherObservation,
};
pub use pipeline::{Pipeline, PipelineState, RefreshOutcome, TeardownHandle, WeatherScreen};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, provider_from_config};
