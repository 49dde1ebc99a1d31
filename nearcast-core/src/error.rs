//! Failure taxonomy of a pipeline invocation.

use thiserror::Error;

/// Every variant is terminal for the current invocation. Nothing is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Location permission denied")]
    PermissionDenied,

    /// Empty message means the provider answered with no coordinate.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse weather response: {0}")]
    Parse(String),

    #[error("Pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Short text for the transient notice shown on screen.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => "Location permission is required for this app".to_string(),
            Self::LocationUnavailable(msg) if msg.is_empty() => {
                "Unable to get location".to_string()
            }
            Self::LocationUnavailable(msg) => format!("Error getting location: {msg}"),
            Self::Network(msg) | Self::Parse(msg) => format!("Error fetching weather: {msg}"),
            // Never shown; `is_notified` filters it out.
            Self::Cancelled => "Cancelled".to_string(),
        }
    }

    /// Whether the user should see a notice for this failure.
    pub fn is_notified(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}
