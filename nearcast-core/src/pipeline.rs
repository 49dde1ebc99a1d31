//! Orchestration of one refresh: permission, fix, fetch, display.
//!
//! ```text
//! Idle -> AwaitingPermission -> AwaitingLocation -> AwaitingWeather -> Displaying -> Idle
//!               |                      |                   |
//!               +----------------------+-------------------+--> Idle (notice)
//! ```

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio_util::sync::CancellationToken;

use crate::{
    config::Timeouts,
    display::WeatherDisplay,
    error::PipelineError,
    location::LocationAcquirer,
    provider::WeatherProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    AwaitingPermission,
    AwaitingLocation,
    AwaitingWeather,
    Displaying,
}

impl PipelineState {
    pub fn is_awaiting(&self) -> bool {
        matches!(
            self,
            Self::AwaitingPermission | Self::AwaitingLocation | Self::AwaitingWeather
        )
    }
}

/// The UI surface the pipeline writes to.
///
/// `set_busy(true)` shows the busy indicator and disables the refresh
/// control; `set_busy(false)` reverses both.
pub trait WeatherScreen: Send + Sync {
    fn set_busy(&self, busy: bool);

    /// Transient, non-blocking notice.
    fn show_notice(&self, message: &str);

    fn render(&self, display: &WeatherDisplay);

    fn state_changed(&self, _state: PipelineState) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Displayed(WeatherDisplay),
    Failed(PipelineError),
    /// Another invocation was still in flight.
    Ignored,
}

/// Cancels the owning pipeline's in-flight work when the screen goes away.
#[derive(Debug, Clone)]
pub struct TeardownHandle {
    session: CancellationToken,
}

impl TeardownHandle {
    pub fn teardown(&self) {
        self.session.cancel();
    }
}

pub struct Pipeline {
    acquirer: LocationAcquirer,
    provider: Arc<dyn WeatherProvider>,
    screen: Arc<dyn WeatherScreen>,
    weather_timeout: Duration,
    session: CancellationToken,
    state: Mutex<PipelineState>,
}

impl Pipeline {
    pub fn new(
        acquirer: LocationAcquirer,
        provider: Arc<dyn WeatherProvider>,
        screen: Arc<dyn WeatherScreen>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            acquirer,
            provider,
            screen,
            weather_timeout: timeouts.http(),
            session: CancellationToken::new(),
            state: Mutex::new(PipelineState::Idle),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle { session: self.session.clone() }
    }

    pub fn teardown(&self) {
        self.session.cancel();
    }

    /// Run one invocation. Used for both initial load and refresh.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self.session.is_cancelled() {
            return RefreshOutcome::Failed(PipelineError::Cancelled);
        }

        let Some(busy) = self.begin() else {
            tracing::debug!("Refresh ignored, invocation already in flight");
            return RefreshOutcome::Ignored;
        };

        match self.run().await {
            Ok(view) => {
                self.transition(PipelineState::Displaying);
                self.screen.render(&view);
                drop(busy);
                tracing::info!(location = %view.location, "Weather displayed");
                RefreshOutcome::Displayed(view)
            }
            Err(err) => {
                drop(busy);
                if err.is_notified() {
                    tracing::warn!(error = %err, "Weather refresh failed");
                    self.screen.show_notice(&err.user_message());
                } else {
                    tracing::debug!("Weather refresh cancelled");
                }
                RefreshOutcome::Failed(err)
            }
        }
    }

    async fn run(&self) -> Result<WeatherDisplay, PipelineError> {
        let screen = self.screen.clone();
        tokio::select! {
            biased;
            _ = self.session.cancelled() => return Err(PipelineError::Cancelled),
            res = self.acquirer.ensure_permission(move |msg| screen.show_notice(msg)) => res?,
        }
        self.check_live()?;

        self.transition(PipelineState::AwaitingLocation);
        let coordinate = self.acquirer.request_fix(&self.session).await?;
        self.check_live()?;
        tracing::debug!(%coordinate, "Location fix obtained");

        self.transition(PipelineState::AwaitingWeather);
        let fetch = tokio::time::timeout(
            self.weather_timeout,
            self.provider.current_weather(coordinate),
        );
        let observation = tokio::select! {
            biased;
            _ = self.session.cancelled() => return Err(PipelineError::Cancelled),
            res = fetch => res.map_err(|_| {
                PipelineError::Network(format!(
                    "request timed out after {}s",
                    self.weather_timeout.as_secs_f64()
                ))
            })??,
        };
        // A teardown raised while the fetch was completing must still win.
        self.check_live()?;

        WeatherDisplay::try_from(&observation)
    }

    fn check_live(&self) -> Result<(), PipelineError> {
        if self.session.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Claim the pipeline if idle and raise the busy indicator.
    fn begin(&self) -> Option<BusyGuard<'_>> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != PipelineState::Idle {
                return None;
            }
            *state = PipelineState::AwaitingPermission;
        }

        self.screen.state_changed(PipelineState::AwaitingPermission);
        self.screen.set_busy(true);
        Some(BusyGuard { pipeline: self })
    }

    fn transition(&self, next: PipelineState) {
        let prev = std::mem::replace(
            &mut *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            next,
        );
        tracing::debug!(?prev, ?next, "Pipeline state change");
        self.screen.state_changed(next);
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("acquirer", &self.acquirer)
            .field("provider", &self.provider)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.session.cancel();
    }
}

/// Returns the pipeline to `Idle` and clears busy on every exit path,
/// unwinding included.
struct BusyGuard<'a> {
    pipeline: &'a Pipeline,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.pipeline.transition(PipelineState::Idle);
        self.pipeline.screen.set_busy(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn awaiting_states() {
        assert!(PipelineState::AwaitingPermission.is_awaiting());
        assert!(PipelineState::AwaitingLocation.is_awaiting());
        assert!(PipelineState::AwaitingWeather.is_awaiting());
        assert!(!PipelineState::Idle.is_awaiting());
        assert!(!PipelineState::Displaying.is_awaiting());
    }
}
