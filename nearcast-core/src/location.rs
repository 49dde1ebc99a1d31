//! Location Acquirer: permission check/request followed by a one-shot fix.

use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::PipelineError,
    model::{Coordinate, Permission, PermissionGrants, PermissionState},
};

pub const RATIONALE_NOTICE: &str = "Location permission is needed to show weather for your location";

/// OS permission API.
#[async_trait]
pub trait PermissionGate: Send + Sync + Debug {
    async fn check(&self, permission: Permission) -> PermissionState;

    /// Whether the platform wants an explanation shown before prompting again.
    fn should_show_rationale(&self, _permission: Permission) -> bool {
        false
    }

    /// Show one combined prompt for `permissions` and wait for the answer.
    async fn request(&self, permissions: &[Permission]) -> PermissionGrants;
}

/// OS location provider.
///
/// Implementations must produce a fresh high-accuracy fix and never answer
/// from a cached last-known location. `Ok(None)` means the provider
/// completed without a coordinate. `cancel` is unique to this request and
/// is cancelled once the caller stops waiting.
#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    async fn current_fix(&self, cancel: CancellationToken) -> anyhow::Result<Option<Coordinate>>;
}

/// A source that always reports the same fix, or none.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocationSource {
    coordinate: Option<Coordinate>,
}

impl FixedLocationSource {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationSource for FixedLocationSource {
    async fn current_fix(&self, _cancel: CancellationToken) -> anyhow::Result<Option<Coordinate>> {
        Ok(self.coordinate)
    }
}

#[derive(Debug, Clone)]
pub struct LocationAcquirer {
    gate: Arc<dyn PermissionGate>,
    source: Arc<dyn LocationSource>,
    timeout: Duration,
}

impl LocationAcquirer {
    pub fn new(
        gate: Arc<dyn PermissionGate>,
        source: Arc<dyn LocationSource>,
        timeout: Duration,
    ) -> Self {
        Self { gate, source, timeout }
    }

    /// Fine and coarse checked together; either grant counts.
    pub async fn permission_state(&self) -> PermissionState {
        let fine = self.gate.check(Permission::Fine).await;
        let coarse = self.gate.check(Permission::Coarse).await;
        let grants = PermissionGrants::new(fine, coarse);

        if grants.any_granted() {
            PermissionState::Granted
        } else if fine == PermissionState::Denied && coarse == PermissionState::Denied {
            PermissionState::Denied
        } else {
            PermissionState::Unknown
        }
    }

    /// Returns once either permission is granted, prompting at most once.
    ///
    /// `on_rationale` receives the rationale text when the gate asks for it.
    pub async fn ensure_permission<F>(&self, on_rationale: F) -> Result<(), PipelineError>
    where
        F: FnOnce(&str) + Send,
    {
        if self.permission_state().await == PermissionState::Granted {
            tracing::debug!("Location permission already granted");
            return Ok(());
        }

        if self.gate.should_show_rationale(Permission::Fine) {
            on_rationale(RATIONALE_NOTICE);
        }

        let grants = self.gate.request(Permission::all()).await;
        tracing::debug!(?grants, "Location permission prompt answered");

        if grants.any_granted() {
            Ok(())
        } else {
            Err(PipelineError::PermissionDenied)
        }
    }

    /// One fix request bounded by the configured timeout and by `session`.
    pub async fn request_fix(&self, session: &CancellationToken) -> Result<Coordinate, PipelineError> {
        let request_token = session.child_token();
        let _cancel_on_exit = request_token.clone().drop_guard();

        let fix = tokio::select! {
            biased;
            _ = session.cancelled() => return Err(PipelineError::Cancelled),
            res = tokio::time::timeout(self.timeout, self.source.current_fix(request_token)) => res,
        };
        if session.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        match fix {
            Err(_) => Err(PipelineError::LocationUnavailable(format!(
                "timed out after {}s",
                self.timeout.as_secs_f64()
            ))),
            Ok(Ok(Some(coordinate))) => Ok(coordinate),
            Ok(Ok(None)) => Err(PipelineError::LocationUnavailable(String::new())),
            Ok(Err(e)) => Err(PipelineError::LocationUnavailable(e.to_string())),
        }
    }

    /// Permission cycle then fix, for callers without a screen to notify.
    pub async fn acquire_location(&self, session: &CancellationToken) -> Result<Coordinate, PipelineError> {
        self.ensure_permission(|_| {}).await?;
        self.request_fix(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug)]
    struct Gate {
        fine: PermissionState,
        coarse: PermissionState,
        answer: PermissionGrants,
        rationale: bool,
        prompts: AtomicUsize,
    }

    impl Gate {
        fn new(fine: PermissionState, coarse: PermissionState, answer: PermissionGrants) -> Self {
            Self { fine, coarse, answer, rationale: false, prompts: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl PermissionGate for Gate {
        async fn check(&self, permission: Permission) -> PermissionState {
            match permission {
                Permission::Fine => self.fine,
                Permission::Coarse => self.coarse,
            }
        }

        fn should_show_rationale(&self, _permission: Permission) -> bool {
            self.rationale
        }

        async fn request(&self, permissions: &[Permission]) -> PermissionGrants {
            assert_eq!(permissions, Permission::all());
            self.prompts.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    #[derive(Debug)]
    struct Hanging {
        token: Mutex<Option<CancellationToken>>,
    }

    #[async_trait]
    impl LocationSource for Hanging {
        async fn current_fix(&self, cancel: CancellationToken) -> anyhow::Result<Option<Coordinate>> {
            *self.token.lock().unwrap() = Some(cancel);
            std::future::pending::<()>().await;
            Ok(None)
        }
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl LocationSource for Failing {
        async fn current_fix(&self, _cancel: CancellationToken) -> anyhow::Result<Option<Coordinate>> {
            Err(anyhow::anyhow!("provider offline"))
        }
    }

    fn berlin() -> Coordinate {
        Coordinate::new(52.52, 13.405).unwrap()
    }

    fn acquirer(gate: Arc<Gate>, source: Arc<dyn LocationSource>) -> LocationAcquirer {
        LocationAcquirer::new(gate, source, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn granted_permission_skips_prompt() {
        use PermissionState::*;
        let gate = Arc::new(Gate::new(Denied, Granted, PermissionGrants::default()));
        let acq = acquirer(gate.clone(), Arc::new(FixedLocationSource::new(Some(berlin()))));

        let coord = acq.acquire_location(&CancellationToken::new()).await.unwrap();

        assert_eq!(coord, berlin());
        assert_eq!(gate.prompts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn denied_prompt_fails_with_permission_denied() {
        use PermissionState::*;
        let gate = Arc::new(Gate::new(Unknown, Unknown, PermissionGrants::new(Denied, Denied)));
        let acq = acquirer(gate.clone(), Arc::new(FixedLocationSource::new(Some(berlin()))));

        let err = acq.acquire_location(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(err, PipelineError::PermissionDenied);
        assert_eq!(gate.prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn coarse_only_grant_proceeds() {
        use PermissionState::*;
        let gate = Arc::new(Gate::new(Unknown, Unknown, PermissionGrants::new(Denied, Granted)));
        let acq = acquirer(gate, Arc::new(FixedLocationSource::new(Some(berlin()))));

        assert!(acq.acquire_location(&CancellationToken::new()).await.is_ok());
    }

    #[tokio::test]
    async fn rationale_is_reported_before_prompt() {
        use PermissionState::*;
        let mut gate = Gate::new(Denied, Denied, PermissionGrants::new(Granted, Granted));
        gate.rationale = true;
        let acq = acquirer(Arc::new(gate), Arc::new(FixedLocationSource::default()));

        let mut seen = None;
        acq.ensure_permission(|msg| seen = Some(msg.to_string())).await.unwrap();

        assert_eq!(seen.as_deref(), Some(RATIONALE_NOTICE));
    }

    #[tokio::test]
    async fn permission_state_is_tri_state() {
        use PermissionState::*;
        let none = PermissionGrants::default();
        let fixed = Arc::new(FixedLocationSource::default());

        let acq = acquirer(Arc::new(Gate::new(Denied, Denied, none)), fixed.clone());
        assert_eq!(acq.permission_state().await, Denied);

        let acq = acquirer(Arc::new(Gate::new(Unknown, Denied, none)), fixed.clone());
        assert_eq!(acq.permission_state().await, Unknown);

        let acq = acquirer(Arc::new(Gate::new(Granted, Unknown, none)), fixed);
        assert_eq!(acq.permission_state().await, Granted);
    }

    #[tokio::test]
    async fn missing_fix_is_location_unavailable() {
        use PermissionState::*;
        let gate = Arc::new(Gate::new(Granted, Granted, PermissionGrants::default()));
        let acq = acquirer(gate, Arc::new(FixedLocationSource::default()));

        let err = acq.request_fix(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, PipelineError::LocationUnavailable(String::new()));
    }

    #[tokio::test]
    async fn provider_error_message_is_carried() {
        use PermissionState::*;
        let gate = Arc::new(Gate::new(Granted, Granted, PermissionGrants::default()));
        let acq = acquirer(gate, Arc::new(Failing));

        let err = acq.request_fix(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, PipelineError::LocationUnavailable("provider offline".into()));
    }

    #[tokio::test]
    async fn slow_fix_times_out_and_cancels_request_token() {
        use PermissionState::*;
        let gate = Arc::new(Gate::new(Granted, Granted, PermissionGrants::default()));
        let source = Arc::new(Hanging { token: Mutex::new(None) });
        let acq = acquirer(gate, source.clone());

        let session = CancellationToken::new();
        let err = acq.request_fix(&session).await.unwrap_err();

        assert!(matches!(err, PipelineError::LocationUnavailable(ref m) if m.contains("timed out")));
        let token = source.token.lock().unwrap().clone().unwrap();
        assert!(token.is_cancelled());
        assert!(!session.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_session_wins_over_ready_fix() {
        use PermissionState::*;
        let gate = Arc::new(Gate::new(Granted, Granted, PermissionGrants::default()));
        let acq = acquirer(gate, Arc::new(FixedLocationSource::new(Some(berlin()))));

        let session = CancellationToken::new();
        session.cancel();

        for _ in 0..50 {
            assert_eq!(acq.request_fix(&session).await.unwrap_err(), PipelineError::Cancelled);
        }
    }

    #[tokio::test]
    async fn cancelled_session_aborts_fix() {
        use PermissionState::*;
        let gate = Arc::new(Gate::new(Granted, Granted, PermissionGrants::default()));
        let acq = LocationAcquirer::new(
            gate,
            Arc::new(Hanging { token: Mutex::new(None) }),
            Duration::from_secs(30),
        );

        let session = CancellationToken::new();
        session.cancel();

        let err = acq.request_fix(&session).await.unwrap_err();
        assert_eq!(err, PipelineError::Cancelled);
    }
}
