use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use inquire::Select;
use nearcast_core::{Permission, PermissionGate, PermissionGrants, PermissionState};

const PRECISE: &str = "Precise";
const APPROXIMATE: &str = "Approximate only";
const DENY: &str = "Deny";

/// Location permission held for the lifetime of the process, asked for in the terminal.
#[derive(Debug, Default)]
pub struct PromptPermissionGate {
    grants: Mutex<PermissionGrants>,
}

impl PromptPermissionGate {
    /// A gate that already holds both fine and coarse permission.
    pub fn pre_granted() -> Self {
        Self {
            grants: Mutex::new(PermissionGrants::new(
                PermissionState::Granted,
                PermissionState::Granted,
            )),
        }
    }

    fn grants(&self) -> PermissionGrants {
        *self.grants.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PermissionGate for PromptPermissionGate {
    async fn check(&self, permission: Permission) -> PermissionState {
        let grants = self.grants();
        match permission {
            Permission::Fine => grants.fine,
            Permission::Coarse => grants.coarse,
        }
    }

    /// After one denial the user is told why before being asked again.
    fn should_show_rationale(&self, permission: Permission) -> bool {
        let grants = self.grants();
        match permission {
            Permission::Fine => grants.fine == PermissionState::Denied,
            Permission::Coarse => grants.coarse == PermissionState::Denied,
        }
    }

    async fn request(&self, _permissions: &[Permission]) -> PermissionGrants {
        let answer = tokio::task::spawn_blocking(|| {
            Select::new("Allow nearcast to access this device's location?", vec![PRECISE, APPROXIMATE, DENY])
                .prompt()
        })
        .await;

        let grants = match answer {
            Ok(Ok(choice)) => grants_for(choice),
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "Permission prompt aborted, treating as denial");
                grants_for(DENY)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Permission prompt task failed");
                grants_for(DENY)
            }
        };

        *self.grants.lock().unwrap_or_else(PoisonError::into_inner) = grants;
        grants
    }
}

fn grants_for(choice: &str) -> PermissionGrants {
    use PermissionState::{Denied, Granted};

    match choice {
        PRECISE => PermissionGrants::new(Granted, Granted),
        APPROXIMATE => PermissionGrants::new(Denied, Granted),
        _ => PermissionGrants::new(Denied, Denied),
    }
}
