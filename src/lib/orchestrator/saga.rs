use tracing::{debug, warn};

use super::types::{Compensation, CompensationAction, OrchestratorError};
use crate::lib::platform::types::{ManagedResource, Platform, PlatformError, ResourceRef};

/// Compensations accumulated by one apply attempt.
#[derive(Debug, Default)]
pub struct Saga {
    compensations: Vec<Compensation>,
}

impl Saga {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&mut self, target: ResourceRef) {
        self.compensations.push(Compensation {
            action: CompensationAction::Delete,
            target,
        });
    }

    /// Runs every compensation newest-first. A failing compensation is not
    /// retried; it is attached to the error next to `cause`.
    pub async fn abort(self, platform: &dyn Platform, cause: PlatformError) -> OrchestratorError {
        let mut compensated = Vec::with_capacity(self.compensations.len());
        let mut failures = Vec::new();

        for compensation in self.compensations.into_iter().rev() {
            let result = match compensation.action {
                CompensationAction::Delete => platform.delete(&compensation.target).await,
            };
            match result {
                Ok(()) => compensated.push(compensation.target),
                Err(err) if err.is_not_found() => compensated.push(compensation.target),
                Err(err) => {
                    warn!("rollback of {} failed: {}", compensation.target, err);
                    failures.push(err);
                }
            }
        }

        if failures.is_empty() {
            debug!("rolled back {} resources after: {}", compensated.len(), cause);
            OrchestratorError::RolledBack { cause, compensated }
        } else {
            OrchestratorError::RollbackIncomplete { cause, failures }
        }
    }
}

/// An existing object may only be updated by the task that owns it.
async fn check_owner(
    platform: &dyn Platform,
    resource: &ManagedResource,
) -> Result<(), PlatformError> {
    match platform.get(&resource.reference()).await {
        Ok(existing) if existing.task() != resource.task() => Err(PlatformError::Conflict {
            kind: resource.kind(),
            name: resource.name().to_string(),
            owner: existing.task().unwrap_or("<unmanaged>").to_string(),
        }),
        Ok(_) => Ok(()),
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err),
    }
}

/// Create-or-update each resource in order. On the first failure every
/// resource created so far is deleted again; updated resources are left as
/// they are because their previous state was never captured.
pub async fn apply_all(
    platform: &dyn Platform,
    resources: &[ManagedResource],
) -> Result<(), OrchestratorError> {
    let mut saga = Saga::new();

    for resource in resources {
        if let Err(err) = check_owner(platform, resource).await {
            debug!("execute {} owner check fail: {}", resource.reference(), err);
            return Err(saga.abort(platform, err).await);
        }

        match platform.update(resource).await {
            Ok(()) => debug!("execute {} update success", resource.reference()),
            Err(err) if err.is_not_found() => match platform.create(resource).await {
                Ok(()) => {
                    debug!("execute {} create success", resource.reference());
                    saga.record_created(resource.reference());
                }
                Err(err) => {
                    debug!("execute {} create fail: {}", resource.reference(), err);
                    return Err(saga.abort(platform, err).await);
                }
            },
            Err(err) => {
                debug!("execute {} update fail: {}", resource.reference(), err);
                return Err(saga.abort(platform, err).await);
            }
        }
    }

    Ok(())
}
