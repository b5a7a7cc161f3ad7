// ABOUTME: Restores a previous release after a failed deployment.
// ABOUTME: Also implements manual rollback for the `rollback` command.

use crate::release::{CurrentPointer, PointerError, ReleaseError, ReleaseStore, SwitchError};
use crate::service::{RestartError, ServiceController, ServiceSettings, restart_and_confirm};
use crate::types::Version;

#[derive(Debug, thiserror::Error)]
pub enum RollbackError {
    #[error("no previous version to roll back to")]
    NoPreviousVersion,

    #[error("previous release {0} no longer exists")]
    MissingRelease(Version),

    #[error("failed to restore current pointer: {0}")]
    Switch(#[from] SwitchError),

    #[error("service did not come back on the previous release: {0}")]
    Restart(#[from] RestartError),

    #[error(transparent)]
    Pointer(#[from] PointerError),

    #[error(transparent)]
    Release(#[from] ReleaseError),
}

/// Points `current` back at a previous release and restarts the service.
///
/// The health check is not re-run for the restored release.
pub struct RollbackCoordinator<'a, C: ?Sized> {
    store: &'a ReleaseStore,
    pointer: &'a CurrentPointer,
    controller: &'a C,
    service: Option<&'a ServiceSettings>,
}

impl<'a, C: ServiceController + ?Sized> RollbackCoordinator<'a, C> {
    pub fn new(
        store: &'a ReleaseStore,
        pointer: &'a CurrentPointer,
        controller: &'a C,
        service: Option<&'a ServiceSettings>,
    ) -> Self {
        Self {
            store,
            pointer,
            controller,
            service,
        }
    }

    /// Restore `previous`. Fails closed when it is absent or no longer staged.
    pub async fn rollback(&self, previous: Option<&Version>) -> Result<Version, RollbackError> {
        let previous = previous.ok_or(RollbackError::NoPreviousVersion)?;

        let release = self
            .store
            .release(previous)?
            .ok_or_else(|| RollbackError::MissingRelease(previous.clone()))?;

        tracing::info!("Rolling back to {}", previous);
        self.pointer.switch_to(&release)?;

        if let Some(service) = self.service {
            restart_and_confirm(self.controller, service).await?;
        }

        tracing::info!("Rolled back to {}", previous);
        Ok(release.version)
    }
}

/// Versions involved in a manual rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualRollback {
    pub from: Version,
    pub to: Version,
}

/// Roll back from the current release to the one staged before it.
///
/// The target is the newest release older than the current one. When the
/// current release is missing from the store, the newest other release is used.
pub async fn manual_rollback<C: ServiceController + ?Sized>(
    store: &ReleaseStore,
    pointer: &CurrentPointer,
    controller: &C,
    service: Option<&ServiceSettings>,
) -> Result<ManualRollback, RollbackError> {
    let current = pointer.read()?.ok_or(RollbackError::NoPreviousVersion)?;
    let releases = store.list()?;

    let target = match releases.iter().position(|r| r.version == current) {
        Some(index) => releases.get(index + 1),
        None => releases.first(),
    }
    .map(|r| r.version.clone())
    .ok_or(RollbackError::NoPreviousVersion)?;

    let restored = RollbackCoordinator::new(store, pointer, controller, service)
        .rollback(Some(&target))
        .await?;

    Ok(ManualRollback {
        from: current,
        to: restored,
    })
}
