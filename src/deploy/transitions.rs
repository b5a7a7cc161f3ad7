// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use crate::health::{HealthChecker, HealthStatus, Probe};
use crate::release::{CurrentPointer, ReleaseStore};
use crate::service::{ServiceController, restart_and_confirm};
use crate::stager::ArtifactStager;

use super::Deployment;
use super::error::DeployError;
use super::rollback::{RollbackCoordinator, RollbackError};
use super::state::{
    Failed, HasRelease, HealthChecked, Initialized, Restarted, RolledBack, Staged, Switched,
};

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<Deployment<T>, (Deployment<S>, DeployError)>;

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Deployment<S> {
    /// Internal helper to move into a new state, keeping the bookkeeping.
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            options: self.options,
            previous: self.previous,
            changed: self.changed,
            started: self.started,
            state,
        }
    }
}

// =============================================================================
// Initialized -> Staged
// =============================================================================

impl Deployment<Initialized> {
    /// Stage the target release, reusing it if already present.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Staging` if the artifact cannot be fetched. The
    /// partial release directory has been removed by then.
    #[must_use = "deployment state must be used"]
    pub async fn stage<A: ArtifactStager + ?Sized>(
        self,
        store: &ReleaseStore,
        stager: &A,
    ) -> TransitionResult<Staged, Initialized> {
        let staged = store
            .stage(
                &self.options.version,
                self.options.artifact_source.as_deref(),
                stager,
                self.options.staging_timeout,
            )
            .await;

        match staged {
            Ok(staged) => Ok(self.transition(Staged {
                release: staged.release,
            })),
            Err(e) => Err((self, e.into())),
        }
    }
}

// =============================================================================
// Staged -> Switched
// =============================================================================

impl Deployment<Staged> {
    /// Point `current` at the staged release.
    ///
    /// The deployment counts as changed from here on, even if the switch fails.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Switch` if the symlink cannot be replaced.
    #[must_use = "deployment state must be used"]
    pub fn switch(mut self, pointer: &CurrentPointer) -> TransitionResult<Switched, Staged> {
        self.changed = true;

        if let Err(e) = pointer.switch_to(&self.state.release) {
            return Err((self, e.into()));
        }

        tracing::info!("Switched current to {}", self.state.release.version);
        let release = self.state.release.clone();
        Ok(self.transition(Switched { release }))
    }
}

// =============================================================================
// Switched -> Restarted
// =============================================================================

impl Deployment<Switched> {
    /// Restart the configured service and confirm it is active.
    ///
    /// Without a configured service this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Restart` if the restart fails, times out, or the
    /// service is not active afterwards.
    #[must_use = "deployment state must be used"]
    pub async fn restart<C: ServiceController + ?Sized>(
        self,
        controller: &C,
    ) -> TransitionResult<Restarted, Switched> {
        let Some(service) = &self.options.service else {
            tracing::debug!("No service configured, skipping restart");
            let release = self.state.release.clone();
            return Ok(self.transition(Restarted { release }));
        };

        tracing::info!("Restarting {}", service.name);
        if let Err(e) = restart_and_confirm(controller, service).await {
            return Err((self, e.into()));
        }

        let release = self.state.release.clone();
        Ok(self.transition(Restarted { release }))
    }
}

// =============================================================================
// Restarted -> HealthChecked
// =============================================================================

impl Deployment<Restarted> {
    /// Poll the health check URL until it passes or the timeout elapses.
    ///
    /// Passes through with `HealthStatus::Skipped` when no URL is configured.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::HealthCheckTimeout` if no probe succeeded in time.
    #[must_use = "deployment state must be used"]
    pub async fn health_check<P: Probe>(self, probe: P) -> TransitionResult<HealthChecked, Restarted> {
        let hc = &self.options.healthcheck;
        let checker = HealthChecker::new(probe).request_timeout(hc.request_timeout);
        let health = checker
            .probe(hc.url.as_deref(), hc.timeout, hc.poll_interval)
            .await;

        if health == HealthStatus::Failed {
            let error = DeployError::HealthCheckTimeout {
                url: hc.url.clone().unwrap_or_default(),
                seconds: hc.timeout.as_secs(),
            };
            return Err((self, error));
        }

        let release = self.state.release.clone();
        Ok(self.transition(HealthChecked { release, health }))
    }
}

// =============================================================================
// Any post-staging state -> Failed -> RolledBack
// =============================================================================

impl<S: HasRelease> Deployment<S> {
    /// Mark the deployment as failed, recording the last health result.
    pub fn into_failed(self, health: HealthStatus) -> Deployment<Failed> {
        let release = self.state.release().clone();
        self.transition(Failed { release, health })
    }
}

impl Deployment<Failed> {
    /// Restore the previous release and restart the service on it.
    ///
    /// # Errors
    ///
    /// Returns the rollback error with the still-failed deployment if there is
    /// no previous version, its release is gone, or the restore fails.
    #[must_use = "deployment state must be used"]
    pub async fn rollback<C: ServiceController + ?Sized>(
        self,
        store: &ReleaseStore,
        pointer: &CurrentPointer,
        controller: &C,
    ) -> Result<Deployment<RolledBack>, (Deployment<Failed>, RollbackError)> {
        let coordinator =
            RollbackCoordinator::new(store, pointer, controller, self.options.service.as_ref());

        match coordinator.rollback(self.previous.as_ref()).await {
            Ok(restored) => {
                let release = self.state.release.clone();
                let health = self.state.health;
                Ok(self.transition(RolledBack {
                    release,
                    health,
                    restored,
                }))
            }
            Err(e) => Err((self, e)),
        }
    }
}
