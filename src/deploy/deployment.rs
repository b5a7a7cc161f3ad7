// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: State types carry the staged release for compile-time guarantees.

use std::time::Instant;

use crate::health::HealthStatus;
use crate::release::Release;
use crate::types::{AppName, Version};

use super::attempt::{DeploymentAttempt, Outcome};
use super::options::DeployOptions;
use super::state::{Failed, HasRelease, HealthChecked, Initialized, RolledBack};

/// A deployment in progress, parameterized by its current state.
///
/// `previous` is the version `current` named before anything was touched.
/// `changed` becomes true once a pointer switch has been attempted and
/// stays true from then on, whatever happens afterwards.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) options: DeployOptions,
    pub(crate) previous: Option<Version>,
    pub(crate) changed: bool,
    pub(crate) started: Instant,
    pub(crate) state: S,
}

impl Deployment<Initialized> {
    /// Start a deployment. `previous` must be read before any mutation.
    pub fn new(options: DeployOptions, previous: Option<Version>) -> Self {
        Deployment {
            options,
            previous,
            changed: false,
            started: Instant::now(),
            state: Initialized,
        }
    }
}

impl<S> Deployment<S> {
    pub fn app(&self) -> &AppName {
        &self.options.app
    }

    /// The version being deployed.
    pub fn target(&self) -> &Version {
        &self.options.version
    }

    pub fn options(&self) -> &DeployOptions {
        &self.options
    }

    /// The version that was current before this deployment (None on first deploy).
    pub fn previous(&self) -> Option<&Version> {
        self.previous.as_ref()
    }

    /// True when the target is already current, so the run can stop here.
    pub fn targets_current(&self) -> bool {
        self.previous.as_ref() == Some(&self.options.version)
    }

    /// Build the run record from this deployment's bookkeeping.
    pub(crate) fn record(
        &self,
        outcome: Outcome,
        health: HealthStatus,
        status: String,
        deployed: Option<Version>,
    ) -> DeploymentAttempt {
        DeploymentAttempt {
            app: self.options.app.clone(),
            target_version: self.options.version.clone(),
            previous_version: self.previous.clone(),
            deployed_version: deployed,
            rollback_occurred: outcome == Outcome::RolledBack,
            health,
            status,
            changed: self.changed,
            duration_seconds: self.started.elapsed().as_secs_f64(),
            outcome,
            pruned: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<S: HasRelease> Deployment<S> {
    /// The release being deployed.
    pub fn release(&self) -> &Release {
        self.state.release()
    }
}

impl Deployment<HealthChecked> {
    pub fn health(&self) -> HealthStatus {
        self.state.health
    }
}

impl Deployment<Failed> {
    pub fn health(&self) -> HealthStatus {
        self.state.health
    }
}

impl Deployment<RolledBack> {
    pub fn health(&self) -> HealthStatus {
        self.state.health
    }

    /// The version `current` names again.
    pub fn restored(&self) -> &Version {
        &self.state.restored
    }
}
