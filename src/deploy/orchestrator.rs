// ABOUTME: Drives one deployment through stage, switch, restart, and health check.
// ABOUTME: Rolls back on failure, prunes old releases, and produces the run record.

use std::fmt;
use std::path::Path;

use crate::diagnostics::{Diagnostics, Warning};
use crate::health::{HealthStatus, Probe};
use crate::release::{CurrentPointer, ReleaseStore, RetentionPolicy};
use crate::service::ServiceController;
use crate::stager::ArtifactStager;
use crate::types::{KeepCount, Version};

use super::attempt::{DeployFailure, DeploymentAttempt, Outcome};
use super::deployment::Deployment;
use super::error::DeployError;
use super::options::DeployOptions;
use super::state::{Failed, HealthChecked, Staged};

/// Runs deployments for one application directory.
pub struct Orchestrator<A, C, P> {
    store: ReleaseStore,
    pointer: CurrentPointer,
    stager: A,
    controller: C,
    probe: P,
}

impl<A, C, P> Orchestrator<A, C, P>
where
    A: ArtifactStager,
    C: ServiceController,
    P: Probe,
{
    pub fn new(app_path: &Path, stager: A, controller: C, probe: P) -> Self {
        Self {
            store: ReleaseStore::new(app_path),
            pointer: CurrentPointer::new(app_path),
            stager,
            controller,
            probe,
        }
    }

    pub fn store(&self) -> &ReleaseStore {
        &self.store
    }

    pub fn pointer(&self) -> &CurrentPointer {
        &self.pointer
    }

    /// Describe what `deploy` would do without touching anything.
    pub fn plan(&self, options: &DeployOptions) -> Result<DeployPlan, DeployError> {
        let current = self.pointer.read()?;
        let target = options.version.clone();
        let staged = self.store.exists(&target);

        let action = if staged && current.as_ref() == Some(&target) {
            PlannedAction::AlreadyDeployed
        } else if staged {
            PlannedAction::ReuseStaged
        } else if let Some(source) = &options.artifact_source {
            PlannedAction::Stage {
                source: source.clone(),
            }
        } else {
            PlannedAction::NoSource
        };

        Ok(DeployPlan {
            target,
            current,
            action,
        })
    }

    /// Deploy `options.version`, rolling back on failure when possible.
    ///
    /// A run that ends with the previous release restored returns `Ok` with
    /// outcome `RolledBack`. Runs that leave no healthy release behind, or
    /// fail before switching, return `DeployFailure` carrying the record.
    pub async fn deploy(&self, options: DeployOptions) -> Result<DeploymentAttempt, DeployFailure> {
        let previous = match self.pointer.read() {
            Ok(previous) => previous,
            Err(e) => {
                let deployment = Deployment::new(options, None);
                let status = format!("Cannot read current release: {}", e);
                let attempt = deployment.record(Outcome::Failed, HealthStatus::Skipped, status, None);
                return Err(DeployFailure::new(attempt, e.into()));
            }
        };

        let deployment = Deployment::new(options, previous);
        tracing::info!(
            "Deploying {} {} (current: {})",
            deployment.app(),
            deployment.target(),
            deployment
                .previous()
                .map(Version::to_string)
                .unwrap_or_else(|| "none".to_string())
        );

        if deployment.targets_current() && self.store.exists(deployment.target()) {
            tracing::info!("{} is already deployed", deployment.target());
            return Ok(deployment.record(
                Outcome::AlreadyDeployed,
                HealthStatus::Skipped,
                "Already deployed".to_string(),
                deployment.previous().cloned(),
            ));
        }

        let staged = match deployment.stage(&self.store, &self.stager).await {
            Ok(staged) => staged,
            Err((deployment, e)) => {
                let status = format!("Staging failed: {}", e);
                let deployed = deployment.previous().cloned();
                let attempt =
                    deployment.record(Outcome::Failed, HealthStatus::Skipped, status, deployed);
                return Err(DeployFailure::new(attempt, e));
            }
        };

        match self.activate(staged).await {
            Ok(done) => Ok(self.succeed(done)),
            Err((failed, error)) => self.recover(failed, error).await,
        }
    }

    /// Switch, restart, and health check. Failures are marked for recovery.
    async fn activate(
        &self,
        staged: Deployment<Staged>,
    ) -> Result<Deployment<HealthChecked>, (Deployment<Failed>, DeployError)> {
        let switched = staged
            .switch(&self.pointer)
            .map_err(|(d, e)| (d.into_failed(HealthStatus::Skipped), e))?;

        let restarted = switched
            .restart(&self.controller)
            .await
            .map_err(|(d, e)| (d.into_failed(HealthStatus::Skipped), e))?;

        restarted
            .health_check(&self.probe)
            .await
            .map_err(|(d, e)| (d.into_failed(HealthStatus::Failed), e))
    }

    fn succeed(&self, done: Deployment<HealthChecked>) -> DeploymentAttempt {
        let status = match done.health() {
            HealthStatus::Passed => "Health check passed",
            _ => "No health check URL provided",
        };
        tracing::info!("Deployed {}", done.target());

        let deployed = Some(done.target().clone());
        let mut attempt = done.record(
            Outcome::Succeeded,
            done.health(),
            status.to_string(),
            deployed,
        );
        self.cleanup(done.options().keep_versions, &mut attempt);
        attempt
    }

    async fn recover(
        &self,
        failed: Deployment<Failed>,
        error: DeployError,
    ) -> Result<DeploymentAttempt, DeployFailure> {
        let summary = match &error {
            DeployError::HealthCheckTimeout { .. } => "Health check failed".to_string(),
            other => format!("Deployment failed: {}", other),
        };
        tracing::warn!("{} failed: {}", failed.target(), error);

        if !failed.options().rollback_on_failure || failed.previous().is_none() {
            let reason = if failed.options().rollback_on_failure {
                "no previous version to roll back to"
            } else {
                "rollback disabled"
            };
            let status = format!("{} - {}", summary, reason);
            let deployed = self.pointer.read().ok().flatten();
            let mut attempt = failed.record(Outcome::Failed, failed.health(), status, deployed);
            self.cleanup(failed.options().keep_versions, &mut attempt);
            return Err(DeployFailure::new(attempt, error));
        }

        match failed
            .rollback(&self.store, &self.pointer, &self.controller)
            .await
        {
            Ok(rolled_back) => {
                let status = format!("{} - rolled back to previous version", summary);
                let deployed = Some(rolled_back.restored().clone());
                let mut attempt =
                    rolled_back.record(Outcome::RolledBack, rolled_back.health(), status, deployed);
                self.cleanup(rolled_back.options().keep_versions, &mut attempt);
                Ok(attempt)
            }
            Err((failed, rollback_error)) => {
                tracing::error!("Rollback failed: {}", rollback_error);
                let status = format!("{} - rollback failed: {}", summary, rollback_error);
                let deployed = self.pointer.read().ok().flatten();
                let mut attempt =
                    failed.record(Outcome::RollbackFailed, failed.health(), status, deployed);
                self.cleanup(failed.options().keep_versions, &mut attempt);
                let error = DeployError::RollbackFailed {
                    original: Box::new(error),
                    source: rollback_error,
                };
                Err(DeployFailure::new(attempt, error))
            }
        }
    }

    /// Prune old releases, protecting whatever `current` names now.
    ///
    /// Problems become warnings on the attempt; they never fail the run.
    fn cleanup(&self, keep: KeepCount, attempt: &mut DeploymentAttempt) {
        let mut diag = Diagnostics::default();

        match self.pointer.read() {
            Ok(protected) => match RetentionPolicy::new(keep).prune(&self.store, protected.as_ref())
            {
                Ok(report) => {
                    for failure in &report.failed {
                        diag.warn(Warning::cleanup(format!(
                            "failed to remove release {}: {}",
                            failure.version, failure.error
                        )));
                    }
                    attempt.pruned = report.removed;
                }
                Err(e) => diag.warn(Warning::cleanup(format!("skipped pruning: {}", e))),
            },
            Err(e) => diag.warn(Warning::cleanup(format!(
                "skipped pruning, cannot read current release: {}",
                e
            ))),
        }

        attempt.warnings = diag.into_messages();
    }
}

/// What a deployment would do, as reported by `deploy --check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPlan {
    pub target: Version,
    pub current: Option<Version>,
    pub action: PlannedAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    AlreadyDeployed,
    /// The release directory exists but is not current.
    ReuseStaged,
    Stage { source: String },
    /// Not staged and nothing to stage from; a deploy would fail.
    NoSource,
}

impl PlannedAction {
    /// Whether a deploy would change anything on disk.
    pub fn would_change(&self) -> bool {
        matches!(self, PlannedAction::ReuseStaged | PlannedAction::Stage { .. })
    }
}

impl fmt::Display for DeployPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            PlannedAction::AlreadyDeployed => write!(f, "{} is already deployed", self.target),
            PlannedAction::ReuseStaged => {
                write!(f, "would switch to staged release {}", self.target)
            }
            PlannedAction::Stage { source } => {
                write!(f, "would stage {} from {}", self.target, source)
            }
            PlannedAction::NoSource => write!(
                f,
                "cannot deploy {}: not staged and no artifact source",
                self.target
            ),
        }
    }
}
