// ABOUTME: The record produced by one deployment run.
// ABOUTME: Serializable for JSON output; fatal runs carry it inside DeployFailure.

use std::fmt;

use serde::Serialize;

use crate::health::HealthStatus;
use crate::types::{AppName, Version};

use super::DeployError;

/// How a deployment run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Target was already current; nothing ran.
    AlreadyDeployed,
    Succeeded,
    /// Target failed and the previous release is live again.
    RolledBack,
    /// Target failed and restoring the previous release failed too.
    RollbackFailed,
    /// Target failed with no rollback attempted.
    Failed,
}

impl Outcome {
    /// Whether the requested version is live.
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::AlreadyDeployed | Outcome::Succeeded)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::AlreadyDeployed => "already_deployed",
            Outcome::Succeeded => "succeeded",
            Outcome::RolledBack => "rolled_back",
            Outcome::RollbackFailed => "rollback_failed",
            Outcome::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentAttempt {
    pub app: AppName,
    pub target_version: Version,
    pub previous_version: Option<Version>,
    /// What `current` names once the run is over.
    pub deployed_version: Option<Version>,
    pub rollback_occurred: bool,
    pub health: HealthStatus,
    pub status: String,
    /// False only when nothing on disk was touched.
    pub changed: bool,
    pub duration_seconds: f64,
    pub outcome: Outcome,
    pub pruned: Vec<Version>,
    pub warnings: Vec<String>,
}

/// A fatal deployment error together with the record of the run.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct DeployFailure {
    attempt: Box<DeploymentAttempt>,
    #[source]
    error: DeployError,
}

impl DeployFailure {
    pub(crate) fn new(attempt: DeploymentAttempt, error: DeployError) -> Self {
        Self {
            attempt: Box::new(attempt),
            error,
        }
    }

    pub fn attempt(&self) -> &DeploymentAttempt {
        &self.attempt
    }

    pub fn error(&self) -> &DeployError {
        &self.error
    }

    pub fn into_error(self) -> DeployError {
        self.error
    }
}
