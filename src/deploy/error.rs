// ABOUTME: Error types for deployment operations.
// ABOUTME: Covers staging, pointer switch, restart, health check, rollback, and locking.

use chrono::{DateTime, Utc};

use crate::release::{PointerError, ReleaseError, SwitchError};
use crate::service::RestartError;
use crate::stager::StagingError;

use super::rollback::RollbackError;

/// Errors that can occur during deployment state transitions.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Artifact could not be fetched or unpacked. Nothing was switched.
    #[error("failed to stage release: {0}")]
    Staging(#[from] StagingError),

    /// The `current` pointer could not be moved to the new release.
    #[error("failed to switch current release: {0}")]
    Switch(#[from] SwitchError),

    #[error("service restart failed: {0}")]
    Restart(#[from] RestartError),

    /// No health probe succeeded before the deadline.
    #[error("health check of {url} did not pass within {seconds} seconds")]
    HealthCheckTimeout { url: String, seconds: u64 },

    /// The deployment failed and restoring the previous release failed too.
    #[error("{original}; rollback failed: {source}")]
    RollbackFailed {
        original: Box<DeployError>,
        source: RollbackError,
    },

    /// A manual rollback could not be completed.
    #[error("rollback failed: {0}")]
    Rollback(#[from] RollbackError),

    #[error(transparent)]
    Pointer(#[from] PointerError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// Lock file could not be created, read, or parsed.
    #[error("deploy lock error: {0}")]
    Lock(String),

    /// Another deployment holds the lock.
    #[error("deployment locked by {holder} (pid {pid}) since {started_at}")]
    LockHeld {
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },
}

/// Coarse error category, used for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Staging,
    Switch,
    Restart,
    HealthCheck,
    RollbackFailed,
    Rollback,
    Pointer,
    Release,
    Lock,
    LockHeld,
}

impl DeployErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeployErrorKind::Staging => "staging",
            DeployErrorKind::Switch => "switch",
            DeployErrorKind::Restart => "restart",
            DeployErrorKind::HealthCheck => "health_check",
            DeployErrorKind::RollbackFailed => "rollback_failed",
            DeployErrorKind::Rollback => "rollback",
            DeployErrorKind::Pointer => "pointer",
            DeployErrorKind::Release => "release",
            DeployErrorKind::Lock => "lock",
            DeployErrorKind::LockHeld => "lock_held",
        }
    }
}

/// Who holds a contended deploy lock.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LockHolderInfo {
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

impl DeployError {
    pub(crate) fn lock_error(message: impl Into<String>) -> Self {
        DeployError::Lock(message.into())
    }

    pub(crate) fn lock_held(holder: String, pid: u32, started_at: DateTime<Utc>) -> Self {
        DeployError::LockHeld {
            holder,
            pid,
            started_at,
        }
    }

    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Staging(_) => DeployErrorKind::Staging,
            DeployError::Switch(_) => DeployErrorKind::Switch,
            DeployError::Restart(_) => DeployErrorKind::Restart,
            DeployError::HealthCheckTimeout { .. } => DeployErrorKind::HealthCheck,
            DeployError::RollbackFailed { .. } => DeployErrorKind::RollbackFailed,
            DeployError::Rollback(_) => DeployErrorKind::Rollback,
            DeployError::Pointer(_) => DeployErrorKind::Pointer,
            DeployError::Release(_) => DeployErrorKind::Release,
            DeployError::Lock(_) => DeployErrorKind::Lock,
            DeployError::LockHeld { .. } => DeployErrorKind::LockHeld,
        }
    }

    /// Holder details when this is a lock contention error.
    pub fn lock_holder_info(&self) -> Option<LockHolderInfo> {
        match self {
            DeployError::LockHeld {
                holder,
                pid,
                started_at,
            } => Some(LockHolderInfo {
                holder: holder.clone(),
                pid: *pid,
                started_at: *started_at,
            }),
            _ => None,
        }
    }
}
