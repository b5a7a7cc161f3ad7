// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports state markers, the orchestrator, rollback, and the deploy lock.

mod attempt;
mod deployment;
mod error;
mod lock;
mod options;
mod orchestrator;
mod rollback;
mod state;
mod transitions;

pub use attempt::{DeployFailure, DeploymentAttempt, Outcome};
pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind, LockHolderInfo};
pub use lock::{DeployLock, LOCK_FILENAME, LockInfo};
pub use options::DeployOptions;
pub use orchestrator::{DeployPlan, Orchestrator, PlannedAction};
pub use rollback::{ManualRollback, RollbackCoordinator, RollbackError, manual_rollback};
pub use state::{
    Failed, HasRelease, HealthChecked, Initialized, Restarted, RolledBack, Staged, Switched,
};
pub use transitions::TransitionResult;
