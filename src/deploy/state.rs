// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Every state after staging carries the release being deployed.

use crate::health::HealthStatus;
use crate::release::Release;
use crate::types::Version;

/// Initial state: previous version read, nothing touched yet.
/// Available actions: `stage()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Staged: the release directory exists and is complete.
/// Available actions: `switch()`
#[derive(Debug, Clone)]
pub struct Staged {
    pub(crate) release: Release,
}

/// Switched: `current` points at the new release.
/// Available actions: `restart()`, `into_failed()`
#[derive(Debug, Clone)]
pub struct Switched {
    pub(crate) release: Release,
}

/// Restarted: the service is active on the new release, or no service is configured.
/// Available actions: `health_check()`, `into_failed()`
#[derive(Debug, Clone)]
pub struct Restarted {
    pub(crate) release: Release,
}

/// Health checked: the probe passed or was skipped.
/// Available actions: `release()`, `health()`
#[derive(Debug, Clone)]
pub struct HealthChecked {
    pub(crate) release: Release,
    pub(crate) health: HealthStatus,
}

/// Failed after the switch was attempted.
/// Available actions: `rollback()`
#[derive(Debug, Clone)]
pub struct Failed {
    pub(crate) release: Release,
    pub(crate) health: HealthStatus,
}

/// Rolled back: `current` points at the previous release again.
#[derive(Debug, Clone)]
pub struct RolledBack {
    pub(crate) release: Release,
    pub(crate) health: HealthStatus,
    pub(crate) restored: Version,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Staged {}
    impl Sealed for super::Switched {}
    impl Sealed for super::Restarted {}
    impl Sealed for super::HealthChecked {}
    impl Sealed for super::Failed {}
    impl Sealed for super::RolledBack {}
}

/// States that hold a staged release.
pub trait HasRelease: sealed::Sealed {
    fn release(&self) -> &Release;
}

macro_rules! has_release {
    ($($state:ty),*) => {
        $(impl HasRelease for $state {
            fn release(&self) -> &Release {
                &self.release
            }
        })*
    };
}

has_release!(Staged, Switched, Restarted, HealthChecked, Failed, RolledBack);
