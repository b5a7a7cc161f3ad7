// ABOUTME: Application-wide error types for releasekit.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::{DeployError, DeployFailure, LockHolderInfo};
use crate::release::{PointerError, ReleaseError};
use crate::types::Version;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no version to deploy: set `version` in the config or pass --version")]
    MissingVersion,

    #[error("deployment of {target} failed; rolled back to {restored}")]
    RolledBack { target: Version, restored: Version },

    #[error("hook failed: {0}")]
    Hook(String),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Pointer(#[from] PointerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Stable machine-readable category for JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::AlreadyExists(_) => "already_exists",
            Error::ConfigNotFound(_) => "config_not_found",
            Error::InvalidConfig(_) | Error::Yaml(_) => "invalid_config",
            Error::MissingVersion => "missing_version",
            Error::RolledBack { .. } => "rolled_back",
            Error::Hook(_) => "hook",
            Error::Deploy(e) => e.kind().as_str(),
            Error::Release(_) => "release",
            Error::Pointer(_) => "pointer",
            Error::Io(_) => "io",
        }
    }

    pub fn lock_holder_info(&self) -> Option<LockHolderInfo> {
        match self {
            Error::Deploy(e) => e.lock_holder_info(),
            _ => None,
        }
    }
}

impl From<DeployFailure> for Error {
    fn from(failure: DeployFailure) -> Self {
        Error::Deploy(failure.into_error())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
