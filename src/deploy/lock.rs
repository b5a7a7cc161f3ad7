// ABOUTME: Deploy lock to prevent concurrent deployments of the same application.
// ABOUTME: Uses atomic file creation with lock info stored in <app_path>/.releasekit.lock.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AppName;

use super::DeployError;

/// Lock file name inside the application directory.
pub const LOCK_FILENAME: &str = ".releasekit.lock";

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Application being deployed.
    pub app: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(app: &AppName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            app: app.to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }

    /// Path to the lock file for an application directory.
    pub fn lock_path(app_path: &Path) -> PathBuf {
        app_path.join(LOCK_FILENAME)
    }
}

/// A held deploy lock that releases on drop.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
    released: bool,
}

impl DeployLock {
    /// Acquire the deploy lock for the application at `app_path`.
    ///
    /// The lock file is created with `create_new`, so two processes can never
    /// both succeed. Stale locks (>1 hour) are broken with a warning, as are
    /// unreadable ones. `force` breaks any existing lock.
    pub fn acquire(app_path: &Path, app: &AppName, force: bool) -> Result<Self, DeployError> {
        fs::create_dir_all(app_path).map_err(|e| {
            DeployError::lock_error(format!(
                "failed to create {}: {}",
                app_path.display(),
                e
            ))
        })?;

        let path = LockInfo::lock_path(app_path);
        let lock_json = serde_json::to_string(&LockInfo::new(app))
            .map_err(|e| DeployError::lock_error(format!("failed to serialize lock: {}", e)))?;

        match Self::try_create(&path, &lock_json) {
            Ok(()) => return Ok(Self::held(path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(DeployError::lock_error(format!(
                    "failed to acquire lock: {}",
                    e
                )));
            }
        }

        if let Some(existing) = Self::check_existing_lock(&path, force) {
            return Err(DeployError::lock_held(
                existing.holder,
                existing.pid,
                existing.started_at,
            ));
        }

        tracing::debug!("Removing stale/forced lock at {}", path.display());
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != io::ErrorKind::NotFound
        {
            return Err(DeployError::lock_error(format!(
                "failed to remove existing lock: {}",
                e
            )));
        }

        match Self::try_create(&path, &lock_json) {
            Ok(()) => Ok(Self::held(path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(DeployError::lock_error(
                "lock acquired by another process during break",
            )),
            Err(e) => Err(DeployError::lock_error(format!(
                "failed to acquire lock: {}",
                e
            ))),
        }
    }

    fn held(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    fn try_create(path: &Path, contents: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    }

    /// Decide whether an existing lock stands. Returns the holder if it does.
    fn check_existing_lock(path: &Path, force: bool) -> Option<LockInfo> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                tracing::warn!("Lock info unreadable, breaking lock");
                return None;
            }
        };

        match serde_json::from_str::<LockInfo>(&contents) {
            Ok(existing) if force => {
                tracing::warn!(
                    "Breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) if existing.is_stale() => {
                tracing::warn!(
                    "Auto-breaking stale lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                None
            }
            Ok(existing) => Some(existing),
            Err(_) => {
                tracing::warn!("Lock info corrupted, breaking lock");
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock.
    pub fn release(mut self) -> Result<(), DeployError> {
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DeployError::lock_error(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}
