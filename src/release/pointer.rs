// ABOUTME: The "current" symlink naming the active release.
// ABOUTME: Switches by renaming a fresh symlink over the old one, never delete-then-create.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::{Version, VersionError};

use super::CURRENT_LINK;
use super::store::Release;

#[derive(Debug, thiserror::Error)]
pub enum PointerError {
    #[error("failed to read current pointer {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("current pointer {} names an invalid release: {source}", .path.display())]
    InvalidTarget { path: PathBuf, source: VersionError },
}

/// Errors from repointing the current symlink.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("release {0} does not exist")]
    MissingRelease(Version),

    #[error("{} exists and is not a symlink; refusing to replace it", .0.display())]
    NotALink(PathBuf),

    #[error("failed to create symlink {}: {source}", .path.display())]
    Link { path: PathBuf, source: io::Error },

    #[error("failed to replace {}: {source}", .path.display())]
    Replace { path: PathBuf, source: io::Error },
}

/// `<app_path>/current`.
#[derive(Debug, Clone)]
pub struct CurrentPointer {
    link: PathBuf,
}

impl CurrentPointer {
    pub fn new(app_path: &Path) -> Self {
        Self {
            link: app_path.join(CURRENT_LINK),
        }
    }

    pub fn path(&self) -> &Path {
        &self.link
    }

    /// Raw symlink target, or `None` when there is no symlink.
    pub fn target(&self) -> Result<Option<PathBuf>, PointerError> {
        match fs::read_link(&self.link) {
            Ok(target) => Ok(Some(target)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            // Not a symlink
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(None),
            Err(source) => Err(PointerError::Read {
                path: self.link.clone(),
                source,
            }),
        }
    }

    /// Version the pointer currently names. `None` means no prior deployment.
    pub fn read(&self) -> Result<Option<Version>, PointerError> {
        let Some(target) = self.target()? else {
            return Ok(None);
        };

        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Version::new(&name)
            .map(Some)
            .map_err(|source| PointerError::InvalidTarget {
                path: self.link.clone(),
                source,
            })
    }

    /// Atomically point `current` at `release`.
    ///
    /// A new symlink is created under a temporary name and renamed over
    /// `current`, so readers always observe either the old or the new target.
    pub fn switch_to(&self, release: &Release) -> Result<(), SwitchError> {
        if !release.path.is_dir() {
            return Err(SwitchError::MissingRelease(release.version.clone()));
        }

        if let Ok(meta) = fs::symlink_metadata(&self.link)
            && !meta.file_type().is_symlink()
        {
            return Err(SwitchError::NotALink(self.link.clone()));
        }

        let tmp = self.temp_link_path();
        let _ = fs::remove_file(&tmp);

        symlink(&release.path, &tmp).map_err(|source| SwitchError::Link {
            path: tmp.clone(),
            source,
        })?;

        if let Err(source) = fs::rename(&tmp, &self.link) {
            let _ = fs::remove_file(&tmp);
            return Err(SwitchError::Replace {
                path: self.link.clone(),
                source,
            });
        }

        tracing::info!("Switched {} to {}", self.link.display(), release.version);
        Ok(())
    }

    fn temp_link_path(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        self.link.with_file_name(format!(
            ".{}.{}.{}.tmp",
            CURRENT_LINK,
            std::process::id(),
            nanos
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn staged(app: &Path, v: &str) -> Release {
        let path = app.join("releases").join(v);
        fs::create_dir_all(&path).unwrap();
        Release {
            version: Version::new(v).unwrap(),
            path,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn read_without_link_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let pointer = CurrentPointer::new(tmp.path());
        assert_eq!(pointer.read().unwrap(), None);
    }

    #[test]
    fn switch_then_read_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let pointer = CurrentPointer::new(tmp.path());
        let v1 = staged(tmp.path(), "v1");
        let v2 = staged(tmp.path(), "v2");

        pointer.switch_to(&v1).unwrap();
        assert_eq!(pointer.read().unwrap(), Some(v1.version.clone()));

        pointer.switch_to(&v2).unwrap();
        assert_eq!(pointer.read().unwrap(), Some(v2.version.clone()));
        assert_eq!(pointer.target().unwrap(), Some(v2.path.clone()));
    }

    #[test]
    fn switch_leaves_no_temp_links() {
        let tmp = tempfile::tempdir().unwrap();
        let pointer = CurrentPointer::new(tmp.path());
        pointer.switch_to(&staged(tmp.path(), "v1")).unwrap();

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn switch_to_missing_release_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let pointer = CurrentPointer::new(tmp.path());
        let v1 = staged(tmp.path(), "v1");
        pointer.switch_to(&v1).unwrap();

        let ghost = Release {
            version: Version::new("ghost").unwrap(),
            path: tmp.path().join("releases/ghost"),
            created_at: Utc::now(),
        };
        let err = pointer.switch_to(&ghost).unwrap_err();
        assert!(matches!(err, SwitchError::MissingRelease(_)));
        assert_eq!(pointer.read().unwrap(), Some(v1.version));
    }

    #[test]
    fn switch_refuses_to_replace_real_directory() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("current")).unwrap();
        let pointer = CurrentPointer::new(tmp.path());

        let err = pointer.switch_to(&staged(tmp.path(), "v1")).unwrap_err();
        assert!(matches!(err, SwitchError::NotALink(_)));
        assert!(tmp.path().join("current").is_dir());
        assert_eq!(pointer.read().unwrap(), None);
    }
}
