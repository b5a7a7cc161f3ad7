// ABOUTME: Release directory management (the version store).
// ABOUTME: Idempotent staging through an ArtifactStager, listing, and removal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;
use snafu::ResultExt;

use crate::stager::{
    ArtifactStager, CreateDirSnafu, MetadataSnafu, NoSourceSnafu, PromoteSnafu, StagingError,
    TimeoutSnafu, VanishedSnafu,
};
use crate::types::Version;

use super::RELEASES_DIR;

/// A staged, immutable release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    pub version: Version,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Outcome of staging a version.
#[derive(Debug, Clone)]
pub struct Staged {
    pub release: Release,
    /// False when the release directory already existed and was reused.
    pub fresh: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("failed to read releases directory {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("failed to read release metadata {}: {source}", .path.display())]
    Metadata { path: PathBuf, source: io::Error },
}

/// Manages `<app_path>/releases`.
#[derive(Debug, Clone)]
pub struct ReleaseStore {
    releases_dir: PathBuf,
}

impl ReleaseStore {
    pub fn new(app_path: &Path) -> Self {
        Self {
            releases_dir: app_path.join(RELEASES_DIR),
        }
    }

    pub fn releases_dir(&self) -> &Path {
        &self.releases_dir
    }

    /// Directory a version is (or would be) staged into.
    pub fn path_for(&self, version: &Version) -> PathBuf {
        self.releases_dir.join(version.as_str())
    }

    pub fn exists(&self, version: &Version) -> bool {
        self.path_for(version).is_dir()
    }

    /// Look up a single staged release.
    pub fn release(&self, version: &Version) -> Result<Option<Release>, ReleaseError> {
        let path = self.path_for(version);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => Ok(Some(Release {
                version: version.clone(),
                created_at: created_at(&meta),
                path,
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ReleaseError::Metadata { path, source }),
        }
    }

    /// All staged releases, newest first.
    ///
    /// Hidden entries, plain files, symlinks, and directories whose names are
    /// not valid versions are ignored. A missing releases directory yields an
    /// empty list.
    pub fn list(&self) -> Result<Vec<Release>, ReleaseError> {
        let entries = match fs::read_dir(&self.releases_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ReleaseError::ReadDir {
                    path: self.releases_dir.clone(),
                    source,
                });
            }
        };

        let mut releases = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ReleaseError::ReadDir {
                path: self.releases_dir.clone(),
                source,
            })?;

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            let file_type = entry.file_type().map_err(|source| ReleaseError::Metadata {
                path: entry.path(),
                source,
            })?;
            if !file_type.is_dir() {
                continue;
            }

            let version = match Version::new(name) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!("Ignoring release directory {}: {}", name, e);
                    continue;
                }
            };

            let meta = entry.metadata().map_err(|source| ReleaseError::Metadata {
                path: entry.path(),
                source,
            })?;

            releases.push(Release {
                version,
                path: entry.path(),
                created_at: created_at(&meta),
            });
        }

        releases.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.version.cmp(&a.version))
        });

        Ok(releases)
    }

    /// Stage a version, reusing an existing release directory if present.
    ///
    /// On a fresh stage `stager` fills a hidden scratch directory within
    /// `timeout`, which is renamed to the release directory only once the
    /// fetch succeeded. A failed or timed out fetch never leaves anything
    /// that `exists`, `release` or `list` would report.
    pub async fn stage<A: ArtifactStager + ?Sized>(
        &self,
        version: &Version,
        source: Option<&str>,
        stager: &A,
        timeout: Duration,
    ) -> Result<Staged, StagingError> {
        if let Some(release) = self.release(version).context(MetadataSnafu)? {
            tracing::info!("Release {} already staged, reusing", version);
            return Ok(Staged {
                release,
                fresh: false,
            });
        }

        let source = source.ok_or_else(|| {
            NoSourceSnafu {
                version: version.clone(),
            }
            .build()
        })?;

        fs::create_dir_all(&self.releases_dir).context(CreateDirSnafu {
            path: self.releases_dir.clone(),
        })?;

        let scratch = self.scratch_path(version);
        fs::create_dir(&scratch).context(CreateDirSnafu {
            path: scratch.clone(),
        })?;

        tracing::info!("Staging {} from {}", version, source);
        let fetched =
            match tokio::time::timeout(timeout, stager.fetch(version, source, &scratch)).await {
                Ok(result) => result,
                Err(_elapsed) => TimeoutSnafu { timeout }.fail(),
            };

        if let Err(e) = fetched {
            discard_scratch(&scratch);
            return Err(e);
        }

        let dir = self.path_for(version);
        if let Err(source) = fs::rename(&scratch, &dir) {
            discard_scratch(&scratch);
            return Err(source).context(PromoteSnafu { path: dir });
        }

        let Some(release) = self.release(version).context(MetadataSnafu)? else {
            return VanishedSnafu { path: dir }.fail();
        };

        Ok(Staged {
            release,
            fresh: true,
        })
    }

    /// Unique hidden directory a fetch writes into before promotion.
    fn scratch_path(&self, version: &Version) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        self.releases_dir.join(format!(
            ".{}.partial.{}.{}",
            version,
            std::process::id(),
            nanos
        ))
    }

    /// Delete a release directory.
    pub fn remove(&self, release: &Release) -> io::Result<()> {
        fs::remove_dir_all(&release.path)
    }
}

fn discard_scratch(scratch: &Path) {
    if let Err(e) = fs::remove_dir_all(scratch)
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(
            "Failed to remove partially staged release {}: {}",
            scratch.display(),
            e
        );
    }
}

fn created_at(meta: &fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
