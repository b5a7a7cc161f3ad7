// ABOUTME: Artifact staging interface: fill a release directory from a source.
// ABOUTME: Errors use the SNAFU pattern so call sites attach path/URL context.

mod command;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use snafu::Snafu;

use crate::release::ReleaseError;
use crate::types::Version;

pub use command::CommandStager;

/// Fetches a release artifact and extracts it into a destination directory.
///
/// The destination already exists and is empty when `fetch` is called. On
/// error or timeout the caller removes it, so implementations need not clean
/// up. Work a dropped `fetch` future started must stop promptly.
#[async_trait]
pub trait ArtifactStager: Send + Sync {
    async fn fetch(&self, version: &Version, source: &str, dest: &Path)
    -> Result<(), StagingError>;
}

#[async_trait]
impl<A: ArtifactStager + ?Sized> ArtifactStager for &A {
    async fn fetch(
        &self,
        version: &Version,
        source: &str,
        dest: &Path,
    ) -> Result<(), StagingError> {
        (**self).fetch(version, source, dest).await
    }
}

/// Artifact fetch/extract failed before anything was switched.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StagingError {
    #[snafu(display("no artifact source given and release {version} is not staged"))]
    NoSource { version: Version },

    #[snafu(display("failed to create {}: {source}", path.display()))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to inspect release: {source}"))]
    Metadata { source: ReleaseError },

    #[snafu(display("failed to move staged release into {}: {source}", path.display()))]
    Promote {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("release directory {} vanished during staging", path.display()))]
    Vanished { path: PathBuf },

    #[snafu(display("artifact source not found: {}", path.display()))]
    SourceMissing { path: PathBuf },

    #[snafu(display("failed to run {program}: {source}"))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("failed to download {url}: {message}"))]
    Download { url: String, message: String },

    #[snafu(display("failed to extract {}: {message}", archive.display()))]
    Extract { archive: PathBuf, message: String },

    #[snafu(display("failed to copy {}: {source}", path.display()))]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("staging timed out after {timeout:?}"))]
    Timeout { timeout: Duration },

    #[snafu(display("{message}"))]
    Stager { message: String },
}
