// ABOUTME: Stager backed by curl and tar, plus local directory copies.
// ABOUTME: Handles http(s) URLs, local archives, and local directories.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use snafu::ResultExt;
use tokio::process::Command;

use crate::types::Version;

use super::{
    ArtifactStager, CopySnafu, DownloadSnafu, ExtractSnafu, SourceMissingSnafu, SpawnSnafu,
    StagingError,
};

/// Scratch file name for downloaded archives inside the release directory.
const DOWNLOAD_NAME: &str = ".releasekit-artifact";

/// Stages artifacts using the system `curl` and `tar` binaries.
///
/// Sources are interpreted as:
/// - `http://` / `https://` URLs: downloaded with curl, then extracted.
/// - local directories (optionally `file://`): copied recursively.
/// - any other local file: extracted with tar (compression auto-detected).
#[derive(Debug, Clone)]
pub struct CommandStager {
    strip_components: u32,
}

impl CommandStager {
    pub fn new(strip_components: u32) -> Self {
        Self { strip_components }
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf, StagingError> {
        let archive = dest.join(DOWNLOAD_NAME);
        let output = run(
            Command::new("curl")
                .arg("-fsSL")
                .arg("--output")
                .arg(&archive)
                .arg(url),
            "curl",
        )
        .await?;

        if !output.status.success() {
            return DownloadSnafu {
                url,
                message: stderr_message(&output),
            }
            .fail();
        }

        Ok(archive)
    }

    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), StagingError> {
        let output = run(
            Command::new("tar")
                .arg("-xf")
                .arg(archive)
                .arg("-C")
                .arg(dest)
                .arg(format!("--strip-components={}", self.strip_components)),
            "tar",
        )
        .await?;

        if !output.status.success() {
            return ExtractSnafu {
                archive,
                message: stderr_message(&output),
            }
            .fail();
        }

        Ok(())
    }
}

impl Default for CommandStager {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl ArtifactStager for CommandStager {
    async fn fetch(
        &self,
        version: &Version,
        source: &str,
        dest: &Path,
    ) -> Result<(), StagingError> {
        tracing::debug!("Fetching {} from {}", version, source);

        if source.starts_with("http://") || source.starts_with("https://") {
            let archive = self.download(source, dest).await?;
            self.extract(&archive, dest).await?;
            if let Err(e) = fs::remove_file(&archive) {
                tracing::warn!("Failed to remove downloaded archive: {}", e);
            }
            return Ok(());
        }

        let path = PathBuf::from(source.strip_prefix("file://").unwrap_or(source));
        if !path.exists() {
            return SourceMissingSnafu { path }.fail();
        }

        if path.is_dir() {
            let to = dest.to_path_buf();
            let from = path.clone();
            let cancelled = Arc::new(AtomicBool::new(false));
            let _guard = CancelOnDrop(cancelled.clone());
            return tokio::task::spawn_blocking(move || copy_dir(&from, &to, &cancelled))
                .await
                .map_err(io::Error::other)
                .and_then(|r| r)
                .context(CopySnafu { path });
        }

        self.extract(&path, dest).await
    }
}

async fn run(command: &mut Command, program: &str) -> Result<Output, StagingError> {
    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .context(SpawnSnafu { program })
}

fn stderr_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    }
}

/// Sets its flag when dropped, which happens when the fetch future is
/// abandoned (for example on a staging timeout).
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Copy `from` into the existing directory `to`, stopping once `cancelled`
/// is set. Directories are created one level at a time so a copy whose
/// destination was removed underneath it fails instead of recreating it.
fn copy_dir(from: &Path, to: &Path, cancelled: &AtomicBool) -> io::Result<()> {
    for entry in fs::read_dir(from)? {
        if cancelled.load(Ordering::Relaxed) {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "copy cancelled"));
        }

        let entry = entry?;
        let target = to.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            fs::create_dir(&target)?;
            copy_dir(&entry.path(), &target, cancelled)?;
        } else if file_type.is_symlink() {
            symlink(fs::read_link(entry.path())?, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
