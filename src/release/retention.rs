// ABOUTME: Retention policy for staged releases.
// ABOUTME: Keeps the newest N releases plus the active one; removal is best effort.

use serde::Serialize;

use crate::types::{KeepCount, Version};

use super::store::{Release, ReleaseError, ReleaseStore};

/// A release that could not be removed.
#[derive(Debug, Clone, Serialize)]
pub struct PruneFailure {
    pub version: Version,
    pub error: String,
}

/// What a prune pass did.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PruneReport {
    pub kept: Vec<Version>,
    pub removed: Vec<Version>,
    pub failed: Vec<PruneFailure>,
}

impl PruneReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Split releases (newest first) into those to keep and those to delete.
///
/// The first `keep` entries are kept. `protected` is kept wherever it ranks.
pub fn plan_prune<'a>(
    releases: &'a [Release],
    keep: KeepCount,
    protected: Option<&Version>,
) -> (Vec<&'a Release>, Vec<&'a Release>) {
    let mut kept = Vec::new();
    let mut doomed = Vec::new();

    for (rank, release) in releases.iter().enumerate() {
        if rank < keep.get() || Some(&release.version) == protected {
            kept.push(release);
        } else {
            doomed.push(release);
        }
    }

    (kept, doomed)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionPolicy {
    keep: KeepCount,
}

impl RetentionPolicy {
    pub fn new(keep: KeepCount) -> Self {
        Self { keep }
    }

    pub fn keep(&self) -> KeepCount {
        self.keep
    }

    /// Delete releases beyond the newest `keep`, never touching `protected`.
    ///
    /// Individual deletion failures are recorded in the report rather than
    /// returned as errors. Only a failure to list the store is an error.
    pub fn prune(
        &self,
        store: &ReleaseStore,
        protected: Option<&Version>,
    ) -> Result<PruneReport, ReleaseError> {
        let releases = store.list()?;
        let (kept, doomed) = plan_prune(&releases, self.keep, protected);

        let mut report = PruneReport {
            kept: kept.iter().map(|r| r.version.clone()).collect(),
            ..Default::default()
        };

        for release in doomed {
            match store.remove(release) {
                Ok(()) => {
                    tracing::info!("Pruned release {}", release.version);
                    report.removed.push(release.version.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to prune release {}: {}", release.version, e);
                    report.failed.push(PruneFailure {
                        version: release.version.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
