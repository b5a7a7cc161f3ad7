// ABOUTME: Per-run deployment options.
// ABOUTME: Built from Config plus command-line overrides.

use std::time::Duration;

use crate::config::HealthcheckConfig;
use crate::service::ServiceSettings;
use crate::types::{AppName, KeepCount, Version};

/// Everything one deployment run needs to know.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub app: AppName,
    pub version: Version,
    /// Where to fetch the artifact when the release is not yet staged.
    pub artifact_source: Option<String>,
    pub healthcheck: HealthcheckConfig,
    pub rollback_on_failure: bool,
    pub keep_versions: KeepCount,
    /// `None` skips the restart step.
    pub service: Option<ServiceSettings>,
    pub staging_timeout: Duration,
}

impl DeployOptions {
    /// Options with defaults for everything but the app and version.
    pub fn new(app: AppName, version: Version) -> Self {
        Self {
            app,
            version,
            artifact_source: None,
            healthcheck: HealthcheckConfig::default(),
            rollback_on_failure: true,
            keep_versions: KeepCount::default(),
            service: None,
            staging_timeout: Duration::from_secs(600),
        }
    }
}
