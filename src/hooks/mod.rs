// ABOUTME: Hooks system for deployment lifecycle events.
// ABOUTME: Discovers and executes scripts at pre-deploy, post-deploy, and on-error points.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::deploy::Outcome;
use crate::types::{AppName, Version};

/// Upper bound on a single hook run.
pub const HOOK_TIMEOUT: Duration = Duration::from_secs(300);

/// Hook execution points in the deployment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before anything is staged or switched. Failure aborts deployment.
    PreDeploy,
    /// After a successful deployment. Failure logs warning.
    PostDeploy,
    /// After a failed or rolled-back deployment. Failure logs warning.
    OnError,
}

impl HookPoint {
    /// Get the hook filename for this point.
    pub fn filename(&self) -> &'static str {
        match self {
            HookPoint::PreDeploy => "pre-deploy",
            HookPoint::PostDeploy => "post-deploy",
            HookPoint::OnError => "on-error",
        }
    }

    /// Whether failure at this hook point should abort deployment.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HookPoint::PreDeploy)
    }
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub app: AppName,
    pub version: Version,
    pub app_path: PathBuf,
    pub previous_version: Option<Version>,
    /// Set once the deployment has finished.
    pub outcome: Option<Outcome>,
}

impl HookContext {
    pub fn new(app: &AppName, version: &Version, app_path: &Path) -> Self {
        Self {
            app: app.clone(),
            version: version.clone(),
            app_path: app_path.to_path_buf(),
            previous_version: None,
            outcome: None,
        }
    }

    pub fn previous_version(mut self, previous: Option<Version>) -> Self {
        self.previous_version = previous;
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Convert context to environment variables.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("RELEASEKIT_APP".to_string(), self.app.to_string());
        env.insert("RELEASEKIT_VERSION".to_string(), self.version.to_string());
        env.insert(
            "RELEASEKIT_APP_PATH".to_string(),
            self.app_path.display().to_string(),
        );
        if let Some(ref prev) = self.previous_version {
            env.insert("RELEASEKIT_PREVIOUS_VERSION".to_string(), prev.to_string());
        }
        if let Some(outcome) = self.outcome {
            env.insert("RELEASEKIT_OUTCOME".to_string(), outcome.to_string());
        }
        env
    }
}

/// Result of running a hook.
#[derive(Debug)]
pub struct HookResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Discovers and runs hooks from `<app_path>/hooks`.
pub struct HookRunner {
    hooks_dir: PathBuf,
    timeout: Duration,
}

impl HookRunner {
    /// Create a new hook runner for the given application directory.
    pub fn new(app_path: &Path) -> Self {
        Self {
            hooks_dir: app_path.join("hooks"),
            timeout: HOOK_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the path to a hook script.
    fn hook_path(&self, point: HookPoint) -> PathBuf {
        self.hooks_dir.join(point.filename())
    }

    /// Run a hook if it exists.
    ///
    /// Returns None if the hook doesn't exist, or Some(HookResult) if it was run.
    /// A hook that outlives the timeout is killed and reported as failed.
    pub async fn run(&self, point: HookPoint, context: &HookContext) -> Option<HookResult> {
        let hook_path = self.hook_path(point);

        if !hook_path.is_file() {
            return None;
        }

        tracing::info!("Running {} hook: {}", point.filename(), hook_path.display());

        let env_vars = context.to_env();

        let output = Command::new(&hook_path)
            .envs(&env_vars)
            .current_dir(&context.app_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => {
                let result = HookResult {
                    success: output.status.success(),
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if result.success {
                    tracing::info!("{} hook completed successfully", point.filename());
                } else {
                    tracing::warn!(
                        "{} hook failed with exit code {:?}",
                        point.filename(),
                        result.exit_code
                    );
                }

                Some(result)
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to execute {} hook: {}", point.filename(), e);
                Some(HookResult {
                    success: false,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: e.to_string(),
                })
            }
            Err(_elapsed) => {
                tracing::error!(
                    "{} hook timed out after {}s",
                    point.filename(),
                    self.timeout.as_secs()
                );
                Some(HookResult {
                    success: false,
                    exit_code: None,
                    stdout: String::new(),
                    stderr: format!("timed out after {}s", self.timeout.as_secs()),
                })
            }
        }
    }
}
