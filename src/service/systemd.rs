// ABOUTME: systemctl-backed service controller.
// ABOUTME: Restarts units and checks `systemctl is-active`.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{RestartError, ServiceController};

#[derive(Debug, Clone)]
pub struct SystemctlController {
    program: String,
    user: bool,
}

impl SystemctlController {
    pub fn new() -> Self {
        Self {
            program: "systemctl".to_string(),
            user: false,
        }
    }

    /// Manage units of the calling user's service manager (`systemctl --user`).
    pub fn user(mut self, user: bool) -> Self {
        self.user = user;
        self
    }

    /// Use a different binary in place of `systemctl`.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, action: &str, service: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        if self.user {
            cmd.arg("--user");
        }
        cmd.arg(action)
            .arg(service)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for SystemctlController {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceController for SystemctlController {
    async fn restart(&self, service: &str) -> Result<(), RestartError> {
        tracing::info!("Restarting {}", service);

        let output = self
            .command("restart", service)
            .output()
            .await
            .map_err(|source| RestartError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RestartError::Failed {
                service: service.to_string(),
                message: if stderr.is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }

        Ok(())
    }

    async fn is_active(&self, service: &str) -> bool {
        match self.command("is-active", service).output().await {
            Ok(output) => output.status.success(),
            Err(e) => {
                tracing::warn!("Failed to query {} state: {}", service, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_reports_spawn_error() {
        let controller = SystemctlController::new().program("/nonexistent/systemctl");
        let err = controller.restart("app").await.unwrap_err();
        assert!(matches!(err, RestartError::Spawn { .. }));
        assert!(!controller.is_active("app").await);
    }

    #[tokio::test]
    async fn non_zero_exit_is_restart_failure() {
        let controller = SystemctlController::new().program("false");
        let err = controller.restart("app").await.unwrap_err();
        assert!(matches!(err, RestartError::Failed { .. }));
    }

    #[tokio::test]
    async fn zero_exit_is_active() {
        let controller = SystemctlController::new().program("true");
        controller.restart("app").await.unwrap();
        assert!(controller.is_active("app").await);
    }
}
