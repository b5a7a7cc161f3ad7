// ABOUTME: Service controller interface for restarting the serving process.
// ABOUTME: The default implementation drives systemd through systemctl.

mod systemd;

use std::time::Duration;

use async_trait::async_trait;

pub use systemd::SystemctlController;

/// Which service to restart after a switch, and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub name: String,
    /// Bound on the restart command and on the activity check.
    pub restart_timeout: Duration,
    /// Pause between the restart and the activity check.
    pub settle: Duration,
}

/// Restarts and queries an OS-level service.
#[async_trait]
pub trait ServiceController: Send + Sync {
    /// Restart the service. Returns once the restart command has completed.
    async fn restart(&self, service: &str) -> Result<(), RestartError>;

    /// Whether the service is currently active.
    async fn is_active(&self, service: &str) -> bool;
}

#[async_trait]
impl<C: ServiceController + ?Sized> ServiceController for &C {
    async fn restart(&self, service: &str) -> Result<(), RestartError> {
        (**self).restart(service).await
    }

    async fn is_active(&self, service: &str) -> bool {
        (**self).is_active(service).await
    }
}

/// The service failed to restart or to become active.
#[derive(Debug, thiserror::Error)]
pub enum RestartError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("restart of {service} failed: {message}")]
    Failed { service: String, message: String },

    #[error("restart of {service} timed out after {seconds} seconds")]
    Timeout { service: String, seconds: u64 },

    #[error("{service} is not active after restart")]
    NotActive { service: String },
}

/// Restart a service and confirm it came up.
///
/// The restart and the `is_active` query are each bounded by
/// `restart_timeout`; a query that times out counts as inactive.
pub async fn restart_and_confirm<C: ServiceController + ?Sized>(
    controller: &C,
    settings: &ServiceSettings,
) -> Result<(), RestartError> {
    let service = settings.name.as_str();

    match tokio::time::timeout(settings.restart_timeout, controller.restart(service)).await {
        Ok(result) => result?,
        Err(_elapsed) => {
            return Err(RestartError::Timeout {
                service: service.to_string(),
                seconds: settings.restart_timeout.as_secs(),
            });
        }
    }

    if !settings.settle.is_zero() {
        tokio::time::sleep(settings.settle).await;
    }

    let active = tokio::time::timeout(settings.restart_timeout, controller.is_active(service))
        .await
        .unwrap_or(false);

    if !active {
        return Err(RestartError::NotActive {
            service: service.to_string(),
        });
    }

    tracing::info!("{} is active", service);
    Ok(())
}
