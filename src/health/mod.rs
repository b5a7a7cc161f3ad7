// ABOUTME: Post-restart health checking with bounded polling.
// ABOUTME: Individual probe failures are retried until the overall timeout elapses.

mod http;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;

pub use http::HttpProbe;
pub(crate) use http::parse_url;

/// Default bound on a single probe request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A single health probe request.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, url: &str) -> Result<(), ProbeError>;
}

#[async_trait]
impl<P: Probe + ?Sized> Probe for &P {
    async fn check(&self, url: &str) -> Result<(), ProbeError> {
        (**self).check(url).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid health check URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("unsupported URL scheme in {0} (only http is supported)")]
    UnsupportedScheme(String),

    #[error("connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

/// Result of a health check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No health check URL configured.
    Skipped,
    Passed,
    /// No probe succeeded before the timeout.
    Failed,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Skipped => "skipped",
            HealthStatus::Passed => "passed",
            HealthStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Polls a probe until it succeeds or a deadline passes.
#[derive(Debug, Clone)]
pub struct HealthChecker<P> {
    probe: P,
    request_timeout: Duration,
}

impl<P: Probe> HealthChecker<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Bound each individual request (never beyond the overall deadline).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Probe `url` every `poll_interval` until healthy or `timeout` elapses.
    ///
    /// An absent or blank URL skips the check. At least one request is made
    /// otherwise. Neither requests nor sleeps run past the deadline, so this
    /// returns within `timeout` plus scheduling slack.
    pub async fn probe(
        &self,
        url: Option<&str>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> HealthStatus {
        let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
            tracing::info!("No health check URL configured, skipping health check");
            return HealthStatus::Skipped;
        };

        let deadline = Instant::now() + timeout;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let budget = self
                .request_timeout
                .min(deadline.saturating_duration_since(Instant::now()));

            match tokio::time::timeout(budget, self.probe.check(url)).await {
                Ok(Ok(())) => {
                    tracing::info!("Health check passed on attempt {}", attempt);
                    return HealthStatus::Passed;
                }
                Ok(Err(e)) => tracing::debug!("Health check attempt {} failed: {}", attempt, e),
                Err(_elapsed) => {
                    tracing::debug!("Health check attempt {} timed out", attempt)
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    "Health check for {} failed after {} attempts ({}s)",
                    url,
                    attempt,
                    timeout.as_secs()
                );
                return HealthStatus::Failed;
            }

            tokio::time::sleep(poll_interval.min(remaining)).await;
        }
    }
}
