// ABOUTME: Configuration types and parsing for releasekit.yml.
// ABOUTME: Handles YAML parsing, defaults, validation, and CLI overrides.

mod deserialize;
mod healthcheck;
mod init;

pub use healthcheck::HealthcheckConfig;
pub use init::init_config;

use crate::deploy::DeployOptions;
use crate::error::{Error, Result};
use crate::service::ServiceSettings;
use crate::types::{AppName, KeepCount, Version};
use deserialize::{deserialize_app_name, deserialize_duration, deserialize_optional_string};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "releasekit.yml";
pub const CONFIG_FILENAME_ALT: &str = "releasekit.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".releasekit/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_app_name")]
    pub app_name: AppName,

    pub app_path: PathBuf,

    #[serde(default, deserialize_with = "deserialize_version")]
    pub version: Option<Version>,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub artifact_source: Option<String>,

    #[serde(flatten)]
    pub healthcheck: HealthcheckConfig,

    #[serde(default = "default_rollback_on_failure")]
    pub rollback_on_failure: bool,

    #[serde(default)]
    pub keep_versions: KeepCount,

    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub service_name: Option<String>,

    /// Use `systemctl --user` instead of the system manager.
    #[serde(default)]
    pub systemd_user: bool,

    #[serde(
        default = "default_restart_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub restart_timeout: Duration,

    #[serde(
        default = "default_restart_settle",
        deserialize_with = "deserialize_duration"
    )]
    pub restart_settle: Duration,

    #[serde(
        default = "default_staging_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub staging_timeout: Duration,

    #[serde(default = "default_strip_components")]
    pub strip_components: u32,
}

fn default_rollback_on_failure() -> bool {
    true
}

fn default_restart_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_restart_settle() -> Duration {
    Duration::from_secs(5)
}

fn default_staging_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_strip_components() -> u32 {
    1
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A relative `app_path` is resolved against the
    /// directory containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;

        if config.app_path.is_relative() {
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            config.app_path = base.join(&config.app_path);
        }

        Ok(config)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.app_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("app_path cannot be empty".to_string()));
        }

        if let Some(url) = &self.healthcheck.url {
            crate::health::parse_url(url)
                .map_err(|e| Error::InvalidConfig(format!("health_check_url: {}", e)))?;
        }

        if self.healthcheck.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "poll_interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply command-line overrides for the target version and artifact.
    pub fn with_overrides(mut self, version: Option<Version>, artifact: Option<String>) -> Self {
        if version.is_some() {
            self.version = version;
        }
        if artifact.is_some() {
            self.artifact_source = artifact;
        }
        self
    }

    /// Build orchestrator options. Requires a target version.
    pub fn deploy_options(&self) -> Result<DeployOptions> {
        let version = self.version.clone().ok_or(Error::MissingVersion)?;

        Ok(DeployOptions {
            app: self.app_name.clone(),
            version,
            artifact_source: self.artifact_source.clone(),
            healthcheck: self.healthcheck.clone(),
            rollback_on_failure: self.rollback_on_failure,
            keep_versions: self.keep_versions,
            service: self.service_settings(),
            staging_timeout: self.staging_timeout,
        })
    }

    /// Restart settings, or `None` when no service is configured.
    pub fn service_settings(&self) -> Option<ServiceSettings> {
        self.service_name.as_ref().map(|name| ServiceSettings {
            name: name.clone(),
            restart_timeout: self.restart_timeout,
            settle: self.restart_settle,
        })
    }

    pub fn template() -> Self {
        Config {
            app_name: AppName::new("my-app").expect("template app name is valid"),
            app_path: PathBuf::from("/opt/my-app"),
            version: None,
            artifact_source: None,
            healthcheck: HealthcheckConfig {
                url: Some("http://localhost:8080/health".to_string()),
                ..Default::default()
            },
            rollback_on_failure: default_rollback_on_failure(),
            keep_versions: KeepCount::default(),
            service_name: Some("my-app".to_string()),
            systemd_user: false,
            restart_timeout: default_restart_timeout(),
            restart_settle: default_restart_settle(),
            staging_timeout: default_staging_timeout(),
            strip_components: default_strip_components(),
        }
    }
}

/// Versions may be written unquoted (`version: 42`), but floats are
/// rejected since `1.10` would silently become `1.1`.
fn deserialize_version<'de, D>(deserializer: D) -> std::result::Result<Option<Version>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum VersionEntry {
        Text(String),
        Number(u64),
    }

    let entry: Option<VersionEntry> = Option::deserialize(deserializer)?;
    let text = match entry {
        None => return Ok(None),
        Some(VersionEntry::Text(s)) => s,
        Some(VersionEntry::Number(n)) => n.to_string(),
    };

    Version::new(&text).map(Some).map_err(serde::de::Error::custom)
}
