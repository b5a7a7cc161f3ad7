// ABOUTME: HTTP health check configuration.
// ABOUTME: An absent URL disables health checking entirely.

use serde::Deserialize;
use std::time::Duration;

use super::deserialize::{deserialize_duration, deserialize_optional_string};

#[derive(Debug, Clone, Deserialize)]
pub struct HealthcheckConfig {
    #[serde(
        default,
        rename = "health_check_url",
        deserialize_with = "deserialize_optional_string"
    )]
    pub url: Option<String>,

    #[serde(
        default = "default_timeout",
        rename = "health_check_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub timeout: Duration,

    #[serde(default = "default_interval", deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,

    #[serde(
        default = "default_request_timeout",
        rename = "health_check_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    crate::health::DEFAULT_REQUEST_TIMEOUT
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        HealthcheckConfig {
            url: None,
            timeout: default_timeout(),
            poll_interval: default_interval(),
            request_timeout: default_request_timeout(),
        }
    }
}
