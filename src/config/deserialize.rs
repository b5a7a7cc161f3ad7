// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles application names and durations given as seconds or humantime.

use serde::Deserialize;
use std::time::Duration;

use crate::types::AppName;

pub fn deserialize_app_name<'de, D>(deserializer: D) -> Result<AppName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    AppName::new(&s).map_err(serde::de::Error::custom)
}

/// Accept `300` (seconds) as well as `"5m"` / `"300s"`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    DurationEntry::deserialize(deserializer).map(DurationEntry::into_duration)
}

pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationEntry {
    Seconds(u64),
    Human(#[serde(with = "humantime_serde")] Duration),
}

impl DurationEntry {
    fn into_duration(self) -> Duration {
        match self {
            DurationEntry::Seconds(s) => Duration::from_secs(s),
            DurationEntry::Human(d) => d,
        }
    }
}
