// ABOUTME: Number of releases to retain on disk.
// ABOUTME: Always at least one so the newest release is never pruned.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("keep_versions must be at least 1")]
pub struct KeepCountError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeepCount(NonZeroUsize);

impl KeepCount {
    pub fn new(value: usize) -> Result<Self, KeepCountError> {
        NonZeroUsize::new(value).map(Self).ok_or(KeepCountError)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for KeepCount {
    fn default() -> Self {
        Self(NonZeroUsize::MIN.saturating_add(4))
    }
}

impl fmt::Display for KeepCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for KeepCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = usize::deserialize(deserializer)?;
        KeepCount::new(value).map_err(serde::de::Error::custom)
    }
}
