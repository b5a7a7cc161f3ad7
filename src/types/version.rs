// ABOUTME: Opaque release version identifier.
// ABOUTME: Validated so a version can always be used as a single directory name.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MAX_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version cannot be empty")]
    Empty,

    #[error("version exceeds maximum length of 128 characters")]
    TooLong,

    #[error("version cannot start with '.'")]
    LeadingDot,

    #[error("invalid character in version: '{0}'")]
    InvalidChar(char),
}

/// A release version.
///
/// Versions are opaque: they are compared for equality only and never
/// parsed as semver. Ordering of releases comes from the release store,
/// not from the version string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(value: &str) -> Result<Self, VersionError> {
        if value.is_empty() {
            return Err(VersionError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(VersionError::TooLong);
        }

        // Also rules out "." and ".."
        if value.starts_with('.') {
            return Err(VersionError::LeadingDot);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '.' | '_' | '-' | '+') {
                return Err(VersionError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::new(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Version::new(&value).map_err(serde::de::Error::custom)
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_release_style_versions() {
        for v in ["v1", "1.2.3", "2024-06-01_build.7", "1.0.0+sha.abc"] {
            assert!(Version::new(v).is_ok(), "{v} should be valid");
        }
    }

    #[test]
    fn rejects_traversal() {
        assert_eq!(Version::new(".."), Err(VersionError::LeadingDot));
        assert_eq!(Version::new("."), Err(VersionError::LeadingDot));
        assert_eq!(Version::new("../v1"), Err(VersionError::LeadingDot));
        assert_eq!(Version::new("v1/../x"), Err(VersionError::InvalidChar('/')));
    }

    #[test]
    fn rejects_whitespace() {
        assert_eq!(Version::new("v 1"), Err(VersionError::InvalidChar(' ')));
    }

    #[test]
    fn compares_with_str() {
        assert_eq!(Version::new("v2").unwrap(), "v2");
    }
}
