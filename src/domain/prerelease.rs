//! Pre-release labels for semantic versions
//!
//! A label is a dot-separated list of identifiers such as `SNAPSHOT`, `rc.1` or
//! `beta.2.hotfix`, following https://semver.org/#spec-item-9.

use crate::error::{ReleaseError, Result};
use std::fmt;
use std::str::FromStr;

/// Validated pre-release label
///
/// Precedence follows `semver::Prerelease`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    label: semver::Prerelease,
}

impl PreRelease {
    /// Parse a pre-release label from a string
    ///
    /// Accepts formats like "SNAPSHOT", "beta.1", "rc.2" or "custom-id.5".
    /// Identifiers must be non-empty, alphanumeric or hyphen, and numeric
    /// identifiers must not carry leading zeros.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(ReleaseError::version("Empty pre-release identifier"));
        }

        let label = semver::Prerelease::new(s).map_err(|e| {
            ReleaseError::version(format!("Invalid pre-release label '{}': {}", s, e))
        })?;
        Ok(PreRelease { label })
    }

    /// Identifiers making up this label
    pub fn identifiers(&self) -> Vec<&str> {
        self.label.as_str().split('.').collect()
    }

    /// Next label in sequence
    ///
    /// Increments a trailing numeric identifier, or appends `.1` when the label
    /// does not end in a number (`SNAPSHOT` -> `SNAPSHOT.1`, `rc.1` -> `rc.2`).
    pub fn increment(&self) -> Result<Self> {
        let mut identifiers = self.identifiers();
        let last = identifiers.pop().unwrap_or_default();

        let bumped = if is_numeric(last) {
            let next = last
                .parse::<u64>()
                .ok()
                .and_then(|n| n.checked_add(1))
                .ok_or_else(|| {
                    ReleaseError::version(format!("Pre-release label '{}' overflows", self))
                })?;
            next.to_string()
        } else {
            format!("{}.1", last)
        };

        if identifiers.is_empty() {
            PreRelease::parse(&bumped)
        } else {
            PreRelease::parse(&format!("{}.{}", identifiers.join("."), bumped))
        }
    }
}

fn is_numeric(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.chars().all(|c| c.is_ascii_digit())
}

impl FromStr for PreRelease {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        PreRelease::parse(s)
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}
