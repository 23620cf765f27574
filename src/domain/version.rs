use crate::domain::prerelease::PreRelease;
use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Semantic version representation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<PreRelease>,
}

impl Version {
    /// Create a new release version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Create a version carrying the given pre-release label
    pub fn with_pre_release(&self, label: Option<PreRelease>) -> Self {
        Version {
            pre: label,
            ..self.clone()
        }
    }

    /// Parse a version string such as "1.2.3" or "0.3.0-SNAPSHOT"
    ///
    /// Build metadata ("+build.5") is rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let parsed = semver::Version::parse(trimmed)
            .map_err(|e| ReleaseError::version(format!("'{}': {}", trimmed, e)))?;

        if !parsed.build.is_empty() {
            return Err(ReleaseError::version(format!(
                "'{}': build metadata is not supported",
                trimmed
            )));
        }

        let pre = if parsed.pre.is_empty() {
            None
        } else {
            Some(PreRelease::parse(parsed.pre.as_str())?)
        };

        Ok(Version {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre,
        })
    }

    /// Whether this version carries a pre-release label
    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some()
    }

    /// Next major version
    ///
    /// A pre-release sitting exactly on a major boundary (`2.0.0-SNAPSHOT`)
    /// finalises to that boundary when no label is given.
    pub fn next_major(&self, label: Option<PreRelease>) -> Result<Self> {
        let stays = self.is_pre_release() && self.minor == 0 && self.patch == 0 && label.is_none();
        Ok(Version {
            major: if stays { self.major } else { increment(self.major, "major", self)? },
            minor: 0,
            patch: 0,
            pre: label,
        })
    }

    /// Next minor version
    ///
    /// A pre-release sitting on a minor boundary (`1.3.0-SNAPSHOT`) finalises to
    /// that boundary when no label is given.
    pub fn next_minor(&self, label: Option<PreRelease>) -> Result<Self> {
        let stays = self.is_pre_release() && self.patch == 0 && label.is_none();
        Ok(Version {
            major: self.major,
            minor: if stays { self.minor } else { increment(self.minor, "minor", self)? },
            patch: 0,
            pre: label,
        })
    }

    /// Next patch version
    ///
    /// A pre-release finalises to its own numbers when no label is given
    /// (`0.3.0-SNAPSHOT` -> `0.3.0`).
    pub fn next_patch(&self, label: Option<PreRelease>) -> Result<Self> {
        let stays = self.is_pre_release() && label.is_none();
        Ok(Version {
            major: self.major,
            minor: self.minor,
            patch: if stays { self.patch } else { increment(self.patch, "patch", self)? },
            pre: label,
        })
    }

    /// Next pre-release version
    ///
    /// Increments the label of a pre-release; a release moves to the next patch
    /// carrying `label`.
    pub fn next_pre_release(&self, label: PreRelease) -> Result<Self> {
        match &self.pre {
            Some(pre) => Ok(self.with_pre_release(Some(pre.increment()?))),
            None => self.next_patch(Some(label)),
        }
    }

    /// Bump version according to bump type
    pub fn bump(&self, bump_type: VersionBump, label: Option<PreRelease>) -> Result<Self> {
        match bump_type {
            VersionBump::Major => self.next_major(label),
            VersionBump::Minor => self.next_minor(label),
            VersionBump::Patch => self.next_patch(label),
        }
    }
}

fn increment(value: u64, component: &str, version: &Version) -> Result<u64> {
    value.checked_add(1).ok_or_else(|| {
        ReleaseError::version(format!("Next {} version of {} overflows", component, version))
    })
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

/// Version segment to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    Major,
    Minor,
    #[default]
    Patch,
}

impl FromStr for VersionBump {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" => Ok(VersionBump::Major),
            "minor" => Ok(VersionBump::Minor),
            "patch" => Ok(VersionBump::Patch),
            other => Err(ReleaseError::config(format!(
                "Unknown version bump '{}'; expected one of major, minor, patch",
                other
            ))),
        }
    }
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionBump::Major => write!(f, "major"),
            VersionBump::Minor => write!(f, "minor"),
            VersionBump::Patch => write!(f, "patch"),
        }
    }
}
