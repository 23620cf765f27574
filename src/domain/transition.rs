use crate::domain::version::Version;
use std::fmt;

/// A version change produced by one increment step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTransition {
    pub previous: Version,
    pub version: Version,
}

impl VersionTransition {
    pub fn new(previous: Version, version: Version) -> Self {
        VersionTransition { previous, version }
    }
}

impl fmt::Display for VersionTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.previous, self.version)
    }
}
