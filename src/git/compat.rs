//! Guards against running with a git binary the release protocol cannot rely on.

use crate::error::{ReleaseError, Result};
use semver::Version;
use tracing::{info, warn};

/// Oldest git providing `git restore`, used by rollback
pub const MINIMUM_GIT_VERSION: Version = Version::new(2, 23, 0);

/// First git release that has not been tested against
pub const UNTESTED_GIT_VERSION: Version = Version::new(3, 0, 0);

/// Outcome of a successful compatibility check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Supported(Version),
    /// Newer than anything tested; the run continues with a warning
    Untested(Version),
}

/// Parse the output of `git version`
///
/// Tolerates vendor suffixes: `git version 2.39.2.windows.1`,
/// `git version 2.37.1 (Apple Git-137.1)`, `git version 2.43.0.rc1`.
pub fn parse_git_version(output: &str) -> Result<Version> {
    let unparseable = || ReleaseError::config(format!("Unable to parse git version from '{}'", output.trim()));

    let token = output
        .split_whitespace()
        .find(|word| word.starts_with(|c: char| c.is_ascii_digit()))
        .ok_or_else(unparseable)?;

    let numbers: Vec<u64> = token
        .split('.')
        .take(3)
        .map_while(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u64>().ok()
        })
        .collect();

    match numbers.as_slice() {
        [major, minor, patch] => Ok(Version::new(*major, *minor, *patch)),
        [major, minor] => Ok(Version::new(*major, *minor, 0)),
        _ => Err(unparseable()),
    }
}

/// Check `git version` output against the supported range
pub fn check_git_version(output: &str) -> Result<Compatibility> {
    let version = parse_git_version(output)?;

    if version < MINIMUM_GIT_VERSION {
        return Err(ReleaseError::config(format!(
            "git {} is not supported; version {} or newer is required",
            version, MINIMUM_GIT_VERSION
        )));
    }

    if version >= UNTESTED_GIT_VERSION {
        warn!(
            "git {} is not formally supported (tested below {})",
            version, UNTESTED_GIT_VERSION
        );
        return Ok(Compatibility::Untested(version));
    }

    info!("Git version: {}", version);
    Ok(Compatibility::Supported(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_version() {
        assert_eq!(
            parse_git_version("git version 2.39.2\n").unwrap(),
            Version::new(2, 39, 2)
        );
    }

    #[test]
    fn test_parse_vendor_suffixes() {
        assert_eq!(
            parse_git_version("git version 2.39.2.windows.1").unwrap(),
            Version::new(2, 39, 2)
        );
        assert_eq!(
            parse_git_version("git version 2.37.1 (Apple Git-137.1)").unwrap(),
            Version::new(2, 37, 1)
        );
        assert_eq!(
            parse_git_version("git version 2.43.0.rc1").unwrap(),
            Version::new(2, 43, 0)
        );
        assert_eq!(
            parse_git_version("git version 2.45").unwrap(),
            Version::new(2, 45, 0)
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_git_version("").is_err());
        assert!(parse_git_version("command not found").is_err());
    }

    #[test]
    fn test_too_old_is_error() {
        let err = check_git_version("git version 2.17.1").unwrap_err();
        assert!(err.to_string().contains("2.23.0 or newer"));
    }

    #[test]
    fn test_supported_range() {
        assert_eq!(
            check_git_version("git version 2.23.0").unwrap(),
            Compatibility::Supported(Version::new(2, 23, 0))
        );
        assert_eq!(
            check_git_version("git version 2.47.1").unwrap(),
            Compatibility::Supported(Version::new(2, 47, 1))
        );
    }

    #[test]
    fn test_newer_than_tested_warns() {
        assert_eq!(
            check_git_version("git version 3.1.0").unwrap(),
            Compatibility::Untested(Version::new(3, 1, 0))
        );
    }
}
