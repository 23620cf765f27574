//! Reads and writes the version property in a `key = value` properties file.
//!
//! Rewrites only ever touch the value portion of matching lines; comments, blank
//! lines, ordering, spacing and line endings are preserved byte for byte.

use crate::domain::{Version, VersionTransition};
use crate::error::{ReleaseError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Loads the value of `property_name` from a properties file.
///
/// Blank lines and `#` comments are skipped; the first `=` on a line separates
/// key from value and both are trimmed.
///
/// # Returns
/// * `Ok(Some(value))` - value of the first matching line
/// * `Ok(None)` - no line defines the property
/// * `Err` - the file cannot be read
pub fn load_property(property_name: &str, file: &Path) -> Result<Option<String>> {
    let content = fs::read_to_string(file)?;

    let value = content
        .lines()
        .filter(|line| !is_non_property_line(line))
        .filter_map(|line| line.split_once('='))
        .find(|(key, _)| key.trim() == property_name)
        .map(|(_, value)| value.trim().to_string());

    Ok(value)
}

/// Replaces the value of `property_name` in place.
///
/// Returns `true` if at least one line matched. When nothing matches the file
/// is left untouched.
pub fn store_property(property_name: &str, value: &str, file: &Path) -> Result<bool> {
    let content = fs::read_to_string(file)?;
    let mut matched = false;
    let mut rewritten = String::with_capacity(content.len() + value.len());

    for segment in content.split_inclusive('\n') {
        let (body, terminator) = split_terminator(segment);
        match replace_value(body, property_name, value) {
            Some(line) => {
                matched = true;
                rewritten.push_str(&line);
                rewritten.push_str(terminator);
            }
            None => rewritten.push_str(segment),
        }
    }

    if matched {
        fs::write(file, rewritten)?;
    }
    Ok(matched)
}

fn is_non_property_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn split_terminator(segment: &str) -> (&str, &str) {
    if let Some(body) = segment.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = segment.strip_suffix('\n') {
        (body, "\n")
    } else {
        (segment, "")
    }
}

fn replace_value(line: &str, property_name: &str, value: &str) -> Option<String> {
    if is_non_property_line(line) {
        return None;
    }
    let (key, old_value) = line.split_once('=')?;
    if key.trim() != property_name {
        return None;
    }

    let leading = &old_value[..old_value.len() - old_value.trim_start().len()];
    let trailing = &old_value[old_value.trim_end().len()..];
    let trailing = if old_value.trim().is_empty() { "" } else { trailing };

    Some(format!("{}={}{}{}", key, leading, value, trailing))
}

/// The properties file and key holding the project version
#[derive(Debug, Clone, PartialEq)]
pub struct VersionFile {
    pub path: PathBuf,
    pub property: String,
}

impl VersionFile {
    pub fn new(path: impl Into<PathBuf>, property: impl Into<String>) -> Self {
        VersionFile {
            path: path.into(),
            property: property.into(),
        }
    }

    /// Current version, or `None` if the property is not set
    pub fn load_version(&self) -> Result<Option<Version>> {
        load_property(&self.property, &self.path)?
            .map(|text| Version::parse(&text))
            .transpose()
    }

    /// Persists `version`; warns when the property line does not exist
    pub fn store_version(&self, version: &Version) -> Result<()> {
        let stored = store_property(&self.property, &version.to_string(), &self.path)?;
        if !stored {
            warn!(
                "Property '{}' not found in {}; version {} was not persisted",
                self.property,
                self.path.display(),
                version
            );
        }
        Ok(())
    }

    /// Loads the current version (or `default_version`), applies `incrementer`
    /// and persists the result.
    pub fn increment<F>(&self, default_version: &Version, incrementer: F) -> Result<VersionTransition>
    where
        F: FnOnce(&Version) -> Result<Version>,
    {
        let current = self
            .load_version()?
            .unwrap_or_else(|| default_version.clone());
        let next = incrementer(&current)?;

        info!("Incremented version from {} to {}", current, next);
        self.store_version(&next)?;

        Ok(VersionTransition::new(current, next))
    }
}

/// Sets the current version explicitly; the version must be a pre-release.
pub fn set_current_version(
    file: &VersionFile,
    version: &Version,
    default_version: &Version,
) -> Result<VersionTransition> {
    if !version.is_pre_release() {
        return Err(ReleaseError::config(format!(
            "New version must be pre-release: {}",
            version
        )));
    }
    file.increment(default_version, |_| Ok(version.clone()))
}
