//! Tamper detection for files generated from templates.
//!
//! After a template renders, the SHA-256 of the generated file is stored in a
//! `<template>.sha256` sidecar next to the template. Before the next render the
//! generated file is hashed again; a mismatch means someone edited the output by
//! hand and the release stops before anything is touched.

use crate::error::{ReleaseError, Result};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension of checksum sidecars
pub const CHECKSUM_EXTENSION: &str = "sha256";

/// Lowercase hex SHA-256 of `bytes`
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Lowercase hex SHA-256 of a file's content
pub fn digest_file(path: &Path) -> Result<String> {
    Ok(digest(&fs::read(path)?))
}

/// Computes and verifies checksum sidecars
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumGuard;

impl ChecksumGuard {
    pub fn new() -> Self {
        ChecksumGuard
    }

    /// `<template>.sha256`, alongside the template
    pub fn sidecar_path(template: &Path) -> PathBuf {
        let mut name = template
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".");
        name.push(CHECKSUM_EXTENSION);
        template.with_file_name(name)
    }

    /// Fails if `destination` no longer matches the checksum recorded for it
    ///
    /// Succeeds silently when no checksum has been recorded yet or the
    /// destination has not been generated.
    pub fn verify(&self, template: &Path, destination: &Path) -> Result<()> {
        let sidecar = Self::sidecar_path(template);
        if !sidecar.exists() || !destination.exists() {
            debug!(
                "No checksum to verify for {} (sidecar or output missing)",
                destination.display()
            );
            return Ok(());
        }

        let recorded = fs::read_to_string(&sidecar)?;
        let actual = digest_file(destination)?;
        if actual != recorded.trim() {
            return Err(ReleaseError::Tampered {
                destination: destination.to_path_buf(),
                template: template.to_path_buf(),
            });
        }

        debug!("Checksum verified for {}", destination.display());
        Ok(())
    }

    /// Records the checksum of `destination`, overwriting any previous sidecar
    pub fn record(&self, template: &Path, destination: &Path) -> Result<()> {
        let sidecar = Self::sidecar_path(template);
        fs::write(&sidecar, digest_file(destination)?)?;
        debug!("Recorded checksum for {} in {}", destination.display(), sidecar.display());
        Ok(())
    }
}
