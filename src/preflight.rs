use crate::config::PreReleaseChecks;
use crate::error::{ReleaseError, Result};
use crate::git::{Repository, StatusPath};
use regex::Regex;
use std::fmt;
use tracing::{debug, warn};

/// Problems found in the repository before a release.
/// Depending on [PreReleaseChecks] each one either aborts the release or is
/// reported as a warning.
#[derive(Debug, Clone, PartialEq)]
pub enum PreflightFinding {
    /// Current branch does not match the release branch pattern
    WrongBranch { branch: String, pattern: String },
    /// Files git does not track yet
    UntrackedFiles { paths: Vec<StatusPath> },
    /// Tracked files with changes that are not committed
    UncommittedFiles { paths: Vec<StatusPath> },
    /// Local commits missing upstream
    PushNeeded { commits: u32 },
    /// Upstream commits missing locally
    PullNeeded { commits: u32 },
}

fn format_paths(f: &mut fmt::Formatter<'_>, paths: &[StatusPath]) -> fmt::Result {
    for path in paths {
        write!(f, "\n{}", path)?;
    }
    Ok(())
}

impl fmt::Display for PreflightFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreflightFinding::WrongBranch { branch, pattern } => write!(
                f,
                "Currently on branch {}; required branches for release: {}",
                branch, pattern
            ),
            PreflightFinding::UntrackedFiles { paths } => {
                write!(f, "You have untracked files:")?;
                format_paths(f, paths)
            }
            PreflightFinding::UncommittedFiles { paths } => {
                write!(f, "You have uncommitted files:")?;
                format_paths(f, paths)
            }
            PreflightFinding::PushNeeded { commits } => {
                write!(f, "You have {} change(s) to push.", commits)
            }
            PreflightFinding::PullNeeded { commits } => {
                write!(f, "You have {} change(s) to pull.", commits)
            }
        }
    }
}

/// Raise `finding` as an error when `fatal`, otherwise log and keep it
fn report(finding: PreflightFinding, fatal: bool, findings: &mut Vec<PreflightFinding>) -> Result<()> {
    if fatal {
        return Err(ReleaseError::preflight(finding.to_string()));
    }
    warn!("{}", finding);
    findings.push(finding);
    Ok(())
}

/// Check the repository is safe to release from
///
/// Read-only. Returns the findings that were downgraded to warnings; the first
/// fatal finding is returned as [ReleaseError::Preflight].
pub fn run_preflight<R: Repository + ?Sized>(
    repository: &R,
    checks: &PreReleaseChecks,
) -> Result<Vec<PreflightFinding>> {
    let mut findings = Vec::new();

    let branch_pattern = checks.release_branch_pattern.trim();
    if !branch_pattern.is_empty() {
        let regex = Regex::new(&format!("^(?:{})$", branch_pattern)).map_err(|e| {
            ReleaseError::config(format!(
                "Invalid release branch pattern '{}': {}",
                branch_pattern, e
            ))
        })?;

        let branch = repository.current_branch()?;
        debug!("Checking branch {} against {}", branch, branch_pattern);
        if !regex.is_match(&branch) {
            return Err(ReleaseError::preflight(
                PreflightFinding::WrongBranch {
                    branch,
                    pattern: branch_pattern.to_string(),
                }
                .to_string(),
            ));
        }
    }

    let status = repository.status()?;
    let untracked: Vec<StatusPath> = status.untracked().into_iter().cloned().collect();
    let uncommitted: Vec<StatusPath> = status.uncommitted().into_iter().cloned().collect();
    if !untracked.is_empty() {
        report(
            PreflightFinding::UntrackedFiles { paths: untracked },
            checks.fail_on_untracked_files,
            &mut findings,
        )?;
    } else if !uncommitted.is_empty() {
        report(
            PreflightFinding::UncommittedFiles { paths: uncommitted },
            checks.fail_on_uncommitted_files,
            &mut findings,
        )?;
    }

    let remote = repository.remote_status()?;
    if remote.commits_ahead > 0 {
        report(
            PreflightFinding::PushNeeded {
                commits: remote.commits_ahead,
            },
            checks.fail_on_push_needed,
            &mut findings,
        )?;
    } else if remote.commits_behind > 0 {
        report(
            PreflightFinding::PullNeeded {
                commits: remote.commits_behind,
            },
            checks.fail_on_pull_needed,
            &mut findings,
        )?;
    }

    Ok(findings)
}
