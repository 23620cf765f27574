//! Git operations abstraction layer
//!
//! The release engine talks to version control exclusively through the
//! [Repository] trait. Implementations:
//!
//! - [system::SystemGit]: runs the system `git` binary, capturing its output
//! - [mock::MockRepository]: scripted, in-memory implementation for testing
//!
//! ```rust
//! # use git_release::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> git_release::Result<()> {
//! let status = repo.status()?;
//! if status.is_clean() {
//!     repo.stage_all()?;
//!     repo.commit("release")?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod compat;
pub mod mock;
pub mod system;

pub use mock::{MockRepository, RecordedCall};
pub use system::SystemGit;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Classification of a path reported by `git status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Untracked,
    Uncommitted,
}

/// One entry of the working tree status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPath {
    pub path: String,
    pub status: PathStatus,
    /// Raw porcelain indicator, e.g. `??`, `M`, `A`
    pub indicator: String,
}

impl StatusPath {
    /// Parse one line of `git status --porcelain`
    pub fn from_porcelain(line: &str) -> Option<Self> {
        if line.trim().is_empty() || line.len() < 3 {
            return None;
        }
        let (indicator, path) = line.split_at(2);
        let indicator = indicator.trim().to_string();
        let status = if indicator == "??" {
            PathStatus::Untracked
        } else {
            PathStatus::Uncommitted
        };

        Some(StatusPath {
            path: path.trim_start().to_string(),
            status,
            indicator,
        })
    }
}

impl fmt::Display for StatusPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.indicator, self.path)
    }
}

/// Working tree status; recomputed on demand, never cached
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStatus {
    pub paths: Vec<StatusPath>,
}

impl RepositoryStatus {
    pub fn new(paths: Vec<StatusPath>) -> Self {
        RepositoryStatus { paths }
    }

    /// Parse the full output of `git status --porcelain`
    pub fn from_porcelain(output: &str) -> Self {
        RepositoryStatus {
            paths: output.lines().filter_map(StatusPath::from_porcelain).collect(),
        }
    }

    pub fn untracked(&self) -> Vec<&StatusPath> {
        self.with_status(PathStatus::Untracked)
    }

    pub fn uncommitted(&self) -> Vec<&StatusPath> {
        self.with_status(PathStatus::Uncommitted)
    }

    pub fn is_clean(&self) -> bool {
        self.paths.is_empty()
    }

    fn with_status(&self, status: PathStatus) -> Vec<&StatusPath> {
        self.paths.iter().filter(|p| p.status == status).collect()
    }
}

/// Commits ahead of / behind the upstream branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteStatus {
    pub commits_ahead: u32,
    pub commits_behind: u32,
}

/// Options passed through to git when committing, tagging and pushing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitSettings {
    /// Sign release tags (`git tag -s`)
    #[serde(default)]
    pub sign_tag: bool,

    /// Extra arguments for `git commit`, e.g. `["-s"]`
    #[serde(default)]
    pub commit_options: Vec<String>,

    /// Extra arguments for `git push`, e.g. `["--no-verify"]`
    #[serde(default)]
    pub push_options: Vec<String>,
}

/// Version control operations needed by a release
///
/// ## Error Handling
///
/// Every operation is fallible. Implementations surface command failures as
/// [crate::error::ReleaseError::Repository] carrying the captured output; callers
/// never retry, since the state of a repository after a partial failure is
/// unknown.
pub trait Repository: Send + Sync {
    /// Name of the checked-out branch
    fn current_branch(&self) -> Result<String>;

    /// Untracked and uncommitted paths in the working tree
    fn status(&self) -> Result<RepositoryStatus>;

    /// Updates remote refs, then counts commits ahead of and behind upstream
    fn remote_status(&self) -> Result<RemoteStatus>;

    /// Stages every change in the working tree
    fn stage_all(&self) -> Result<()>;

    /// Commits staged changes
    fn commit(&self, message: &str) -> Result<()>;

    /// Creates an annotated tag at HEAD
    fn tag(&self, name: &str, message: &str) -> Result<()>;

    /// Pushes commits and annotated tags to upstream
    fn push(&self) -> Result<()>;

    /// Reverts a single file to its committed content
    fn restore(&self, file: &Path) -> Result<()>;
}
