use crate::error::{ReleaseError, Result};
use crate::git::{RemoteStatus, Repository, RepositoryStatus, StatusPath};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A mutating call made against a [MockRepository]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    StageAll,
    Commit(String),
    Tag { name: String, message: String },
    Push,
    Restore(PathBuf),
}

/// Mock repository for testing without actual git operations
///
/// Status, branch and remote counts are scripted. Mutating calls are recorded
/// in order. `restore` puts back file content registered with
/// [MockRepository::track_file], mimicking `git restore`.
pub struct MockRepository {
    branch: String,
    status: RepositoryStatus,
    remote: RemoteStatus,
    committed_files: HashMap<PathBuf, Vec<u8>>,
    failing: Vec<&'static str>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRepository {
    /// Create a clean mock repository on branch `main`
    pub fn new() -> Self {
        MockRepository {
            branch: "main".to_string(),
            status: RepositoryStatus::default(),
            remote: RemoteStatus::default(),
            committed_files: HashMap::new(),
            failing: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the current branch
    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.branch = branch.into();
    }

    /// Add a `git status --porcelain` line to the scripted status
    pub fn add_status_line(&mut self, line: &str) {
        if let Some(path) = StatusPath::from_porcelain(line) {
            self.status.paths.push(path);
        }
    }

    /// Set commits ahead of / behind upstream
    pub fn set_remote_status(&mut self, commits_ahead: u32, commits_behind: u32) {
        self.remote = RemoteStatus {
            commits_ahead,
            commits_behind,
        };
    }

    /// Snapshot the current content of `file` as its committed content
    pub fn track_file(&mut self, file: &Path) -> Result<()> {
        let content = fs::read(file)?;
        self.committed_files.insert(file.to_path_buf(), content);
        Ok(())
    }

    /// Make the named operation (`"commit"`, `"push"`, ...) fail
    pub fn fail_on(&mut self, operation: &'static str) {
        self.failing.push(operation);
    }

    /// Mutating calls made so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Commit messages made so far, in order
    pub fn commit_messages(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Commit(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing.contains(&operation) {
            return Err(ReleaseError::Repository {
                command: format!("git {}", operation),
                exit_code: 1,
                output: format!("simulated {} failure", operation),
            });
        }
        Ok(())
    }

    fn record(&self, call: RecordedCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn current_branch(&self) -> Result<String> {
        self.check("symbolic-ref")?;
        Ok(self.branch.clone())
    }

    fn status(&self) -> Result<RepositoryStatus> {
        self.check("status")?;
        Ok(self.status.clone())
    }

    fn remote_status(&self) -> Result<RemoteStatus> {
        self.check("remote")?;
        Ok(self.remote)
    }

    fn stage_all(&self) -> Result<()> {
        self.check("add")?;
        self.record(RecordedCall::StageAll);
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.check("commit")?;
        self.record(RecordedCall::Commit(message.to_string()));
        Ok(())
    }

    fn tag(&self, name: &str, message: &str) -> Result<()> {
        self.check("tag")?;
        self.record(RecordedCall::Tag {
            name: name.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    fn push(&self) -> Result<()> {
        self.check("push")?;
        self.record(RecordedCall::Push);
        Ok(())
    }

    fn restore(&self, file: &Path) -> Result<()> {
        self.check("restore")?;
        self.record(RecordedCall::Restore(file.to_path_buf()));
        if let Some(content) = self.committed_files.get(file) {
            fs::write(file, content)?;
        }
        Ok(())
    }
}
