//! System git backend
//!
//! Every operation shells out to the `git` binary in the repository work tree
//! and captures stdout and stderr. Discovery of the work tree uses `git2`.

use crate::error::{ReleaseError, Result};
use crate::git::compat;
use crate::git::{GitSettings, RemoteStatus, Repository, RepositoryStatus};
use git2::Repository as Git2Repo;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Captured output of a successful git command
#[derive(Debug, Clone)]
struct GitOutput {
    stdout: String,
}

impl GitOutput {
    fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .skip_while(|line| line.trim().is_empty())
    }

    fn first_line(&self) -> Option<&str> {
        self.lines().next()
    }
}

/// Git backend using the system git binary
pub struct SystemGit {
    work_tree: PathBuf,
    git_dir: PathBuf,
    settings: GitSettings,
}

impl SystemGit {
    /// Open the repository containing `path`
    ///
    /// Verifies that a supported git binary is available, that `path` lies in a
    /// non-bare repository and that the repository has at least one commit.
    pub fn open<P: AsRef<Path>>(path: P, settings: GitSettings) -> Result<Self> {
        let repo = Git2Repo::discover(path.as_ref())?;

        let work_tree = repo
            .workdir()
            .ok_or_else(|| ReleaseError::config("Bare repositories cannot be released"))?
            .to_path_buf();
        let git_dir = repo.path().to_path_buf();

        if repo.is_empty()? {
            return Err(ReleaseError::config(
                "Git repository is empty; please commit something first",
            ));
        }

        let system_git = SystemGit {
            work_tree,
            git_dir,
            settings,
        };

        let version = system_git.git(&["version"])?;
        compat::check_git_version(&version.stdout)?;
        info!("Using repository at {}", system_git.work_tree.display());

        Ok(system_git)
    }

    /// Root of the working tree
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    /// The `.git` directory; never reported by `git status`
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn git(&self, args: &[&str]) -> Result<GitOutput> {
        let command_line = format!("git {}", args.join(" "));
        debug!("Executing {}", command_line);

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_tree)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| ReleaseError::Repository {
                command: command_line.clone(),
                exit_code: -1,
                output: e.to_string(),
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!("Exit code: {}", exit_code);

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if output.status.success() {
            return Ok(GitOutput { stdout });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut combined = String::new();
        if !stdout.trim().is_empty() {
            combined.push_str(stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(stderr.trim_end());
        }

        Err(ReleaseError::Repository {
            command: command_line,
            exit_code,
            output: combined,
        })
    }

    fn git_owned(&self, args: Vec<String>) -> Result<GitOutput> {
        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        self.git(&borrowed)
    }

    fn count_revisions(&self, args: &[&str]) -> Result<u32> {
        let output = self.git(args)?;
        let line = output.first_line().unwrap_or("0").trim();
        line.parse::<u32>().map_err(|_| ReleaseError::Repository {
            command: format!("git {}", args.join(" ")),
            exit_code: 0,
            output: format!("unexpected revision count '{}'", line),
        })
    }
}

impl Repository for SystemGit {
    fn current_branch(&self) -> Result<String> {
        // https://git-blame.blogspot.com/2013/06/checking-current-branch-programatically.html
        // exits 1 without output on a detached HEAD
        let output = match self.git(&["symbolic-ref", "--short", "-q", "HEAD"]) {
            Err(ReleaseError::Repository { exit_code: 1, .. }) => {
                return Err(ReleaseError::preflight("Unable to determine current branch"))
            }
            result => result?,
        };
        output
            .first_line()
            .map(|line| line.trim().to_string())
            .ok_or_else(|| ReleaseError::preflight("Unable to determine current branch"))
    }

    fn status(&self) -> Result<RepositoryStatus> {
        let output = self.git(&["status", "--porcelain"])?;
        Ok(RepositoryStatus::from_porcelain(&output.stdout))
    }

    fn remote_status(&self) -> Result<RemoteStatus> {
        self.git(&["remote", "update"])?;

        let commits_behind = self.count_revisions(&["rev-list", "--count", "HEAD..@{upstream}", "--"])?;
        let commits_ahead = self.count_revisions(&["rev-list", "--count", "@{upstream}..HEAD", "--"])?;

        Ok(RemoteStatus {
            commits_ahead,
            commits_behind,
        })
    }

    fn stage_all(&self) -> Result<()> {
        self.git(&["add", "."])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        let mut args = vec!["commit".to_string(), "-m".to_string(), message.to_string()];
        args.extend(self.settings.commit_options.iter().cloned());
        self.git_owned(args)?;
        Ok(())
    }

    fn tag(&self, name: &str, message: &str) -> Result<()> {
        let mut args = vec![
            "tag".to_string(),
            "-a".to_string(),
            name.to_string(),
            "-m".to_string(),
            message.to_string(),
        ];
        if self.settings.sign_tag {
            args.push("-s".to_string());
        }
        self.git_owned(args)?;
        Ok(())
    }

    fn push(&self) -> Result<()> {
        let mut args = vec![
            "push".to_string(),
            "--porcelain".to_string(),
            "--follow-tags".to_string(),
        ];
        args.extend(self.settings.push_options.iter().cloned());
        self.git_owned(args)?;
        Ok(())
    }

    fn restore(&self, file: &Path) -> Result<()> {
        let absolute = if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.work_tree.join(file)
        };
        let path = absolute.to_string_lossy().to_string();
        self.git(&["restore", "--", &path])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_output_skips_leading_blank_lines() {
        let output = GitOutput {
            stdout: "\n\r\nmain\r\nother\n".to_string(),
        };
        assert_eq!(output.first_line(), Some("main"));
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn test_open_outside_repository_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = SystemGit::open(dir.path(), GitSettings::default());
        assert!(result.is_err());
    }
}
