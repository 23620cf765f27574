//! The release state machine.
//!
//! A run walks through these states:
//!
//! ```text
//! Init -> Preflight -> VersionComputeRelease -> HooksRunning
//!      -> DryRunExit
//!      -> Committing -> VersionComputeNext -> CommittingNext -> Done
//! ```
//!
//! Nothing is modified before `VersionComputeRelease`. A failure while computing
//! the release version or running hooks moves to `RollingBack`, which restores
//! the version file and returns the original error.

use crate::config::PreReleaseChecks;
use crate::domain::{PreRelease, Version, VersionBump, VersionTransition};
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::hooks::{HookContext, HookServices, PreReleaseHook};
use crate::preflight::{run_preflight, PreflightFinding};
use crate::version_store::VersionFile;
use serde_json::{json, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Where a release run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    Init,
    Preflight,
    VersionComputeRelease,
    HooksRunning,
    RollingBack,
    DryRunExit,
    Committing,
    VersionComputeNext,
    CommittingNext,
    Done,
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleaseState::Init => "init",
            ReleaseState::Preflight => "preflight",
            ReleaseState::VersionComputeRelease => "compute release version",
            ReleaseState::HooksRunning => "running hooks",
            ReleaseState::RollingBack => "rolling back",
            ReleaseState::DryRunExit => "dry run exit",
            ReleaseState::Committing => "committing release",
            ReleaseState::VersionComputeNext => "compute next version",
            ReleaseState::CommittingNext => "committing next version",
            ReleaseState::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Everything a release run needs besides its collaborators
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    pub project_dir: PathBuf,
    /// Parent of the per-hook scratch directories
    pub scratch_root: PathBuf,
    pub version_file: VersionFile,
    pub release_commit_message: String,
    pub version_tag_template: String,
    pub version_tag_commit_message: String,
    pub increment_after_release: bool,
    pub new_version_commit_message: String,
    pub release_bump: VersionBump,
    pub next_version_bump: VersionBump,
    pub pre_release_label: String,
    pub release_version: Option<String>,
    pub next_version: Option<String>,
    pub dry_run: bool,
    pub checks: PreReleaseChecks,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseOutcome {
    pub previous_version: Version,
    pub release_version: Version,
    /// Pre-release version written after the release, if any
    pub next_version: Option<Version>,
    /// Tag created and pushed; `None` in a dry run
    pub tag: Option<String>,
    pub dry_run: bool,
    /// Preflight findings that were downgraded to warnings
    pub warnings: Vec<PreflightFinding>,
}

/// Settings checked before the run touches anything
#[derive(Debug)]
struct ReleasePlan {
    release_version: Option<Version>,
    next_version: Option<Version>,
    label: PreRelease,
}

/// Rendered commit and tag messages for the release commit
#[derive(Debug)]
struct ReleaseMessages {
    commit: String,
    tag: String,
    tag_message: String,
}

/// Drives one release
pub struct ReleaseOrchestrator<R: Repository> {
    repository: R,
    services: HookServices,
    settings: ReleaseSettings,
    hooks: Vec<Box<dyn PreReleaseHook>>,
    state: ReleaseState,
}

impl<R: Repository> ReleaseOrchestrator<R> {
    pub fn new(
        repository: R,
        services: HookServices,
        settings: ReleaseSettings,
        hooks: Vec<Box<dyn PreReleaseHook>>,
    ) -> Self {
        ReleaseOrchestrator {
            repository,
            services,
            settings,
            hooks,
            state: ReleaseState::Init,
        }
    }

    /// Last state reached
    pub fn state(&self) -> ReleaseState {
        self.state
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn settings(&self) -> &ReleaseSettings {
        &self.settings
    }

    /// Run the release
    pub fn run(&mut self) -> Result<ReleaseOutcome> {
        self.state = ReleaseState::Init;
        let plan = self.plan()?;

        self.transition(ReleaseState::Preflight);
        let warnings = run_preflight(&self.repository, &self.settings.checks)?;
        for hook in &self.hooks {
            debug!("Validating hook {}", hook.name());
            hook.validate(&self.services)?;
        }

        self.transition(ReleaseState::VersionComputeRelease);
        let (release, messages) = match self.prepare_release(&plan) {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.roll_back(e)),
        };

        let mut outcome = ReleaseOutcome {
            previous_version: release.previous.clone(),
            release_version: release.version.clone(),
            next_version: None,
            tag: None,
            dry_run: self.settings.dry_run,
            warnings,
        };

        if self.settings.dry_run {
            self.transition(ReleaseState::DryRunExit);
            warn!(
                "Dry run: version {} and hook output left in the working tree; nothing committed, tagged or pushed",
                release.version
            );
            return Ok(outcome);
        }

        self.transition(ReleaseState::Committing);
        self.repository.stage_all()?;
        self.repository.commit(&messages.commit)?;
        self.repository.tag(&messages.tag, &messages.tag_message)?;
        self.repository.push()?;
        info!("Released {} as {}", release.version, messages.tag);
        outcome.tag = Some(messages.tag);

        if self.settings.increment_after_release {
            self.transition(ReleaseState::VersionComputeNext);
            let next = self.next_version(&plan)?;

            self.transition(ReleaseState::CommittingNext);
            let context = json!({
                "previousVersion": release.previous.to_string(),
                "preReleaseVersion": release.previous.to_string(),
                "releaseVersion": release.version.to_string(),
                "nextPreReleaseVersion": next.version.to_string(),
            });
            let message = self.render(
                "new_version_commit_message",
                &self.settings.new_version_commit_message,
                &context,
            )?;
            self.repository.stage_all()?;
            self.repository.commit(&message)?;
            self.repository.push()?;
            outcome.next_version = Some(next.version);
        }

        self.transition(ReleaseState::Done);
        Ok(outcome)
    }

    fn transition(&mut self, next: ReleaseState) {
        debug!("Release state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn plan(&self) -> Result<ReleasePlan> {
        let release_version = self
            .settings
            .release_version
            .as_deref()
            .map(|text| {
                let version = Version::parse(text)
                    .map_err(|e| ReleaseError::config(format!("release_version: {}", e)))?;
                if version.is_pre_release() {
                    return Err(ReleaseError::config(format!(
                        "Release version must not be a pre-release: {}",
                        version
                    )));
                }
                Ok(version)
            })
            .transpose()?;

        let next_version = self
            .settings
            .next_version
            .as_deref()
            .map(|text| {
                let version = Version::parse(text)
                    .map_err(|e| ReleaseError::config(format!("next_version: {}", e)))?;
                if !version.is_pre_release() {
                    return Err(ReleaseError::config(format!(
                        "Next version must be a pre-release: {}",
                        version
                    )));
                }
                Ok(version)
            })
            .transpose()?;

        let label = PreRelease::parse(&self.settings.pre_release_label)
            .map_err(|e| ReleaseError::config(format!("pre_release_label: {}", e)))?;

        Ok(ReleasePlan {
            release_version,
            next_version,
            label,
        })
    }

    fn default_version(plan: &ReleasePlan) -> Version {
        Version::new(0, 1, 0).with_pre_release(Some(plan.label.clone()))
    }

    /// Steps that roll back the version file on failure
    fn prepare_release(&mut self, plan: &ReleasePlan) -> Result<(VersionTransition, ReleaseMessages)> {
        let bump = self.settings.release_bump;
        let release = self
            .settings
            .version_file
            .increment(&Self::default_version(plan), |current| {
                match &plan.release_version {
                    Some(version) => Ok(version.clone()),
                    None => current.bump(bump, None),
                }
            })?;

        self.transition(ReleaseState::HooksRunning);
        self.run_hooks(&release)?;

        let messages = self.release_messages(&release)?;
        Ok((release, messages))
    }

    fn run_hooks(&self, release: &VersionTransition) -> Result<()> {
        let total = self.hooks.len();
        for (index, hook) in self.hooks.iter().enumerate() {
            let scratch = self.settings.scratch_root.join(format!("hook-{}", index));
            if scratch.exists() {
                fs::remove_dir_all(&scratch)?;
            }
            fs::create_dir_all(&scratch)?;

            info!("Running hook {} ({}/{})", hook.name(), index + 1, total);
            let context = HookContext {
                previous_version: release.previous.clone(),
                release_version: release.version.clone(),
                working_directory: scratch.clone(),
                dry_run: self.settings.dry_run,
            };
            let result = hook.execute(&self.services, &context);
            remove_scratch(&scratch);
            result?;
        }
        Ok(())
    }

    fn release_messages(&self, release: &VersionTransition) -> Result<ReleaseMessages> {
        let context = json!({
            "previousVersion": release.previous.to_string(),
            "preReleaseVersion": release.previous.to_string(),
            "releaseVersion": release.version.to_string(),
        });

        Ok(ReleaseMessages {
            commit: self.render(
                "release_commit_message",
                &self.settings.release_commit_message,
                &context,
            )?,
            tag: self
                .render("version_tag_template", &self.settings.version_tag_template, &context)?
                .trim()
                .to_string(),
            tag_message: self.render(
                "version_tag_commit_message",
                &self.settings.version_tag_commit_message,
                &context,
            )?,
        })
    }

    fn next_version(&self, plan: &ReleasePlan) -> Result<VersionTransition> {
        let bump = self.settings.next_version_bump;
        let label = plan.label.clone();
        self.settings
            .version_file
            .increment(&Self::default_version(plan), |current| {
                match &plan.next_version {
                    Some(version) => Ok(version.clone()),
                    None => current.bump(bump, Some(label)),
                }
            })
    }

    fn render(&self, name: &str, template: &str, context: &Value) -> Result<String> {
        self.services.renderer.render(name, template, context)
    }

    /// Restore the version file; the original error is always returned
    fn roll_back(&mut self, cause: ReleaseError) -> ReleaseError {
        self.transition(ReleaseState::RollingBack);
        let file = &self.settings.version_file.path;
        error!("Release failed: {}", cause);
        info!("Restoring {}", file.display());
        if let Err(e) = self.repository.restore(file) {
            error!("Unable to restore {}: {}", file.display(), e);
        }
        cause
    }
}

fn remove_scratch(scratch: &Path) {
    if let Err(e) = fs::remove_dir_all(scratch) {
        warn!("Unable to remove scratch directory {}: {}", scratch.display(), e);
    }
}
