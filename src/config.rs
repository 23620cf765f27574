use crate::domain::VersionBump;
use crate::error::Result;
use crate::git::GitSettings;
use crate::hooks::{HookServices, HookSpec};
use crate::orchestration::ReleaseSettings;
use crate::render::{MissingVariablePolicy, TemplateRenderer};
use crate::version_store::VersionFile;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory and the user config directory
pub const CONFIG_FILE_NAME: &str = "release.toml";

pub const DEFAULT_RELEASE_COMMIT_MESSAGE: &str =
    "[Release] - release commit: {{preReleaseVersion}} -> {{releaseVersion}}";
pub const DEFAULT_VERSION_TAG_TEMPLATE: &str = "v{{releaseVersion}}";
pub const DEFAULT_VERSION_TAG_COMMIT_MESSAGE: &str =
    "[Release] - creating tag: {{preReleaseVersion}} -> {{releaseVersion}}";
pub const DEFAULT_NEW_VERSION_COMMIT_MESSAGE: &str =
    "[Release] - new version commit: {{releaseVersion}} -> {{nextPreReleaseVersion}}";
pub const DEFAULT_PRE_RELEASE_LABEL: &str = "SNAPSHOT";

/// Represents the complete release configuration.
///
/// Contains commit/tag message templates, version bump rules, repository checks,
/// git options and the hooks to run.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReleaseConfig {
    pub release_commit_message: String,
    pub version_tag_template: String,
    pub version_tag_commit_message: String,
    pub increment_after_release: bool,
    pub new_version_commit_message: String,

    pub release_bump: VersionBump,
    pub next_version_bump: VersionBump,
    pub pre_release_label: String,

    /// Explicit release version; overrides `release_bump`
    pub release_version: Option<String>,
    /// Explicit next version; overrides `next_version_bump`
    pub next_version: Option<String>,

    pub dry_run: bool,
    pub missing_template_variable: MissingVariablePolicy,

    pub version_properties: VersionPropertiesConfig,
    pub pre_release_checks: PreReleaseChecks,
    pub git: GitSettings,
    pub hooks: Vec<HookSpec>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            release_commit_message: DEFAULT_RELEASE_COMMIT_MESSAGE.to_string(),
            version_tag_template: DEFAULT_VERSION_TAG_TEMPLATE.to_string(),
            version_tag_commit_message: DEFAULT_VERSION_TAG_COMMIT_MESSAGE.to_string(),
            increment_after_release: true,
            new_version_commit_message: DEFAULT_NEW_VERSION_COMMIT_MESSAGE.to_string(),
            release_bump: VersionBump::Patch,
            next_version_bump: VersionBump::Patch,
            pre_release_label: DEFAULT_PRE_RELEASE_LABEL.to_string(),
            release_version: None,
            next_version: None,
            dry_run: false,
            missing_template_variable: MissingVariablePolicy::default(),
            version_properties: VersionPropertiesConfig::default(),
            pre_release_checks: PreReleaseChecks::default(),
            git: GitSettings::default(),
            hooks: Vec::new(),
        }
    }
}

impl ReleaseConfig {
    /// Resolve the configuration against a project directory
    ///
    /// `scratch_root` holds the per-hook scratch directories.
    pub fn settings(&self, project_dir: &Path, scratch_root: &Path) -> ReleaseSettings {
        ReleaseSettings {
            project_dir: project_dir.to_path_buf(),
            scratch_root: scratch_root.to_path_buf(),
            version_file: VersionFile::new(
                project_dir.join(&self.version_properties.file),
                self.version_properties.property.clone(),
            ),
            release_commit_message: self.release_commit_message.clone(),
            version_tag_template: self.version_tag_template.clone(),
            version_tag_commit_message: self.version_tag_commit_message.clone(),
            increment_after_release: self.increment_after_release,
            new_version_commit_message: self.new_version_commit_message.clone(),
            release_bump: self.release_bump,
            next_version_bump: self.next_version_bump,
            pre_release_label: self.pre_release_label.clone(),
            release_version: self.release_version.clone(),
            next_version: self.next_version.clone(),
            dry_run: self.dry_run,
            checks: self.pre_release_checks.clone(),
        }
    }

    /// Hook services using the configured missing-variable policy
    pub fn services(&self) -> HookServices {
        HookServices::new(Box::new(TemplateRenderer::new(self.missing_template_variable)))
    }
}

/// Location of the version inside a `key = value` properties file
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct VersionPropertiesConfig {
    #[serde(default = "default_version_file")]
    pub file: PathBuf,
    #[serde(default = "default_version_property")]
    pub property: String,
}

fn default_version_file() -> PathBuf {
    PathBuf::from("gradle.properties")
}

fn default_version_property() -> String {
    "version".to_string()
}

impl Default for VersionPropertiesConfig {
    fn default() -> Self {
        VersionPropertiesConfig {
            file: default_version_file(),
            property: default_version_property(),
        }
    }
}

/// Repository checks run before anything is modified.
///
/// Each `fail_on_*` switch turns its finding into an error; when off the
/// finding is only logged.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PreReleaseChecks {
    /// Regex the whole branch name must match; empty skips the check
    #[serde(default = "default_release_branch_pattern")]
    pub release_branch_pattern: String,
    #[serde(default = "default_true")]
    pub fail_on_untracked_files: bool,
    #[serde(default = "default_true")]
    pub fail_on_uncommitted_files: bool,
    #[serde(default = "default_true")]
    pub fail_on_push_needed: bool,
    #[serde(default = "default_true")]
    pub fail_on_pull_needed: bool,
}

fn default_release_branch_pattern() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for PreReleaseChecks {
    fn default() -> Self {
        PreReleaseChecks {
            release_branch_pattern: default_release_branch_pattern(),
            fail_on_untracked_files: true,
            fail_on_uncommitted_files: true,
            fail_on_push_needed: true,
            fail_on_pull_needed: true,
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release.toml` in current directory
/// 3. `git-release/release.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(ReleaseConfig)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>) -> Result<ReleaseConfig> {
    let local = Path::new(".").join(CONFIG_FILE_NAME);

    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if local.exists() {
        fs::read_to_string(&local)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join("git-release").join(CONFIG_FILE_NAME);
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(ReleaseConfig::default());
        }
    } else {
        return Ok(ReleaseConfig::default());
    };

    let config: ReleaseConfig = toml::from_str(&config_str)?;
    Ok(config)
}
