use crate::error::{ReleaseError, Result};
use crate::hooks::{HookContext, HookServices, PreReleaseHook};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Configuration of a script hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptHookSpec {
    /// Executable, relative to the project directory
    pub script: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Runs a user script as a release step
///
/// The script runs inside the hook's scratch directory with `GIT_RELEASE_*`
/// environment variables describing the release. A non-zero exit fails the
/// release.
#[derive(Debug)]
pub struct ScriptHook {
    script: PathBuf,
    args: Vec<String>,
    project_dir: PathBuf,
}

impl ScriptHook {
    pub fn new(spec: &ScriptHookSpec, project_dir: &Path) -> Self {
        ScriptHook {
            script: project_dir.join(&spec.script),
            args: spec.args.clone(),
            project_dir: project_dir.to_path_buf(),
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

impl PreReleaseHook for ScriptHook {
    fn name(&self) -> &str {
        "script"
    }

    fn validate(&self, _services: &HookServices) -> Result<()> {
        if !self.script.exists() {
            return Err(ReleaseError::hook(format!(
                "Hook script not found: {}",
                self.script.display()
            )));
        }

        if !self.script.is_file() {
            return Err(ReleaseError::hook(format!(
                "Hook path is not a file: {}",
                self.script.display()
            )));
        }

        Ok(())
    }

    fn execute(&self, _services: &HookServices, context: &HookContext) -> Result<()> {
        debug!("Running hook script {}", self.script.display());

        let output = Command::new(&self.script)
            .args(&self.args)
            .current_dir(&context.working_directory)
            .envs(context.to_env_vars())
            .env("GIT_RELEASE_PROJECT_DIR", &self.project_dir)
            .output()
            .map_err(|e| {
                ReleaseError::hook(format!(
                    "Failed to execute hook {}: {}",
                    self.script.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(ReleaseError::hook(format!(
                "Hook {} failed with exit code {}\nStdout: {}\nStderr: {}",
                self.script.display(),
                output.status.code().unwrap_or(-1),
                stdout,
                stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{}", stdout.trim_end());
        }
        info!("Hook script {} succeeded", self.script.display());
        Ok(())
    }
}
