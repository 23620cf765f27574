use crate::domain::Version;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;

/// Context information passed to a hook
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Version the project was on before the release
    pub previous_version: Version,
    /// Version being released
    pub release_version: Version,
    /// Scratch directory owned by this hook for the duration of its run
    pub working_directory: PathBuf,
    /// Nothing will be committed, tagged or pushed
    pub dry_run: bool,
}

impl HookContext {
    /// Template variables describing the release
    ///
    /// `preReleaseVersion` is kept as an alias of `previousVersion` so the same
    /// names work in hook templates and commit messages.
    pub fn variables(&self) -> Map<String, Value> {
        let mut vars = Map::new();
        vars.insert(
            "previousVersion".to_string(),
            Value::String(self.previous_version.to_string()),
        );
        vars.insert(
            "preReleaseVersion".to_string(),
            Value::String(self.previous_version.to_string()),
        );
        vars.insert(
            "releaseVersion".to_string(),
            Value::String(self.release_version.to_string()),
        );
        vars
    }

    /// Convert context to environment variables for hook scripts
    ///
    /// Maps context fields to GIT_RELEASE_* environment variables
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert(
            "GIT_RELEASE_PREVIOUS_VERSION".to_string(),
            self.previous_version.to_string(),
        );
        env.insert(
            "GIT_RELEASE_RELEASE_VERSION".to_string(),
            self.release_version.to_string(),
        );
        env.insert(
            "GIT_RELEASE_WORKING_DIR".to_string(),
            self.working_directory.to_string_lossy().to_string(),
        );
        env.insert("GIT_RELEASE_DRY_RUN".to_string(), self.dry_run.to_string());

        env
    }
}
