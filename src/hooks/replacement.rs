use crate::error::{ReleaseError, Result};
use crate::hooks::{HookContext, HookServices, PathFilter, PreReleaseHook};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// A literal search/replace pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

/// Configuration of a replacement hook
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplacementHookSpec {
    /// Glob patterns relative to the project directory; nothing is touched when empty
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Applied to every matched file in declaration order
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

/// Rewrites matching project files with literal string replacements
///
/// Rewritten copies are staged in the hook's scratch directory and only copied
/// over the originals once every file has been processed.
#[derive(Debug)]
pub struct ReplacementHook {
    project_dir: PathBuf,
    filter: Option<PathFilter>,
    replacements: Vec<Replacement>,
}

impl ReplacementHook {
    pub fn new(spec: &ReplacementHookSpec, project_dir: &Path) -> Result<Self> {
        let filter = if spec.includes.is_empty() {
            None
        } else {
            Some(PathFilter::new(&spec.includes, &spec.excludes)?)
        };

        Ok(ReplacementHook {
            project_dir: project_dir.to_path_buf(),
            filter,
            replacements: spec.replacements.clone(),
        })
    }

    /// Project files selected by the patterns, sorted, never inside `.git`
    pub fn matching_files(&self) -> Result<Vec<PathBuf>> {
        let Some(filter) = &self.filter else {
            return Ok(Vec::new());
        };

        let walker = WalkDir::new(&self.project_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != ".git");

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| ReleaseError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = PathFilter::relative_name(&self.project_dir, entry.path()) {
                if filter.matches(&name) {
                    files.push(entry.into_path());
                }
            }
        }
        Ok(files)
    }

    fn apply(&self, content: &str) -> String {
        self.replacements
            .iter()
            .fold(content.to_string(), |current, replacement| {
                current.replace(&replacement.from, &replacement.to)
            })
    }
}

impl PreReleaseHook for ReplacementHook {
    fn name(&self) -> &str {
        "replacement"
    }

    fn validate(&self, _services: &HookServices) -> Result<()> {
        Ok(())
    }

    fn execute(&self, _services: &HookServices, context: &HookContext) -> Result<()> {
        let files = self.matching_files()?;
        if files.is_empty() {
            debug!("No files matched for replacement");
            return Ok(());
        }

        let mut staged = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            let bytes = fs::read(file)?;
            let content = String::from_utf8(bytes).map_err(|_| {
                ReleaseError::hook(format!("{} is not valid UTF-8", file.display()))
            })?;

            let copy = context.working_directory.join(index.to_string());
            fs::write(&copy, self.apply(&content))?;
            staged.push((copy, file));
        }

        // write into the existing file so its permissions are kept
        for (copy, original) in &staged {
            fs::write(original, fs::read(copy)?)?;
            debug!("Rewrote {}", original.display());
        }

        info!("Applied replacements to {} file(s)", staged.len());
        Ok(())
    }
}
