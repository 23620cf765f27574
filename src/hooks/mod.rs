//! Pre-release hooks
//!
//! Hooks run in declared order after the release version has been written and
//! before anything is committed. Each one gets its own scratch directory.
//! - template: render a directory of templates into the project
//! - replacement: literal search/replace in project files
//! - script: run an executable
//! - custom: any kind registered in a [HookRegistry]

pub mod executor;
pub mod lifecycle;
pub mod replacement;
pub mod template;

pub use executor::{ScriptHook, ScriptHookSpec};
pub use lifecycle::HookContext;
pub use replacement::{Replacement, ReplacementHook, ReplacementHookSpec};
pub use template::{RenameRule, TemplateHook, TemplateHookSpec, TemplatePair};

use crate::checksum::ChecksumGuard;
use crate::error::{ReleaseError, Result};
use crate::render::Renderer;
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Free-form properties of a custom hook
pub type HookProperties = BTreeMap<String, serde_json::Value>;

/// Builds a custom hook from its properties and the project directory
pub type HookFactory = fn(&HookProperties, &Path) -> Result<Box<dyn PreReleaseHook>>;

/// Collaborators shared by every hook of a run
pub struct HookServices {
    pub renderer: Box<dyn Renderer>,
    pub checksums: ChecksumGuard,
}

impl HookServices {
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        HookServices {
            renderer,
            checksums: ChecksumGuard::new(),
        }
    }
}

/// A step run between writing the release version and committing it
pub trait PreReleaseHook: Send + Sync {
    fn name(&self) -> &str;

    /// Check the hook can run; must not modify tracked files
    fn validate(&self, services: &HookServices) -> Result<()>;

    fn execute(&self, services: &HookServices, context: &HookContext) -> Result<()>;
}

/// Hook configuration as written in `release.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HookSpec {
    Template(TemplateHookSpec),
    Replacement(ReplacementHookSpec),
    Script(ScriptHookSpec),
    Custom {
        kind: String,
        #[serde(default)]
        properties: HookProperties,
    },
}

impl fmt::Display for HookSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookSpec::Template(spec) => write!(f, "template ({})", spec.source_dir.display()),
            HookSpec::Replacement(_) => write!(f, "replacement"),
            HookSpec::Script(spec) => write!(f, "script ({})", spec.script.display()),
            HookSpec::Custom { kind, .. } => write!(f, "custom ({})", kind),
        }
    }
}

/// Resolves hook specs into runnable hooks
///
/// Built-in kinds are constructed directly; custom kinds must be registered.
#[derive(Default)]
pub struct HookRegistry {
    factories: BTreeMap<String, HookFactory>,
}

impl HookRegistry {
    pub fn new() -> Self {
        HookRegistry::default()
    }

    /// Register a factory for `HookSpec::Custom { kind, .. }`
    pub fn register(&mut self, kind: impl Into<String>, factory: HookFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn build(&self, spec: &HookSpec, project_dir: &Path) -> Result<Box<dyn PreReleaseHook>> {
        match spec {
            HookSpec::Template(spec) => Ok(Box::new(TemplateHook::new(spec, project_dir)?)),
            HookSpec::Replacement(spec) => Ok(Box::new(ReplacementHook::new(spec, project_dir)?)),
            HookSpec::Script(spec) => Ok(Box::new(ScriptHook::new(spec, project_dir))),
            HookSpec::Custom { kind, properties } => {
                let factory = self.factories.get(kind).ok_or_else(|| {
                    ReleaseError::config(format!("Unknown hook kind '{}'", kind))
                })?;
                factory(properties, project_dir)
            }
        }
    }

    /// Build every hook, failing on the first unresolvable spec
    pub fn build_all(
        &self,
        specs: &[HookSpec],
        project_dir: &Path,
    ) -> Result<Vec<Box<dyn PreReleaseHook>>> {
        specs
            .iter()
            .map(|spec| self.build(spec, project_dir))
            .collect()
    }
}

/// Include/exclude glob filter over `/`-separated relative paths
#[derive(Debug, Clone)]
pub(crate) struct PathFilter {
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

impl PathFilter {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    pub(crate) fn new(includes: &[String], excludes: &[String]) -> Result<Self> {
        Ok(PathFilter {
            includes: compile(includes)?,
            excludes: compile(excludes)?,
        })
    }

    pub(crate) fn matches(&self, name: &str) -> bool {
        self.includes.iter().any(|p| p.matches_with(name, Self::OPTIONS))
            && !self.excludes.iter().any(|p| p.matches_with(name, Self::OPTIONS))
    }

    /// `path` relative to `root`, joined with `/`
    pub(crate) fn relative_name(root: &Path, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| ReleaseError::config(format!("Invalid glob '{}': {}", p, e)))
        })
        .collect()
}
