//! Renders a directory of templates into the project.
//!
//! Every rendered file gets a checksum sidecar next to its template. The next
//! release refuses to run if the generated file was edited by hand in between.

use crate::checksum::CHECKSUM_EXTENSION;
use crate::error::{ReleaseError, Result};
use crate::hooks::{HookContext, HookServices, PathFilter, PreReleaseHook};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Version rendered while validating, before the real one is known
pub const PLACEHOLDER_VERSION: &str = "99.99.99";

/// Regex rewrite of a template's relative path into its destination path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRule {
    pub pattern: String,
    pub replacement: String,
}

/// Configuration of a template hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateHookSpec {
    pub source_dir: PathBuf,
    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,
    /// Glob patterns on the `/`-separated path relative to `source_dir`; empty selects all
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Extra template variables
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default = "default_prevent_tampering")]
    pub prevent_tampering: bool,
    #[serde(default)]
    pub rename: Vec<RenameRule>,
}

fn default_destination_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_prevent_tampering() -> bool {
    true
}

impl TemplateHookSpec {
    pub fn new(source_dir: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        TemplateHookSpec {
            source_dir: source_dir.into(),
            destination_dir: destination_dir.into(),
            includes: Vec::new(),
            excludes: Vec::new(),
            properties: BTreeMap::new(),
            prevent_tampering: true,
            rename: Vec::new(),
        }
    }
}

/// A template file and the file it renders to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePair {
    /// Path relative to the source directory, `/`-separated
    pub name: String,
    pub template: PathBuf,
    pub destination: PathBuf,
}

/// Renders templates from a source directory into a destination directory
#[derive(Debug)]
pub struct TemplateHook {
    source_dir: PathBuf,
    destination_dir: PathBuf,
    filter: PathFilter,
    rename: Vec<(Regex, String)>,
    properties: BTreeMap<String, Value>,
    prevent_tampering: bool,
}

impl TemplateHook {
    /// Build the hook, resolving relative directories against `project_dir`
    pub fn new(spec: &TemplateHookSpec, project_dir: &Path) -> Result<Self> {
        let includes = if spec.includes.is_empty() {
            vec!["**/*".to_string()]
        } else {
            spec.includes.clone()
        };
        let mut excludes = spec.excludes.clone();
        excludes.push(format!("**/*.{}", CHECKSUM_EXTENSION));

        let rename = spec
            .rename
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|regex| (regex, rule.replacement.clone()))
                    .map_err(|e| {
                        ReleaseError::config(format!("Invalid rename pattern '{}': {}", rule.pattern, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TemplateHook {
            source_dir: project_dir.join(&spec.source_dir),
            destination_dir: project_dir.join(&spec.destination_dir),
            filter: PathFilter::new(&includes, &excludes)?,
            rename,
            properties: spec.properties.clone(),
            prevent_tampering: spec.prevent_tampering,
        })
    }

    /// Templates selected by the include/exclude patterns, sorted by path
    pub fn pairs(&self) -> Result<Vec<TemplatePair>> {
        if !self.source_dir.is_dir() {
            return Err(ReleaseError::config(format!(
                "Template directory {} does not exist",
                self.source_dir.display()
            )));
        }

        let mut pairs = Vec::new();
        for entry in WalkDir::new(&self.source_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ReleaseError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = PathFilter::relative_name(&self.source_dir, entry.path()) else {
                continue;
            };
            if !self.filter.matches(&name) {
                continue;
            }

            let destination = self.destination_dir.join(self.destination_name(&name));
            pairs.push(TemplatePair {
                name,
                template: entry.path().to_path_buf(),
                destination,
            });
        }
        Ok(pairs)
    }

    fn destination_name(&self, name: &str) -> String {
        self.rename
            .iter()
            .fold(name.to_string(), |current, (regex, replacement)| {
                regex.replace_all(&current, replacement.as_str()).into_owned()
            })
    }

    /// Built-in version variables overlaid by the user properties
    fn context(&self, mut variables: serde_json::Map<String, Value>) -> Value {
        variables.extend(
            self.properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Value::Object(variables)
    }

    fn placeholder_context(&self) -> Value {
        let mut variables = serde_json::Map::new();
        for key in ["previousVersion", "preReleaseVersion", "releaseVersion"] {
            variables.insert(key.to_string(), Value::String(PLACEHOLDER_VERSION.to_string()));
        }
        self.context(variables)
    }
}

impl PreReleaseHook for TemplateHook {
    fn name(&self) -> &str {
        "template"
    }

    fn validate(&self, services: &HookServices) -> Result<()> {
        let context = self.placeholder_context();
        for pair in self.pairs()? {
            let template = fs::read_to_string(&pair.template)?;
            services
                .renderer
                .render_to(&pair.name, &template, &context, &mut io::sink())?;
            if self.prevent_tampering {
                services.checksums.verify(&pair.template, &pair.destination)?;
            }
        }
        Ok(())
    }

    fn execute(&self, services: &HookServices, context: &HookContext) -> Result<()> {
        let variables = self.context(context.variables());
        let pairs = self.pairs()?;

        for pair in &pairs {
            debug!("Rendering {} to {}", pair.name, pair.destination.display());
            let template = fs::read_to_string(&pair.template)?;
            if let Some(parent) = pair.destination.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut writer = BufWriter::new(File::create(&pair.destination)?);
            services
                .renderer
                .render_to(&pair.name, &template, &variables, &mut writer)?;
            drop(writer);

            if self.prevent_tampering {
                services.checksums.record(&pair.template, &pair.destination)?;
            }
        }

        if context.dry_run {
            // output stays on disk so it can be inspected
            info!(
                "Dry run: rendered {} template(s) into {}; nothing will be committed",
                pairs.len(),
                self.destination_dir.display()
            );
        } else {
            info!(
                "Rendered {} template(s) into {}",
                pairs.len(),
                self.destination_dir.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::ChecksumGuard;
    use crate::domain::Version;
    use crate::render::TemplateRenderer;
    use tempfile::TempDir;

    fn services() -> HookServices {
        HookServices::new(Box::new(TemplateRenderer::default()))
    }

    fn context(dir: &TempDir, dry_run: bool) -> HookContext {
        HookContext {
            previous_version: Version::parse("1.2.3-SNAPSHOT").unwrap(),
            release_version: Version::parse("1.2.3").unwrap(),
            working_directory: dir.path().join("scratch"),
            dry_run,
        }
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let templates = dir.path().join("templates");
        fs::create_dir_all(templates.join("docs")).unwrap();
        fs::write(templates.join("README.md"), "Hello from {{releaseVersion}}").unwrap();
        fs::write(
            templates.join("docs").join("install.md"),
            "Upgrade from {{previousVersion}} to {{releaseVersion}}",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_pairs_are_sorted_and_skip_sidecars() {
        let dir = project();
        fs::write(dir.path().join("templates").join("README.md.sha256"), "abc").unwrap();

        let hook = TemplateHook::new(&TemplateHookSpec::new("templates", "."), dir.path()).unwrap();
        let names: Vec<String> = hook.pairs().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["README.md".to_string(), "docs/install.md".to_string()]);
    }

    #[test]
    fn test_includes_and_excludes() {
        let dir = project();
        let mut spec = TemplateHookSpec::new("templates", ".");
        spec.includes = vec!["**/*.md".to_string()];
        spec.excludes = vec!["docs/*.md".to_string()];

        let hook = TemplateHook::new(&spec, dir.path()).unwrap();
        let names: Vec<String> = hook.pairs().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["README.md".to_string()]);
    }

    #[test]
    fn test_rename_rules() {
        let dir = project();
        let mut spec = TemplateHookSpec::new("templates", "out");
        spec.rename = vec![RenameRule {
            pattern: r"^docs/".to_string(),
            replacement: "manual/".to_string(),
        }];

        let hook = TemplateHook::new(&spec, dir.path()).unwrap();
        let pairs = hook.pairs().unwrap();
        assert_eq!(
            pairs[1].destination,
            dir.path().join("out").join("manual/install.md")
        );
    }

    #[test]
    fn test_invalid_rename_pattern_is_config_error() {
        let dir = project();
        let mut spec = TemplateHookSpec::new("templates", ".");
        spec.rename = vec![RenameRule {
            pattern: "(".to_string(),
            replacement: String::new(),
        }];
        let err = TemplateHook::new(&spec, dir.path()).unwrap_err();
        assert!(matches!(err, ReleaseError::Config(_)));
    }

    #[test]
    fn test_missing_source_dir() {
        let dir = TempDir::new().unwrap();
        let hook = TemplateHook::new(&TemplateHookSpec::new("templates", "."), dir.path()).unwrap();
        assert!(hook.pairs().is_err());
    }

    #[test]
    fn test_execute_renders_and_records_checksums() {
        let dir = project();
        let hook = TemplateHook::new(&TemplateHookSpec::new("templates", "."), dir.path()).unwrap();
        hook.execute(&services(), &context(&dir, false)).unwrap();

        let readme = dir.path().join("README.md");
        assert_eq!(fs::read_to_string(&readme).unwrap(), "Hello from 1.2.3");
        assert_eq!(
            fs::read_to_string(dir.path().join("docs").join("install.md")).unwrap(),
            "Upgrade from 1.2.3-SNAPSHOT to 1.2.3"
        );

        let sidecar = ChecksumGuard::sidecar_path(&dir.path().join("templates").join("README.md"));
        assert_eq!(
            fs::read_to_string(sidecar).unwrap(),
            crate::checksum::digest(b"Hello from 1.2.3")
        );
    }

    #[test]
    fn test_user_properties_are_available() {
        let dir = project();
        fs::write(
            dir.path().join("templates").join("README.md"),
            "{{name}} {{releaseVersion}}",
        )
        .unwrap();
        let mut spec = TemplateHookSpec::new("templates", ".");
        spec.properties.insert("name".to_string(), Value::String("demo".to_string()));
        // user properties override the built-in variables
        spec.properties
            .insert("releaseVersion".to_string(), Value::String("0.0.0".to_string()));

        let hook = TemplateHook::new(&spec, dir.path()).unwrap();
        hook.execute(&services(), &context(&dir, false)).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("README.md")).unwrap(),
            "demo 0.0.0"
        );
    }

    #[test]
    fn test_validate_detects_tampering() {
        let dir = project();
        let hook = TemplateHook::new(&TemplateHookSpec::new("templates", "."), dir.path()).unwrap();
        let services = services();

        hook.validate(&services).unwrap();
        hook.execute(&services, &context(&dir, false)).unwrap();
        hook.validate(&services).unwrap();

        fs::write(dir.path().join("README.md"), "Hello from a hand edit").unwrap();
        let err = hook.validate(&services).unwrap_err();
        assert!(matches!(err, ReleaseError::Tampered { .. }));
    }

    #[test]
    fn test_validate_without_tamper_prevention_skips_checks() {
        let dir = project();
        let mut spec = TemplateHookSpec::new("templates", ".");
        spec.prevent_tampering = false;
        let hook = TemplateHook::new(&spec, dir.path()).unwrap();

        hook.execute(&services(), &context(&dir, false)).unwrap();
        assert!(!ChecksumGuard::sidecar_path(&dir.path().join("templates").join("README.md")).exists());

        fs::write(dir.path().join("README.md"), "edited").unwrap();
        hook.validate(&services()).unwrap();
    }

    #[test]
    fn test_validate_reports_template_errors() {
        let dir = project();
        fs::write(
            dir.path().join("templates").join("README.md"),
            "{% for item in items %}never closed",
        )
        .unwrap();
        let hook = TemplateHook::new(&TemplateHookSpec::new("templates", "."), dir.path()).unwrap();
        let err = hook.validate(&services()).unwrap_err();
        assert!(matches!(err, ReleaseError::Render(_)));
    }

    #[test]
    fn test_validate_renders_even_without_tamper_prevention() {
        let dir = project();
        fs::write(dir.path().join("templates").join("README.md"), "{{ vendor }}").unwrap();
        let mut spec = TemplateHookSpec::new("templates", ".");
        spec.prevent_tampering = false;
        let hook = TemplateHook::new(&spec, dir.path()).unwrap();

        let err = hook.validate(&services()).unwrap_err();
        assert!(matches!(err, ReleaseError::Render(_)));
        assert!(err.to_string().contains("'vendor'"));
        assert!(!dir.path().join("README.md").exists());
    }

    #[test]
    fn test_dry_run_still_writes_output_and_sidecar() {
        let dir = project();
        let hook = TemplateHook::new(&TemplateHookSpec::new("templates", "."), dir.path()).unwrap();
        hook.execute(&services(), &context(&dir, true)).unwrap();

        assert!(dir.path().join("README.md").exists());
        assert!(ChecksumGuard::sidecar_path(&dir.path().join("templates").join("README.md")).exists());
    }
}
