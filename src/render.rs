//! Template rendering for hooks, commit messages and tag names.
//!
//! [TemplateRenderer] adapts `minijinja`: `{{ releaseVersion }}`, dotted names,
//! `{% for %}` and `{% if %}` blocks and `{# comments #}`. Output is never
//! HTML-escaped, a block tag alone on its line is removed with that line and
//! the template's trailing newline is kept.

use crate::error::{ReleaseError, Result};
use minijinja::{AutoEscape, Environment, ErrorKind, Template, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::Write;
use tracing::warn;

/// What to do when a template references a variable missing from the context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingVariablePolicy {
    /// Render nothing for the variable
    Ignore,
    /// Log a warning and render nothing
    #[serde(alias = "warn")]
    Warning,
    /// Fail the render
    #[default]
    Exception,
}

/// Evaluates templates against a variable context
pub trait Renderer: Send + Sync {
    /// Render `template` and stream the output into `writer`
    ///
    /// `name` identifies the template in error messages.
    fn render_to(&self, name: &str, template: &str, context: &Value, writer: &mut dyn Write) -> Result<()>;

    /// Render `template` into a string
    fn render(&self, name: &str, template: &str, context: &Value) -> Result<String> {
        let mut buffer = Vec::new();
        self.render_to(name, template, context, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ReleaseError::render(format!("{}: {}", name, e)))
    }
}

/// `minijinja` renderer with a configurable missing-variable policy
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer {
    policy: MissingVariablePolicy,
}

impl TemplateRenderer {
    pub fn new(policy: MissingVariablePolicy) -> Self {
        TemplateRenderer { policy }
    }

    pub fn policy(&self) -> MissingVariablePolicy {
        self.policy
    }

    fn environment<'source>(&self) -> Environment<'source> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(match self.policy {
            // a missing name in an `if` is still just false
            MissingVariablePolicy::Exception => UndefinedBehavior::SemiStrict,
            MissingVariablePolicy::Ignore | MissingVariablePolicy::Warning => {
                UndefinedBehavior::Chainable
            }
        });
        env
    }
}

impl Renderer for TemplateRenderer {
    fn render_to(&self, name: &str, template: &str, context: &Value, writer: &mut dyn Write) -> Result<()> {
        let env = self.environment();
        let compiled = env
            .template_from_named_str(name, template)
            .map_err(|e| render_error(name, &e))?;

        if self.policy == MissingVariablePolicy::Warning {
            for variable in missing_variables(&compiled, context) {
                warn!("Missing template variable in {}: '{}'", name, variable);
            }
        }

        if let Err(e) = compiled.render_to_write(context, &mut *writer) {
            if !matches!(e.kind(), ErrorKind::UndefinedError) {
                return Err(render_error(name, &e));
            }
            let missing: Vec<String> = missing_variables(&compiled, context).into_iter().collect();
            if missing.is_empty() {
                return Err(render_error(name, &e));
            }
            return Err(ReleaseError::render(format!(
                "Unresolved variable in {}: '{}'",
                name,
                missing.join("', '")
            )));
        }

        writer.flush()?;
        Ok(())
    }
}

fn render_error(name: &str, error: &minijinja::Error) -> ReleaseError {
    ReleaseError::render(format!("Unable to render {}: {}", name, error))
}

/// Variables the template reads from the context that the context lacks
fn missing_variables(template: &Template<'_, '_>, context: &Value) -> BTreeSet<String> {
    template
        .undeclared_variables(true)
        .into_iter()
        .filter(|variable| !resolves(context, variable))
        .collect()
}

fn resolves(context: &Value, path: &str) -> bool {
    path.split('.')
        .try_fold(context, |current, part| match current {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .is_some()
}
