use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid version format: {0}")]
    Version(String),

    #[error("Pre-release check failed: {0}")]
    Preflight(String),

    #[error("{} tampered with; please delete it and do edits in {} (re-generate from the template, do not hand-edit the output)", .destination.display(), .template.display())]
    Tampered {
        destination: PathBuf,
        template: PathBuf,
    },

    #[error("Template error: {0}")]
    Render(String),

    #[error("Error executing {command}; exit code {exit_code}{}", format_output(.output))]
    Repository {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Hook failed: {0}")]
    Hook(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

fn format_output(output: &str) -> String {
    if output.trim().is_empty() {
        String::new()
    } else {
        format!("\n{}", output.trim_end())
    }
}

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::Version(msg.into())
    }

    /// Create a pre-release check error with context
    pub fn preflight(msg: impl Into<String>) -> Self {
        ReleaseError::Preflight(msg.into())
    }

    /// Create a template error with context
    pub fn render(msg: impl Into<String>) -> Self {
        ReleaseError::Render(msg.into())
    }

    /// Create a hook error with context
    pub fn hook(msg: impl Into<String>) -> Self {
        ReleaseError::Hook(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReleaseError::config("test config issue");
        assert_eq!(err.to_string(), "Configuration error: test config issue");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReleaseError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_repository_error_includes_output() {
        let err = ReleaseError::Repository {
            command: "git push --porcelain".to_string(),
            exit_code: 128,
            output: "fatal: no upstream configured\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Error executing git push --porcelain; exit code 128"));
        assert!(msg.ends_with("fatal: no upstream configured"));
    }

    #[test]
    fn test_repository_error_without_output() {
        let err = ReleaseError::Repository {
            command: "git add .".to_string(),
            exit_code: 1,
            output: "  \n".to_string(),
        };
        assert_eq!(err.to_string(), "Error executing git add .; exit code 1");
    }

    #[test]
    fn test_tampered_names_both_files() {
        let err = ReleaseError::Tampered {
            destination: PathBuf::from("README.md"),
            template: PathBuf::from("templates/README.md"),
        };
        let msg = err.to_string();
        assert!(msg.contains("README.md tampered with"));
        assert!(msg.contains("templates/README.md"));
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (ReleaseError::config("x"), "Configuration error"),
            (ReleaseError::version("x"), "Invalid version format"),
            (ReleaseError::preflight("x"), "Pre-release check failed"),
            (ReleaseError::render("x"), "Template error"),
            (ReleaseError::hook("x"), "Hook failed"),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }
}
