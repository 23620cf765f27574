// tests/config_test.rs
use git_release::config::{load_config, CONFIG_FILE_NAME};
use git_release::domain::VersionBump;
use git_release::hooks::HookSpec;
use git_release::render::MissingVariablePolicy;
use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("release.toml")
}

#[test]
fn test_load_full_fixture() {
    let config = load_config(Some(&fixture())).unwrap();

    assert_eq!(config.release_commit_message, "chore(release): {{releaseVersion}}");
    assert_eq!(config.version_tag_template, "release-{{releaseVersion}}");
    // not set in the file
    assert_eq!(
        config.version_tag_commit_message,
        "[Release] - creating tag: {{preReleaseVersion}} -> {{releaseVersion}}"
    );
    assert_eq!(config.release_bump, VersionBump::Minor);
    assert_eq!(config.next_version_bump, VersionBump::Patch);
    assert_eq!(config.pre_release_label, "alpha");
    assert_eq!(config.missing_template_variable, MissingVariablePolicy::Warning);

    assert_eq!(config.version_properties.file, PathBuf::from("version.properties"));
    assert_eq!(config.version_properties.property, "projectVersion");

    assert_eq!(config.pre_release_checks.release_branch_pattern, "main|release/.*");
    assert!(!config.pre_release_checks.fail_on_untracked_files);
    assert!(config.pre_release_checks.fail_on_uncommitted_files);

    assert!(config.git.sign_tag);
    assert_eq!(config.git.commit_options, vec!["--no-verify".to_string()]);

    assert_eq!(config.hooks.len(), 3);
    match &config.hooks[0] {
        HookSpec::Template(spec) => {
            assert_eq!(spec.excludes, vec!["drafts/*".to_string()]);
            assert_eq!(spec.properties["projectName"], "demo");
            assert_eq!(spec.rename.len(), 1);
            assert_eq!(spec.rename[0].pattern, "\\.tmpl$");
        }
        other => panic!("expected a template hook, got {}", other),
    }
    assert!(matches!(config.hooks[1], HookSpec::Replacement(_)));
    assert!(matches!(config.hooks[2], HookSpec::Script(_)));
}

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
dry_run = true
release_version = "3.0.0"

[pre_release_checks]
release_branch_pattern = ""
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(Some(temp_file.path())).unwrap();
    assert!(config.dry_run);
    assert_eq!(config.release_version.as_deref(), Some("3.0.0"));
    assert_eq!(config.pre_release_checks.release_branch_pattern, "");
    assert!(config.hooks.is_empty());
}

#[test]
fn test_invalid_toml_is_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"release_bump = \"sideways\"\n").unwrap();
    temp_file.flush().unwrap();

    assert!(load_config(Some(temp_file.path())).is_err());
}

#[test]
fn test_unknown_hook_type_is_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[[hooks]]\ntype = \"deploy\"\n")
        .unwrap();
    temp_file.flush().unwrap();

    assert!(load_config(Some(temp_file.path())).is_err());
}

#[test]
fn test_missing_explicit_file_is_error() {
    assert!(load_config(Some(Path::new("/nonexistent/release.toml"))).is_err());
}

#[test]
#[serial]
fn test_load_from_current_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE_NAME), "pre_release_label = \"beta\"\n").unwrap();

    let original = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    let result = load_config(None);
    env::set_current_dir(original).unwrap();

    assert_eq!(result.unwrap().pre_release_label, "beta");
}

#[test]
#[serial]
fn test_parse_error_in_current_directory_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE_NAME), "increment_after_release = 3\n").unwrap();

    let original = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    let result = load_config(None);
    env::set_current_dir(original).unwrap();

    assert!(result.is_err());
}
