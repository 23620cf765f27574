// tests/git_repository_test.rs
//
// Runs against the system git binary. Skipped when git is missing or too old.
use git2::{Repository as Git2Repo, RepositoryInitOptions, Signature};
use git_release::config::ReleaseConfig;
use git_release::git::compat::{parse_git_version, MINIMUM_GIT_VERSION};
use git_release::git::{GitSettings, Repository, SystemGit};
use git_release::hooks::{HookRegistry, HookSpec, TemplateHookSpec};
use git_release::orchestration::ReleaseOrchestrator;
use git_release::ReleaseError;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn git_available() -> bool {
    match Command::new("git").arg("version").output() {
        Ok(output) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout);
            parse_git_version(&text)
                .map(|version| version >= MINIMUM_GIT_VERSION)
                .unwrap_or(false)
        }
        _ => false,
    }
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A work tree on `main` with one pushed commit and a bare `origin`
struct Fixture {
    work: TempDir,
    origin: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let work = TempDir::new().unwrap();
        let origin = TempDir::new().unwrap();
        Git2Repo::init_bare(origin.path()).unwrap();

        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Git2Repo::init_opts(work.path(), &opts).unwrap();

        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Release Bot").unwrap();
            config.set_str("user.email", "release@example.com").unwrap();
            config.set_bool("commit.gpgsign", false).unwrap();
            config.set_bool("tag.gpgsign", false).unwrap();
        }

        fs::write(work.path().join("gradle.properties"), "version=0.3.0-SNAPSHOT\n").unwrap();
        fs::create_dir_all(work.path().join("templates")).unwrap();
        fs::write(
            work.path().join("templates").join("VERSION.txt"),
            "{{releaseVersion}}\n",
        )
        .unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("gradle.properties")).unwrap();
        index.add_path(Path::new("templates/VERSION.txt")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("Release Bot", "release@example.com").unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "Initial commit", &tree, &[])
            .unwrap();

        repo.remote("origin", origin.path().to_str().unwrap()).unwrap();
        git(work.path(), &["push", "-u", "origin", "main"]);

        Fixture { work, origin }
    }

    fn path(&self) -> &Path {
        self.work.path()
    }

    fn open(&self) -> SystemGit {
        SystemGit::open(self.path(), GitSettings::default()).unwrap()
    }
}

#[test]
fn test_branch_and_status() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let repo = fixture.open();

    assert_eq!(repo.current_branch().unwrap(), "main");
    assert!(repo.status().unwrap().is_clean());

    fs::write(fixture.path().join("notes.txt"), "todo").unwrap();
    fs::write(fixture.path().join("gradle.properties"), "version=9.9.9\n").unwrap();

    let status = repo.status().unwrap();
    let untracked: Vec<&str> = status.untracked().iter().map(|p| p.path.as_str()).collect();
    let uncommitted: Vec<&str> = status.uncommitted().iter().map(|p| p.path.as_str()).collect();
    assert_eq!(untracked, vec!["notes.txt"]);
    assert_eq!(uncommitted, vec!["gradle.properties"]);
}

#[test]
fn test_detached_head_has_no_branch() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    git(fixture.path(), &["checkout", "--detach"]);
    let repo = fixture.open();

    let err = repo.current_branch().unwrap_err();
    assert!(matches!(err, ReleaseError::Preflight(_)), "unexpected {}", err);
    assert!(err.to_string().contains("Unable to determine current branch"));
}

#[test]
fn test_remote_status_counts_local_commits() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let repo = fixture.open();

    let remote = repo.remote_status().unwrap();
    assert_eq!((remote.commits_ahead, remote.commits_behind), (0, 0));

    fs::write(fixture.path().join("CHANGELOG.md"), "# Changes\n").unwrap();
    repo.stage_all().unwrap();
    repo.commit("Add changelog").unwrap();

    let remote = repo.remote_status().unwrap();
    assert_eq!((remote.commits_ahead, remote.commits_behind), (1, 0));
}

#[test]
fn test_restore_discards_changes() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let repo = fixture.open();
    let file = fixture.path().join("gradle.properties");

    fs::write(&file, "version=0.3.0\n").unwrap();
    repo.restore(&file).unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), "version=0.3.0-SNAPSHOT\n");
}

#[test]
fn test_failed_command_carries_output() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let repo = fixture.open();

    // nothing staged
    let err = repo.commit("empty").unwrap_err();
    match err {
        ReleaseError::Repository {
            command,
            exit_code,
            output,
        } => {
            assert!(command.starts_with("git commit -m empty"));
            assert_ne!(exit_code, 0);
            assert!(output.contains("nothing"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_open_empty_repository_fails() {
    if !git_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    Git2Repo::init(dir.path()).unwrap();
    let err = SystemGit::open(dir.path(), GitSettings::default()).err().unwrap();
    assert!(err.to_string().contains("empty"));
}

#[test]
fn test_release_against_real_repository() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let repo = fixture.open();
    let scratch_root = repo.git_dir().join("release-hooks");

    let config = ReleaseConfig {
        hooks: vec![HookSpec::Template(TemplateHookSpec::new("templates", "."))],
        ..ReleaseConfig::default()
    };
    let hooks = HookRegistry::new()
        .build_all(&config.hooks, fixture.path())
        .unwrap();
    let mut release = ReleaseOrchestrator::new(
        repo,
        config.services(),
        config.settings(fixture.path(), &scratch_root),
        hooks,
    );

    let outcome = release.run().unwrap();
    assert_eq!(outcome.tag.as_deref(), Some("v0.3.0"));
    assert_eq!(
        fs::read_to_string(fixture.path().join("gradle.properties")).unwrap(),
        "version=0.3.1-SNAPSHOT\n"
    );
    assert!(release.repository().status().unwrap().is_clean());

    let origin = Git2Repo::open_bare(fixture.origin.path()).unwrap();
    let tag = origin
        .find_reference("refs/tags/v0.3.0")
        .unwrap()
        .peel_to_tag()
        .unwrap();
    assert_eq!(
        tag.message().unwrap().trim(),
        "[Release] - creating tag: 0.3.0-SNAPSHOT -> 0.3.0"
    );

    let head = origin
        .find_reference("refs/heads/main")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(
        head.message().unwrap().trim(),
        "[Release] - new version commit: 0.3.0 -> 0.3.1-SNAPSHOT"
    );
    let release_commit = head.parent(0).unwrap();
    assert_eq!(
        release_commit.message().unwrap().trim(),
        "[Release] - release commit: 0.3.0-SNAPSHOT -> 0.3.0"
    );

    // the rendered file and its checksum sidecar were committed with the release
    let tree = release_commit.tree().unwrap();
    assert!(tree.get_path(Path::new("VERSION.txt")).is_ok());
    assert!(tree.get_path(Path::new("templates/VERSION.txt.sha256")).is_ok());
}
