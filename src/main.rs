use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_release::config::{self, ReleaseConfig, CONFIG_FILE_NAME};
use git_release::domain::{PreRelease, Version};
use git_release::git::SystemGit;
use git_release::hooks::HookRegistry;
use git_release::orchestration::ReleaseOrchestrator;
use git_release::ui;
use git_release::version_store;

#[derive(Parser)]
#[command(
    name = "git-release",
    version,
    about = "Release a project: bump the version, run hooks, commit, tag and push"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, global = true, default_value = ".", help = "Project directory")]
    project_dir: PathBuf,

    #[arg(long, help = "Run hooks and update files, but do not commit, tag or push")]
    dry_run: bool,

    #[arg(long, help = "Release this version instead of bumping")]
    release_version: Option<String>,

    #[arg(long, help = "Pre-release version to continue with after the release")]
    next_version: Option<String>,

    #[arg(short, long, global = true, help = "Show debug output")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an explicit pre-release version to the version file
    SetVersion {
        /// New version, e.g. 1.3.0-SNAPSHOT
        version: String,
    },
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "git_release=debug"
    } else {
        "git_release=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: Args) -> Result<()> {
    let project_dir = fs::canonicalize(&args.project_dir).with_context(|| {
        format!("Project directory {} not found", args.project_dir.display())
    })?;
    let mut config = load_config(args.config.as_deref(), &project_dir)?;

    if let Some(Commands::SetVersion { version }) = &args.command {
        return set_version(&config, &project_dir, version);
    }

    config.dry_run |= args.dry_run;
    if args.release_version.is_some() {
        config.release_version = args.release_version.clone();
    }
    if args.next_version.is_some() {
        config.next_version = args.next_version.clone();
    }

    let repository = SystemGit::open(&project_dir, config.git.clone())
        .context("Unable to open git repository")?;
    let scratch_root = repository.git_dir().join("release-hooks");
    debug!("Hook scratch directories under {}", scratch_root.display());

    let hooks = HookRegistry::new().build_all(&config.hooks, &project_dir)?;
    let settings = config.settings(&project_dir, &scratch_root);

    ui::display_status(&format!(
        "Releasing from {}",
        settings.version_file.path.display()
    ));
    let mut orchestrator = ReleaseOrchestrator::new(repository, config.services(), settings, hooks);
    let outcome = orchestrator.run()?;

    ui::display_release_summary(&outcome);
    Ok(())
}

/// Explicit `--config`, then the project's `release.toml`, then the usual lookup
fn load_config(explicit: Option<&Path>, project_dir: &Path) -> Result<ReleaseConfig> {
    let project_config = project_dir.join(CONFIG_FILE_NAME);
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None if project_config.exists() => Some(project_config),
        None => None,
    };

    config::load_config(path.as_deref()).context("Error loading config")
}

fn set_version(config: &ReleaseConfig, project_dir: &Path, version: &str) -> Result<()> {
    let version = Version::parse(version)?;
    let label = PreRelease::parse(&config.pre_release_label)?;
    let default_version = Version::new(0, 1, 0).with_pre_release(Some(label));

    let settings = config.settings(project_dir, project_dir);
    let transition =
        version_store::set_current_version(&settings.version_file, &version, &default_version)?;

    ui::display_success(&format!("Version set: {}", transition));
    Ok(())
}
