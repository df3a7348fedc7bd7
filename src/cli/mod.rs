//! Command-line front end

use anyhow::{Context, Result};
use clap::Parser;
use git_deps::config::{load_project_config, AttributionStrategy, DetectorOptions, OutputFormat, ProjectConfig};
use git_deps::detector::DependencyDetector;
use git_deps::git::{attributor_for, GitRepo};
use git_deps::listener::{CliListener, JsonListener};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Find the commits a commit depends on
///
/// A commit depends on an earlier commit when its diff touches lines that
/// the earlier commit last modified.
#[derive(Parser, Debug)]
#[command(name = "git-deps")]
#[command(
    version,
    after_help = "\
Examples:
  git-deps HEAD                        Direct dependencies of HEAD
  git-deps -r HEAD                     Follow dependencies recursively
  git-deps -r -e origin/main topic     Stop at commits already on origin/main
  git-deps -l main..topic              git-log style summary for a range
  git-deps -j -r HEAD > deps.json      JSON graph for other tools"
)]
pub struct Cli {
    /// Revisions to analyze; `A..B` expands to every commit in the range
    #[arg(required = true, value_name = "REVISION")]
    pub revisions: Vec<String>,

    /// Follow dependencies recursively
    #[arg(short = 'r', long, overrides_with = "no_recurse")]
    pub recurse: bool,

    /// Stop after direct dependencies, even if the project file recurses
    #[arg(long, overrides_with = "recurse")]
    pub no_recurse: bool,

    /// Number of diff context lines
    #[arg(short = 'c', long, value_name = "N", env = "GIT_DEPS_CONTEXT_LINES")]
    pub context_lines: Option<u32>,

    /// Exclude dependencies reachable from this revision (repeatable)
    #[arg(short = 'e', long = "exclude-commits", value_name = "REV")]
    pub exclude_commits: Vec<String>,

    /// Line attribution strategy
    #[arg(long, value_enum, env = "GIT_DEPS_BLAME")]
    pub blame: Option<AttributionStrategy>,

    /// Print the dependency graph as JSON
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Show git-log style summaries instead of bare hashes
    #[arg(short = 'l', long)]
    pub log: bool,

    /// Shortcut for --log-level debug
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Repository to analyze (default: current directory)
    #[arg(short = 'C', long = "repo", default_value = ".")]
    pub repo: PathBuf,
}

/// Flags win over the project file.
fn detector_options(file: DetectorOptions, cli: &Cli) -> DetectorOptions {
    let mut options = file;
    if cli.recurse {
        options.recurse = true;
    } else if cli.no_recurse {
        options.recurse = false;
    }
    if let Some(context_lines) = cli.context_lines {
        options.context_lines = context_lines;
    }
    if !cli.exclude_commits.is_empty() {
        options.exclude_commits = cli.exclude_commits.clone();
    }
    if let Some(blame) = cli.blame {
        options.attribution = blame;
    }
    options
}

pub fn run(cli: Cli) -> Result<()> {
    let repo = GitRepo::open(&cli.repo)
        .with_context(|| format!("{} is not inside a git repository", cli.repo.display()))?;
    let config: ProjectConfig = repo.workdir().map(load_project_config).unwrap_or_default();
    let options = detector_options(config.detector, &cli);
    let json = cli.json || config.output.format == OutputFormat::Json;
    let log = cli.log || config.output.log;
    debug!("Detector options: {:?}", options);

    let mut seeds = Vec::new();
    for revision in &cli.revisions {
        let expanded = repo
            .expand_revision(revision)
            .with_context(|| format!("Couldn't expand revision '{}'", revision))?;
        seeds.extend(expanded);
    }
    if seeds.is_empty() {
        warn!("No commits in {}", cli.revisions.join(" "));
        return Ok(());
    }

    let attributor = attributor_for(options.attribution, &repo)?;
    let multi = options.recurse || seeds.len() > 1;
    let mut detector = DependencyDetector::new(repo, attributor, options)
        .context("Couldn't resolve excluded commits")?;

    if json {
        detector.add_listener(JsonListener::with_writer(std::io::stdout()));
    } else {
        let listener = CliListener::new(std::io::stdout(), multi, log)
            .with_color(console::colors_enabled());
        detector.add_listener(listener);
    }
    detector.find_dependencies(&seeds)?;
    Ok(())
}
