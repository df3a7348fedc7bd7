//! Configuration for git-deps
//!
//! This module handles:
//! - Detector options consumed by the dependency engine
//! - Project-level configuration (`git-deps.toml` / `.git-deps.toml`)
//! - Output defaults for the command-line front end
//!
//! # Configuration Format
//!
//! ```toml
//! # git-deps.toml
//!
//! [detector]
//! recurse = true
//! context_lines = 1
//! exclude_commits = ["origin/main"]
//! attribution = "native"   # or "subprocess"
//!
//! [output]
//! format = "json"          # or "text"
//! log = false
//! ```

use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// File names searched for in the repository root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["git-deps.toml", ".git-deps.toml"];

/// Default number of diff context lines.
pub const DEFAULT_CONTEXT_LINES: u32 = 1;

/// How line attribution is obtained from git.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttributionStrategy {
    /// libgit2 blame, in process
    Native,
    /// `git blame --porcelain` in a child process
    #[default]
    Subprocess,
}

impl fmt::Display for AttributionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributionStrategy::Native => write!(f, "native"),
            AttributionStrategy::Subprocess => write!(f, "subprocess"),
        }
    }
}

/// Options recognized by the dependency engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Follow dependencies transitively instead of one level only
    pub recurse: bool,
    /// Diff context window; wider windows attribute more surrounding lines
    pub context_lines: u32,
    /// Revisions whose ancestors (inclusive) never become dependencies
    pub exclude_commits: Vec<String>,
    pub attribution: AttributionStrategy,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            recurse: false,
            context_lines: DEFAULT_CONTEXT_LINES,
            exclude_commits: Vec::new(),
            attribution: AttributionStrategy::default(),
        }
    }
}

impl DetectorOptions {
    pub fn recursive(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn with_context_lines(mut self, context_lines: u32) -> Self {
        self.context_lines = context_lines;
        self
    }

    pub fn with_exclude_commits<I, S>(mut self, revisions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_commits = revisions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attribution(mut self, attribution: AttributionStrategy) -> Self {
        self.attribution = attribution;
        self
    }
}

/// Result rendering used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// `[output]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Show git-log style summaries instead of bare hashes
    pub log: bool,
}

/// Project-level configuration loaded from git-deps.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub detector: DetectorOptions,
    pub output: OutputConfig,
}

/// Load project configuration from the repository root.
///
/// Missing files give defaults; unreadable or invalid files are logged and
/// ignored.
pub fn load_project_config(repo_root: &Path) -> ProjectConfig {
    for name in CONFIG_FILE_NAMES {
        let path = repo_root.join(name);
        if !path.exists() {
            continue;
        }
        match load_toml_config(&path) {
            Ok(config) => {
                debug!("Loaded project config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

/// Load configuration from a TOML file
fn load_toml_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content)?;
    Ok(config)
}
