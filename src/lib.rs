//! git-deps - commit dependency discovery
//!
//! Commit B depends on commit A when B's diff touches lines that A last
//! modified. Starting from one or more revisions, the detector diffs each
//! commit against its first parent, blames the touched lines in the parent
//! and records one edge per blamed commit, optionally following those
//! dependencies until the history is exhausted.
//!
//! Modules, leaves first:
//! - [`git`] - backend boundary: revisions, diffs, trees, merge bases, blame
//! - [`detector`] - worklist traversal and the evidence-carrying graph
//! - [`listener`] - discovery events and the shipped consumers
//! - [`config`] - detector options and the `git-deps.toml` project file

pub mod config;
pub mod detector;
pub mod error;
pub mod git;
pub mod listener;

pub use config::{AttributionStrategy, DetectorOptions};
pub use detector::{DependencyDetector, DependencyGraph, Evidence};
pub use error::{DepsError, Result};
pub use listener::{CliListener, DependencyEvent, DependencyListener, JsonListener};
