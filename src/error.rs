//! Error types for dependency discovery

use crate::git::CommitId;
use thiserror::Error;

/// Errors that abort a discovery run.
///
/// Recoverable conditions (a path missing from the parent tree, a hunk
/// with nothing to blame) never surface here; they are logged and skipped.
#[derive(Error, Debug)]
pub enum DepsError {
    #[error("Couldn't resolve revision '{revision}': {reason}")]
    UnresolvableRevision { revision: String, reason: String },

    #[error("Commit {0} was never resolved in this session")]
    UnknownCommit(CommitId),

    #[error(
        "line {line} already found when blaming {path} for {dependent} -> {dependency}\n\
         old:\n  {existing}\nnew:\n  {attempted}"
    )]
    DuplicateEvidence {
        dependent: CommitId,
        dependency: CommitId,
        path: String,
        line: u32,
        existing: String,
        attempted: String,
    },

    #[error("Commit {0} was attributed as a dependency of itself")]
    SelfDependency(CommitId),

    #[error("git blame of {path} at {commit} failed ({status}): {stderr}")]
    AttributionFailed {
        path: String,
        commit: String,
        status: String,
        stderr: String,
    },

    #[error("Malformed blame porcelain line '{line}': {reason}")]
    Porcelain { line: String, reason: String },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DepsError>;
