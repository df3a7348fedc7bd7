//! Version-control backend boundary
//!
//! Everything the dependency engine needs from git goes through the
//! [`GitBackend`] and [`LineAttributor`] traits:
//!
//! - Resolve revisions to immutable [`Commit`] values
//! - Diff a commit against a chosen parent ([`hunks`])
//! - Look paths up in a commit's tree
//! - Answer merge-base queries for ancestry tests
//! - Blame a line range as of a commit ([`blame`], [`blame_process`])
//!
//! [`GitRepo`] implements the backend on top of libgit2 via the `git2` crate.
//!
//! # Example
//!
//! ```no_run
//! use git_deps::git::{GitBackend, GitRepo};
//! use std::path::Path;
//!
//! let repo = GitRepo::open(Path::new("/path/to/repo")).unwrap();
//! let head = repo.resolve_revision("HEAD").unwrap();
//! println!("{} {}", head.id.short(), head.summary);
//! ```

pub mod blame;
pub mod blame_process;
pub mod hunks;
pub mod repo;

pub use blame::{attributor_for, BlameLine, LineAttributor, NativeBlame};
pub use blame_process::SubprocessBlame;
pub use hunks::{DiffLine, Hunk, HunkAnalyzer, HunkStream, LineOrigin};
pub use repo::GitRepo;

use crate::error::Result;
use serde::Serialize;
use std::fmt;

/// Length of abbreviated hashes in logs and human output.
pub const SHORT_HASH_LEN: usize = 8;

/// Full hex digest identifying a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(SHORT_HASH_LEN)]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<git2::Oid> for CommitId {
    fn from(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }
}

/// Author identity and timestamp of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Seconds since the epoch
    pub time: i64,
    /// Timezone offset in minutes
    pub offset_minutes: i32,
}

/// An immutable, resolved commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: CommitId,
    /// Parent hashes, first parent first
    pub parents: Vec<CommitId>,
    /// Root tree hash
    pub tree: String,
    /// First line of the message
    pub summary: String,
    pub message: String,
    pub author: Signature,
}

impl Commit {
    pub fn first_parent(&self) -> Option<&CommitId> {
        self.parents.first()
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// `<short hash> <summary>`, like `git log --oneline`.
    pub fn oneline(&self) -> String {
        format!("{} {}", self.id.short(), self.summary)
    }
}

/// Kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Blob,
    Tree,
    /// Gitlink (submodule)
    Commit,
}

/// Result of a successful tree lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub id: String,
    pub kind: EntryKind,
}

/// Capabilities the dependency engine requires from a git backend.
pub trait GitBackend {
    /// Resolve any revision string (hash, ref, `HEAD~2`, ...) to a commit.
    fn resolve_revision(&self, revision: &str) -> Result<Commit>;

    /// Hunks of the diff from `parent` to `child`, one file at a time.
    fn diff<'a>(&'a self, parent: &Commit, child: &Commit, context_lines: u32)
        -> Result<HunkStream<'a>>;

    /// Walk `path` (slash separated, possibly nested) in the commit's tree.
    fn tree_lookup(&self, path: &str, commit: &Commit) -> Result<Option<TreeEntry>>;

    /// Best common ancestor of `a` and `b`, if they share history.
    fn merge_base(&self, a: &CommitId, b: &CommitId) -> Result<Option<CommitId>>;
}
