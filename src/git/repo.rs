//! libgit2-backed implementation of [`GitBackend`]
//!
//! Resolves revisions, diffs commits against parents, walks trees and
//! answers merge-base queries using the git2 crate (Rust bindings to libgit2).

use super::hunks::GitHunks;
use super::{Commit, CommitId, EntryKind, GitBackend, HunkStream, Signature, TreeEntry};
use crate::error::{DepsError, Result};
use git2::{DiffOptions, ErrorCode, ObjectType, Oid, Repository, Sort};
use std::path::Path;
use tracing::debug;

/// Git repository handle used as the dependency engine's backend.
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open the repository containing `path` (or any subdirectory of it).
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)?;
        debug!("Opened git repository at {:?}", repo.path());
        Ok(Self { repo })
    }

    /// The `.git` directory (or the repository itself when bare).
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Work tree root, if the repository has one.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Expand a revision argument into commit hashes.
    ///
    /// `A..B` yields every commit reachable from `B` but not from `A`,
    /// in topological order; anything else is returned unchanged.
    pub fn expand_revision(&self, revision: &str) -> Result<Vec<String>> {
        if !revision.contains("..") {
            return Ok(vec![revision.to_string()]);
        }

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL)?;
        revwalk
            .push_range(revision)
            .map_err(|e| DepsError::UnresolvableRevision {
                revision: revision.to_string(),
                reason: e.message().to_string(),
            })?;

        let mut commits = Vec::new();
        for oid_result in revwalk {
            commits.push(oid_result?.to_string());
        }
        debug!("Range {} expanded to {} commits", revision, commits.len());
        Ok(commits)
    }

    fn find_commit(&self, id: &CommitId) -> Result<git2::Commit<'_>> {
        let oid = Oid::from_str(id.as_str())?;
        Ok(self.repo.find_commit(oid)?)
    }
}

impl GitBackend for GitRepo {
    fn resolve_revision(&self, revision: &str) -> Result<Commit> {
        let unresolvable = |e: git2::Error| DepsError::UnresolvableRevision {
            revision: revision.to_string(),
            reason: e.message().to_string(),
        };
        let commit = self
            .repo
            .revparse_single(revision)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(unresolvable)?;
        Ok(extract_commit(&commit))
    }

    fn diff<'a>(
        &'a self,
        parent: &Commit,
        child: &Commit,
        context_lines: u32,
    ) -> Result<HunkStream<'a>> {
        let parent_tree = self.find_commit(&parent.id)?.tree()?;
        let child_tree = self.find_commit(&child.id)?.tree()?;

        let mut diff_opts = DiffOptions::new();
        diff_opts.context_lines(context_lines);

        let diff =
            self.repo
                .diff_tree_to_tree(Some(&parent_tree), Some(&child_tree), Some(&mut diff_opts))?;

        Ok(Box::new(GitHunks::new(diff)))
    }

    fn tree_lookup(&self, path: &str, commit: &Commit) -> Result<Option<TreeEntry>> {
        let tree = self.find_commit(&commit.id)?.tree()?;
        match tree.get_path(Path::new(path)) {
            Ok(entry) => {
                let kind = match entry.kind() {
                    Some(ObjectType::Tree) => EntryKind::Tree,
                    Some(ObjectType::Commit) => EntryKind::Commit,
                    _ => EntryKind::Blob,
                };
                Ok(Some(TreeEntry {
                    id: entry.id().to_string(),
                    kind,
                }))
            }
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!("{} not in tree of {}", path, commit.id.short());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn merge_base(&self, a: &CommitId, b: &CommitId) -> Result<Option<CommitId>> {
        let a = Oid::from_str(a.as_str())?;
        let b = Oid::from_str(b.as_str())?;
        match self.repo.merge_base(a, b) {
            Ok(base) => Ok(Some(base.into())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Extract commit information from a git2 Commit object.
fn extract_commit(commit: &git2::Commit<'_>) -> Commit {
    let author = commit.author();
    let when = author.when();
    Commit {
        id: commit.id().into(),
        parents: commit.parent_ids().map(CommitId::from).collect(),
        tree: commit.tree_id().to_string(),
        summary: commit.summary().unwrap_or("").to_string(),
        message: commit.message().unwrap_or("").to_string(),
        author: Signature {
            name: author.name().unwrap_or("Unknown").to_string(),
            email: author.email().unwrap_or("").to_string(),
            time: when.seconds(),
            offset_minutes: when.offset_minutes(),
        },
    }
}
