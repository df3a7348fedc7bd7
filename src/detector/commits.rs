//! Session-wide cache of resolved commits

use crate::error::{DepsError, Result};
use crate::git::{Commit, CommitId, GitBackend};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves each revision once and hands out shared, immutable handles.
///
/// Never evicts; lives as long as the session that owns it.
#[derive(Debug, Default)]
pub struct CommitCache {
    commits: HashMap<CommitId, Arc<Commit>>,
    /// Revision strings already resolved, e.g. `HEAD~2` -> hash
    revisions: HashMap<String, CommitId>,
}

impl CommitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `revision`, asking the backend only on first sight.
    pub fn resolve<B: GitBackend + ?Sized>(
        &mut self,
        backend: &B,
        revision: &str,
    ) -> Result<Arc<Commit>> {
        if let Some(id) = self.revisions.get(revision) {
            return self.get(id);
        }
        if let Some(commit) = self.commits.get(&CommitId::new(revision)) {
            return Ok(Arc::clone(commit));
        }

        let resolved = backend.resolve_revision(revision)?;
        let commit = Arc::clone(
            self.commits
                .entry(resolved.id.clone())
                .or_insert_with(|| Arc::new(resolved)),
        );
        self.revisions
            .insert(revision.to_string(), commit.id.clone());
        Ok(commit)
    }

    /// Look up a commit that was resolved earlier.
    pub fn get(&self, id: &CommitId) -> Result<Arc<Commit>> {
        self.commits
            .get(id)
            .cloned()
            .ok_or_else(|| DepsError::UnknownCommit(id.clone()))
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.commits.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}
