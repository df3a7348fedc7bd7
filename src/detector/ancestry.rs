//! Memoized "is this commit part of an excluded branch" queries

use crate::error::Result;
use crate::git::{Commit, CommitId, GitBackend};
use std::collections::HashMap;
use tracing::debug;

/// Answers whether a candidate is an ancestor of (or equal to) a boundary.
///
/// Results are cached per `(candidate, boundary)`; ancestry of immutable
/// commits never changes, so entries are never invalidated.
#[derive(Debug, Default)]
pub struct AncestryOracle {
    cache: HashMap<(CommitId, CommitId), bool>,
}

impl AncestryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `candidate` is reachable from any of `boundaries`.
    pub fn is_excluded<B: GitBackend + ?Sized>(
        &mut self,
        backend: &B,
        candidate: &Commit,
        boundaries: &[impl AsRef<Commit>],
    ) -> Result<bool> {
        for boundary in boundaries {
            if self.branch_contains(backend, boundary.as_ref(), &candidate.id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Does the history of `branch` contain `candidate`?
    ///
    /// Holds exactly when the merge base of the two is the candidate itself.
    pub fn branch_contains<B: GitBackend + ?Sized>(
        &mut self,
        backend: &B,
        branch: &Commit,
        candidate: &CommitId,
    ) -> Result<bool> {
        debug!(
            "Does {} contain {}?",
            branch.id.short(),
            candidate.short()
        );
        let key = (candidate.clone(), branch.id.clone());
        if let Some(&memoized) = self.cache.get(&key) {
            debug!("  {} (memoized)", memoized);
            return Ok(memoized);
        }

        let base = backend.merge_base(candidate, &branch.id)?;
        debug!(
            "  merge-base returned: {}",
            base.as_ref().map(CommitId::short).unwrap_or("none")
        );
        let result = base.as_ref() == Some(candidate);
        debug!("  {}", result);
        self.cache.insert(key, result);
        Ok(result)
    }

    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }
}
