//! FIFO queue of commits awaiting analysis

use crate::git::CommitId;
use std::collections::{HashSet, VecDeque};

/// Ordered queue with O(1) membership tests.
///
/// A commit is queued at most once; breadth-first order is preserved.
#[derive(Debug, Default)]
pub struct Worklist {
    queue: VecDeque<CommitId>,
    members: HashSet<CommitId>,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless it is already queued. Returns whether it was added.
    pub fn push(&mut self, id: CommitId) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.queue.push_back(id);
        true
    }

    pub fn pop(&mut self) -> Option<CommitId> {
        let id = self.queue.pop_front()?;
        self.members.remove(&id);
        Some(id)
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.members.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Short hashes in queue order, for progress logging.
    pub fn summary(&self) -> String {
        self.queue
            .iter()
            .map(CommitId::short)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
