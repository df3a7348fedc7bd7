//! Dependency graph with per-line evidence
//!
//! Nodes are commit hashes; each `(dependent, dependency)` edge carries the
//! file paths and line numbers that justify it. The graph only grows:
//! every insertion goes through one guarded method per level so the
//! no-self-edge and no-duplicate-line invariants hold by construction.

use crate::error::{DepsError, Result};
use crate::git::CommitId;
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeMap;

/// Why an edge exists: path -> line number -> evidence string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    paths: IndexMap<String, BTreeMap<u32, String>>,
}

impl Evidence {
    /// Paths in the order they were first recorded.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    /// Line numbers recorded for `path`, ascending.
    pub fn lines(&self, path: &str) -> Vec<u32> {
        self.paths
            .get(path)
            .map(|lines| lines.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn evidence(&self, path: &str, line: u32) -> Option<&str> {
        self.paths.get(path)?.get(&line).map(String::as_str)
    }

    /// Total number of evidence lines across all paths.
    pub fn line_count(&self) -> usize {
        self.paths.values().map(BTreeMap::len).sum()
    }
}

/// What a successful [`DependencyGraph::record_line`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    /// First evidence for this path under this edge
    pub new_path: bool,
}

/// Commits plus evidence-carrying dependency edges.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: IndexSet<CommitId>,
    /// dependent -> its dependencies, in discovery order
    adjacency: IndexMap<CommitId, IndexSet<CommitId>>,
    evidence: IndexMap<(CommitId, CommitId), Evidence>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dependent`; returns `true` the first time.
    pub fn register_dependent(&mut self, dependent: &CommitId) -> bool {
        if self.adjacency.contains_key(dependent) {
            return false;
        }
        self.nodes.insert(dependent.clone());
        self.adjacency.insert(dependent.clone(), IndexSet::new());
        true
    }

    /// Add the edge `dependent -> dependency`; returns `true` if it is new.
    ///
    /// Registers the dependent if needed. Self-edges are rejected.
    pub fn add_edge(&mut self, dependent: &CommitId, dependency: &CommitId) -> Result<bool> {
        if dependent == dependency {
            return Err(DepsError::SelfDependency(dependent.clone()));
        }
        self.register_dependent(dependent);
        self.nodes.insert(dependency.clone());

        let added = self
            .adjacency
            .get_mut(dependent)
            .map(|deps| deps.insert(dependency.clone()))
            .unwrap_or(false);
        if added {
            self.evidence
                .insert((dependent.clone(), dependency.clone()), Evidence::default());
        }
        Ok(added)
    }

    /// Record evidence line `line` of `path` for an existing edge.
    ///
    /// A line can only be recorded once per edge and path; a second attempt
    /// means the attribution results are inconsistent.
    pub fn record_line(
        &mut self,
        dependent: &CommitId,
        dependency: &CommitId,
        path: &str,
        line: u32,
        evidence: String,
    ) -> Result<Recorded> {
        if dependent == dependency {
            return Err(DepsError::SelfDependency(dependent.clone()));
        }
        let key = (dependent.clone(), dependency.clone());
        if !self.evidence.contains_key(&key) {
            self.add_edge(dependent, dependency)?;
        }
        let edge = self.evidence.entry(key).or_default();

        let new_path = !edge.paths.contains_key(path);
        let lines = edge.paths.entry(path.to_string()).or_default();
        if let Some(existing) = lines.get(&line) {
            return Err(DepsError::DuplicateEvidence {
                dependent: dependent.clone(),
                dependency: dependency.clone(),
                path: path.to_string(),
                line,
                existing: existing.clone(),
                attempted: evidence,
            });
        }
        lines.insert(line, evidence);
        Ok(Recorded { new_path })
    }

    pub fn is_dependent(&self, id: &CommitId) -> bool {
        self.adjacency.contains_key(id)
    }

    pub fn contains_edge(&self, dependent: &CommitId, dependency: &CommitId) -> bool {
        self.adjacency
            .get(dependent)
            .is_some_and(|deps| deps.contains(dependency))
    }

    /// Every commit seen as a dependent or dependency.
    pub fn nodes(&self) -> impl Iterator<Item = &CommitId> {
        self.nodes.iter()
    }

    /// Registered dependents, in registration order.
    pub fn dependents(&self) -> impl Iterator<Item = &CommitId> {
        self.adjacency.keys()
    }

    /// `(dependent, dependency)` pairs, independent of path/line granularity.
    pub fn edges(&self) -> impl Iterator<Item = (&CommitId, &CommitId)> {
        self.adjacency
            .iter()
            .flat_map(|(dependent, deps)| deps.iter().map(move |dep| (dependent, dep)))
    }

    pub fn edge_count(&self) -> usize {
        self.evidence.len()
    }

    /// Dependencies of `dependent` with their evidence, in discovery order.
    pub fn dependencies_of(&self, dependent: &CommitId) -> Vec<(&CommitId, &Evidence)> {
        let Some(deps) = self.adjacency.get(dependent) else {
            return Vec::new();
        };
        deps.iter()
            .filter_map(|dep| {
                self.evidence
                    .get(&(dependent.clone(), dep.clone()))
                    .map(|evidence| (dep, evidence))
            })
            .collect()
    }

    pub fn evidence(&self, dependent: &CommitId, dependency: &CommitId) -> Option<&Evidence> {
        self.evidence.get(&(dependent.clone(), dependency.clone()))
    }
}
