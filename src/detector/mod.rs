//! Dependency graph construction
//!
//! [`DependencyDetector`] is a session object: it owns the backend, the
//! line attribution strategy, the registered listeners and the caches that
//! are safe to share between runs (resolved commits and ancestry answers).
//! Every call to [`DependencyDetector::find_dependencies`] is one run with
//! its own worklist, done set and graph.
//!
//! # Example
//!
//! ```no_run
//! use git_deps::config::DetectorOptions;
//! use git_deps::detector::DependencyDetector;
//! use std::path::Path;
//!
//! let options = DetectorOptions::default().recursive(true);
//! let mut detector = DependencyDetector::open(Path::new("."), options).unwrap();
//! let graph = detector.find_dependencies(&["HEAD"]).unwrap();
//! for (dependent, dependency) in graph.edges() {
//!     println!("{} -> {}", dependent.short(), dependency.short());
//! }
//! ```

mod ancestry;
mod commits;
mod graph;
mod traversal;
mod worklist;


pub use ancestry::AncestryOracle;
pub use commits::CommitCache;
pub use graph::{DependencyGraph, Evidence, Recorded};
pub use worklist::Worklist;

use crate::config::DetectorOptions;
use crate::error::Result;
use crate::git::{attributor_for, Commit, CommitId, GitBackend, GitRepo, LineAttributor};
use crate::listener::{DependencyListener, Notifier};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use traversal::Traversal;

/// Discovers which earlier commits a set of commits depends on.
pub struct DependencyDetector<B: GitBackend> {
    backend: B,
    attributor: Box<dyn LineAttributor>,
    options: DetectorOptions,
    commits: CommitCache,
    ancestry: AncestryOracle,
    /// Resolved `exclude_commits` boundaries
    excluded: Vec<Arc<Commit>>,
    notifier: Notifier,
}

impl DependencyDetector<GitRepo> {
    /// Open the repository containing `path` with the configured blame strategy.
    pub fn open(path: &Path, options: DetectorOptions) -> Result<Self> {
        let repo = GitRepo::open(path)?;
        let attributor = attributor_for(options.attribution, &repo)?;
        Self::new(repo, attributor, options)
    }
}

impl<B: GitBackend> DependencyDetector<B> {
    /// Build a detector; exclusion boundaries are resolved up front so a bad
    /// `exclude_commits` entry fails before any traversal starts.
    pub fn new(
        backend: B,
        attributor: Box<dyn LineAttributor>,
        options: DetectorOptions,
    ) -> Result<Self> {
        let mut commits = CommitCache::new();
        let excluded = options
            .exclude_commits
            .iter()
            .map(|revision| commits.resolve(&backend, revision))
            .collect::<Result<Vec<_>>>()?;
        if !excluded.is_empty() {
            debug!(
                "Excluding ancestors of: {}",
                excluded
                    .iter()
                    .map(|c| c.id.short())
                    .collect::<Vec<_>>()
                    .join(" ")
            );
        }

        Ok(Self {
            backend,
            attributor,
            options,
            commits,
            ancestry: AncestryOracle::new(),
            excluded,
            notifier: Notifier::new(),
        })
    }

    /// Register a listener; events reach listeners in registration order.
    pub fn add_listener(&mut self, listener: impl DependencyListener + 'static) {
        self.notifier.add(Box::new(listener));
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A commit resolved by an earlier run of this session.
    pub fn commit(&self, id: &CommitId) -> Result<Arc<Commit>> {
        self.commits.get(id)
    }

    /// Run discovery seeded with `revisions`, in order.
    ///
    /// Any fatal condition aborts the run; events already delivered to
    /// listeners are not retracted.
    pub fn find_dependencies<S: AsRef<str>>(&mut self, revisions: &[S]) -> Result<DependencyGraph> {
        let traversal = Traversal::new(
            &self.backend,
            self.attributor.as_ref(),
            &self.options,
            &self.excluded,
            &mut self.commits,
            &mut self.ancestry,
            &mut self.notifier,
        );
        traversal.run(revisions)
    }
}
