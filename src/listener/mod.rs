//! Discovery events and the listeners that consume them
//!
//! The detector pushes a fixed set of [`DependencyEvent`]s, in a
//! deterministic order, to every registered [`DependencyListener`].
//! Listeners return nothing; they render, collect or ignore.
//!
//! Shipped listeners:
//! - [`CliListener`] - hashes or git-log style summaries on a writer
//! - [`JsonListener`] - a `{commits, dependencies}` document

mod cli;
mod json;

pub use cli::CliListener;
pub use json::{CommitJson, DependencyJson, JsonDocument, JsonListener};

use crate::detector::Evidence;
use crate::git::Commit;
use std::cell::RefCell;
use std::rc::Rc;

/// One `(dependent, dependency)` observation at a specific line.
#[derive(Debug, Clone, Copy)]
pub struct EdgeEvent<'a> {
    pub dependent: &'a Commit,
    pub dependency: &'a Commit,
    pub path: &'a str,
    pub line: u32,
}

/// A finished dependent's dependency with its evidence.
#[derive(Debug, Clone, Copy)]
pub struct EdgeSummary<'a> {
    pub dependency: &'a Commit,
    pub evidence: &'a Evidence,
}

/// Lifecycle events of one discovery run.
#[derive(Debug, Clone, Copy)]
pub enum DependencyEvent<'a> {
    /// A commit became known to the run
    NewCommit(&'a Commit),
    /// A commit got its first dependency candidate
    NewDependent(&'a Commit),
    /// First evidence for a new edge
    NewDependency(EdgeEvent<'a>),
    /// First evidence in a file for an edge
    NewPath(EdgeEvent<'a>),
    /// Every evidence line
    NewLine(EdgeEvent<'a>),
    /// All hunks of a dependent analyzed; `dependencies` may be empty
    DependentDone {
        dependent: &'a Commit,
        dependencies: &'a [EdgeSummary<'a>],
    },
    /// Worklist exhausted
    AllDone,
}

impl DependencyEvent<'_> {
    /// Snake-case event name, e.g. `new_dependency`.
    pub fn name(&self) -> &'static str {
        match self {
            DependencyEvent::NewCommit(_) => "new_commit",
            DependencyEvent::NewDependent(_) => "new_dependent",
            DependencyEvent::NewDependency(_) => "new_dependency",
            DependencyEvent::NewPath(_) => "new_path",
            DependencyEvent::NewLine(_) => "new_line",
            DependencyEvent::DependentDone { .. } => "dependent_done",
            DependencyEvent::AllDone => "all_done",
        }
    }
}

/// Receives discovery events.
pub trait DependencyListener {
    fn on_event(&mut self, event: &DependencyEvent<'_>);
}

/// Lets callers keep a handle on a listener they registered.
impl<L: DependencyListener + ?Sized> DependencyListener for Rc<RefCell<L>> {
    fn on_event(&mut self, event: &DependencyEvent<'_>) {
        self.borrow_mut().on_event(event);
    }
}

/// Fans events out to registered listeners in registration order.
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<Box<dyn DependencyListener>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Box<dyn DependencyListener>) {
        self.listeners.push(listener);
    }

    pub fn notify(&mut self, event: &DependencyEvent<'_>) {
        for listener in &mut self.listeners {
            listener.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
