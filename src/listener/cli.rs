//! Plain-text listener for the command line

use super::{DependencyEvent, DependencyListener, EdgeSummary};
use crate::git::Commit;
use console::style;
use std::io::Write;
use tracing::warn;

/// Prints dependencies as they are discovered.
///
/// - single seed, no recursion: one dependency hash per line
/// - otherwise: `<dependent> <dependency>` per line
/// - `log` mode: a git-log style block per finished dependent
pub struct CliListener<W: Write> {
    out: W,
    multi: bool,
    log: bool,
    color: bool,
}

impl<W: Write> CliListener<W> {
    pub fn new(out: W, multi: bool, log: bool) -> Self {
        Self {
            out,
            multi,
            log,
            color: false,
        }
    }

    /// Style hashes the way `git log --oneline` does.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn oneline(&self, commit: &Commit) -> String {
        let hash = commit.id.short();
        if self.color {
            format!("{} {}", style(hash).yellow(), commit.summary)
        } else {
            format!("{} {}", hash, commit.summary)
        }
    }

    fn write_log_block(&mut self, dependent: &Commit, deps: &[EdgeSummary<'_>]) -> std::io::Result<()> {
        let header = self.oneline(dependent);
        writeln!(self.out, "{}", header)?;
        for dep in deps {
            let summary = self.oneline(dep.dependency);
            let paths: Vec<&str> = dep.evidence.paths().collect();
            writeln!(
                self.out,
                "    {} ({} in {})",
                summary,
                pluralize(dep.evidence.line_count(), "line"),
                paths.join(", ")
            )?;
        }
        writeln!(self.out)
    }
}

impl<W: Write> DependencyListener for CliListener<W> {
    fn on_event(&mut self, event: &DependencyEvent<'_>) {
        let result = match event {
            DependencyEvent::NewDependency(edge) if !self.log => {
                if self.multi {
                    writeln!(self.out, "{} {}", edge.dependent.id, edge.dependency.id)
                } else {
                    writeln!(self.out, "{}", edge.dependency.id)
                }
            }
            DependencyEvent::DependentDone {
                dependent,
                dependencies,
            } if self.log && !dependencies.is_empty() => {
                self.write_log_block(dependent, dependencies)
            }
            DependencyEvent::AllDone => self.out.flush(),
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!("Failed to write {} output: {}", event.name(), e);
        }
    }
}

fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
