//! One discovery run: worklist loop, hunk blaming and edge recording

use super::{AncestryOracle, CommitCache, DependencyGraph, Worklist};
use crate::config::DetectorOptions;
use crate::error::Result;
use crate::git::{BlameLine, Commit, CommitId, EntryKind, GitBackend, Hunk, HunkAnalyzer, LineAttributor, LineOrigin};
use crate::listener::{DependencyEvent, EdgeEvent, EdgeSummary, Notifier};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, enabled, info, Level};

/// Per-run state plus split borrows of the owning detector.
///
/// Caches and listeners belong to the session; the worklist, done set and
/// graph start empty on every run.
pub(super) struct Traversal<'s, B: GitBackend + ?Sized> {
    backend: &'s B,
    attributor: &'s dyn LineAttributor,
    options: &'s DetectorOptions,
    excluded: &'s [Arc<Commit>],
    commits: &'s mut CommitCache,
    ancestry: &'s mut AncestryOracle,
    notifier: &'s mut Notifier,
    graph: DependencyGraph,
    todo: Worklist,
    done: HashSet<CommitId>,
    /// Commits already reported through `NewCommit`
    announced: HashSet<CommitId>,
}

impl<'s, B: GitBackend + ?Sized> Traversal<'s, B> {
    pub(super) fn new(
        backend: &'s B,
        attributor: &'s dyn LineAttributor,
        options: &'s DetectorOptions,
        excluded: &'s [Arc<Commit>],
        commits: &'s mut CommitCache,
        ancestry: &'s mut AncestryOracle,
        notifier: &'s mut Notifier,
    ) -> Self {
        Self {
            backend,
            attributor,
            options,
            excluded,
            commits,
            ancestry,
            notifier,
            graph: DependencyGraph::new(),
            todo: Worklist::new(),
            done: HashSet::new(),
            announced: HashSet::new(),
        }
    }

    pub(super) fn run<S: AsRef<str>>(mut self, revisions: &[S]) -> Result<DependencyGraph> {
        for revision in revisions {
            let seed = self.commits.resolve(self.backend, revision.as_ref())?;
            self.todo.push(seed.id.clone());
        }
        info!("Initial TODO list: {}", self.todo.summary());

        let mut first = true;
        while let Some(id) = self.todo.pop() {
            if !first {
                info!("  TODO list now: {}", self.todo.summary());
            }
            first = false;

            info!("  Processing {} from TODO list", id.short());
            if self.done.contains(&id) {
                info!("    {} already done previously", id.short());
                continue;
            }

            let dependent = self.commits.get(&id)?;
            self.announce(&dependent);
            if let Some(parent_id) = dependent.first_parent() {
                let parent = self.commits.resolve(self.backend, parent_id.as_str())?;
                self.find_dependencies_with_parent(&dependent, &parent)?;
            }
            self.done.insert(id);
            info!("  Found all dependencies for {}", dependent.id.short());
            self.finish_dependent(&dependent)?;
        }

        self.notifier.notify(&DependencyEvent::AllDone);
        Ok(self.graph)
    }

    /// Only the first parent of a merge is ever passed here.
    fn find_dependencies_with_parent(&mut self, dependent: &Arc<Commit>, parent: &Arc<Commit>) -> Result<()> {
        info!(
            "    Finding dependencies of {} via parent {}",
            dependent.id.short(),
            parent.id.short()
        );
        let hunks = HunkAnalyzer::new(self.backend, self.options.context_lines).hunks(dependent, parent)?;
        for item in hunks {
            let (path, hunk) = item?;
            self.blame_hunk(dependent, parent, &path, &hunk)?;
        }
        Ok(())
    }

    fn blame_hunk(&mut self, dependent: &Arc<Commit>, parent: &Commit, path: &str, hunk: &Hunk) -> Result<()> {
        info!(
            "        Blaming hunk {} @ {} (listed below)",
            hunk.old_range(),
            parent.id.short()
        );

        match self.backend.tree_lookup(path, parent)? {
            Some(entry) if entry.kind == EntryKind::Blob => {}
            Some(entry) => {
                debug!("        {} is a {:?} in {}, skipping", path, entry.kind, parent.id.short());
                return Ok(());
            }
            // The dependent probably added a new directory
            None => {
                debug!("        {} not in {}, skipping", path, parent.id.short());
                return Ok(());
            }
        }

        let groups = self
            .attributor
            .attribute(path, parent, hunk.old_start, hunk.old_lines)?;

        let mut culprits = HashMap::new();
        for group in &groups {
            self.process_blame_line(dependent, path, group, &mut culprits)?;
        }

        if enabled!(Level::DEBUG) {
            debug_hunk(hunk, &culprits);
        }
        Ok(())
    }

    fn process_blame_line(
        &mut self,
        dependent: &Arc<Commit>,
        path: &str,
        group: &BlameLine,
        culprits: &mut HashMap<u32, CommitId>,
    ) -> Result<()> {
        let line = group.final_start_line;
        let evidence = format!("{} {} {}", group.commit, group.orig_start_line, line);
        debug!("          ! {}", evidence);

        let dependency = self.commits.resolve(self.backend, group.commit.as_str())?;
        for offset in 0..group.lines_in_hunk {
            culprits.insert(line + offset, dependency.id.clone());
        }

        if self.ancestry.is_excluded(self.backend, &dependency, self.excluded)? {
            debug!(
                "          Excluding dependency {} from line {} ({})",
                dependency.id.short(),
                line,
                dependency.oneline()
            );
            return Ok(());
        }

        if self.graph.register_dependent(&dependent.id) {
            info!("          New dependent: {}", dependent.oneline());
            self.notifier.notify(&DependencyEvent::NewDependent(dependent));
        }

        let edge = EdgeEvent {
            dependent,
            dependency: &dependency,
            path,
            line,
        };
        if self.graph.add_edge(&dependent.id, &dependency.id)? {
            self.process_new_dependency(edge);
        }

        let recorded = self
            .graph
            .record_line(&dependent.id, &dependency.id, path, line, evidence)?;
        if recorded.new_path {
            self.notifier.notify(&DependencyEvent::NewPath(edge));
        }
        debug!(
            "          New line for {} -> {}: {}",
            dependent.id.short(),
            dependency.id.short(),
            line
        );
        self.notifier.notify(&DependencyEvent::NewLine(edge));
        Ok(())
    }

    fn process_new_dependency(&mut self, edge: EdgeEvent<'_>) {
        let dependency = edge.dependency;
        self.announce(dependency);
        self.notifier.notify(&DependencyEvent::NewDependency(edge));
        info!(
            "          New dependency {} -> {} via line {} ({})",
            edge.dependent.id.short(),
            dependency.id.short(),
            edge.line,
            dependency.oneline()
        );

        if self.todo.contains(&dependency.id) {
            info!(
                "        Dependency on {} via line {} already in TODO",
                dependency.id.short(),
                edge.line
            );
            return;
        }
        if self.done.contains(&dependency.id) {
            info!(
                "        Dependency on {} via line {} already done",
                dependency.id.short(),
                edge.line
            );
            return;
        }
        if self.options.recurse && !self.graph.is_dependent(&dependency.id) {
            self.todo.push(dependency.id.clone());
            info!("  + Added {} to TODO", dependency.id.short());
        }
    }

    fn announce(&mut self, commit: &Commit) {
        if self.announced.insert(commit.id.clone()) {
            self.notifier.notify(&DependencyEvent::NewCommit(commit));
        }
    }

    fn finish_dependent(&mut self, dependent: &Commit) -> Result<()> {
        let resolved = self
            .graph
            .dependencies_of(&dependent.id)
            .into_iter()
            .map(|(id, evidence)| -> Result<_> { Ok((self.commits.get(id)?, evidence)) })
            .collect::<Result<Vec<_>>>()?;
        let summaries: Vec<EdgeSummary<'_>> = resolved
            .iter()
            .map(|(dependency, evidence)| EdgeSummary {
                dependency,
                evidence,
            })
            .collect();
        self.notifier.notify(&DependencyEvent::DependentDone {
            dependent,
            dependencies: &summaries,
        });
        Ok(())
    }
}

/// Log a hunk with the short hash of the commit behind each old-side line.
fn debug_hunk(hunk: &Hunk, culprits: &HashMap<u32, CommitId>) {
    for line in hunk_dump(hunk, culprits) {
        debug!("{}", line);
    }
}

/// Render a hunk one line per row: culprit, old line number, marker and
/// content. Added lines have no old-side line so both columns stay blank.
fn hunk_dump(hunk: &Hunk, culprits: &HashMap<u32, CommitId>) -> Vec<String> {
    let mut rows = Vec::with_capacity(hunk.lines.len() + 1);
    rows.push(format!("          | {:>8} {:>5} {}", "--------", "-----", hunk.header()));
    let mut line_num = hunk.old_start;
    for line in &hunk.lines {
        let content = line.content.trim_end();
        if line.origin == LineOrigin::Added {
            rows.push(format!("          | {:>8} {:>5} {}{}", "", "", line.origin.marker(), content));
            continue;
        }
        let culprit = culprits.get(&line_num).map(CommitId::short).unwrap_or("");
        rows.push(format!(
            "          | {:>8} {:>5} {}{}",
            culprit,
            line_num,
            line.origin.marker(),
            content
        ));
        line_num += 1;
    }
    rows
}
