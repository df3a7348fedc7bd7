//! Diff hunks between a commit and one of its parents
//!
//! The analyzer itself has no merge policy: callers pick the parent.

use super::{Commit, GitBackend};
use crate::error::Result;
use git2::{Diff, Patch};
use tracing::debug;

/// Lazy, single-pass sequence of `(path, hunk)` pairs.
pub type HunkStream<'a> = Box<dyn Iterator<Item = Result<(String, Hunk)>> + 'a>;

/// Which side of the diff a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrigin {
    Added,
    Removed,
    Context,
}

impl LineOrigin {
    /// Map a git diff origin marker. End-of-file markers map to `None`.
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '+' => Some(LineOrigin::Added),
            '-' => Some(LineOrigin::Removed),
            ' ' => Some(LineOrigin::Context),
            _ => None,
        }
    }

    pub fn marker(self) -> char {
        match self {
            LineOrigin::Added => '+',
            LineOrigin::Removed => '-',
            LineOrigin::Context => ' ',
        }
    }
}

/// One line of a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub origin: LineOrigin,
    pub content: String,
}

/// A contiguous changed region of a file diff.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// `-start,count` on the old side.
    pub fn old_range(&self) -> String {
        format!("-{},{}", self.old_start, self.old_lines)
    }

    /// `+start,count` on the new side.
    pub fn new_range(&self) -> String {
        format!("+{},{}", self.new_start, self.new_lines)
    }

    pub fn header(&self) -> String {
        format!("@@ {} {} @@", self.old_range(), self.new_range())
    }
}

/// Produces the hunks of a commit against a caller-chosen parent.
pub struct HunkAnalyzer<'a, B: GitBackend + ?Sized> {
    backend: &'a B,
    context_lines: u32,
}

impl<'a, B: GitBackend + ?Sized> HunkAnalyzer<'a, B> {
    pub fn new(backend: &'a B, context_lines: u32) -> Self {
        Self {
            backend,
            context_lines,
        }
    }

    /// Hunks of `commit` relative to `parent`.
    pub fn hunks(&self, commit: &Commit, parent: &Commit) -> Result<HunkStream<'a>> {
        debug!(
            "Diffing {} against parent {} with {} context lines",
            commit.id.short(),
            parent.id.short(),
            self.context_lines
        );
        self.backend.diff(parent, commit, self.context_lines)
    }
}

/// Streams hunks out of a libgit2 diff, one patch at a time.
pub(crate) struct GitHunks<'r> {
    diff: Diff<'r>,
    delta_idx: usize,
    current: Option<(String, Patch<'r>)>,
    hunk_idx: usize,
}

impl<'r> GitHunks<'r> {
    pub(crate) fn new(diff: Diff<'r>) -> Self {
        Self {
            diff,
            delta_idx: 0,
            current: None,
            hunk_idx: 0,
        }
    }
}

impl<'r> Iterator for GitHunks<'r> {
    type Item = Result<(String, Hunk)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((path, patch)) = &self.current {
                if self.hunk_idx < patch.num_hunks() {
                    let idx = self.hunk_idx;
                    self.hunk_idx += 1;
                    return Some(read_hunk(patch, idx).map(|hunk| (path.clone(), hunk)));
                }
            }
            self.current = None;

            if self.delta_idx >= self.diff.deltas().len() {
                return None;
            }
            let idx = self.delta_idx;
            self.delta_idx += 1;
            self.hunk_idx = 0;

            match Patch::from_diff(&self.diff, idx) {
                // Binary or unchanged
                Ok(None) => continue,
                Ok(Some(patch)) => {
                    let delta = patch.delta();
                    let path = delta
                        .old_file()
                        .path()
                        .or_else(|| delta.new_file().path())
                        .map(|p| p.to_string_lossy().replace('\\', "/"))
                        .unwrap_or_default();
                    debug!("Examining hunks in {}", path);
                    self.current = Some((path, patch));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

fn read_hunk(patch: &Patch<'_>, idx: usize) -> Result<Hunk> {
    let (header, line_count) = patch.hunk(idx)?;
    let mut lines = Vec::with_capacity(line_count);
    for line_idx in 0..line_count {
        let line = patch.line_in_hunk(idx, line_idx)?;
        let Some(origin) = LineOrigin::from_marker(line.origin()) else {
            continue;
        };
        lines.push(DiffLine {
            origin,
            content: String::from_utf8_lossy(line.content()).into_owned(),
        });
    }

    Ok(Hunk {
        old_start: header.old_start(),
        old_lines: header.old_lines(),
        new_start: header.new_start(),
        new_lines: header.new_lines(),
        lines,
    })
}
