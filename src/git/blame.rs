//! Line attribution ("blame") for dependency discovery
//!
//! Given a path, a boundary commit and a line range, reports which commit
//! last touched each line as of the boundary. Two strategies implement
//! [`LineAttributor`]: [`NativeBlame`] calls libgit2 directly and
//! [`SubprocessBlame`](super::SubprocessBlame) runs `git blame --porcelain`.

use super::{Commit, CommitId, GitRepo, SubprocessBlame};
use crate::config::AttributionStrategy;
use crate::error::Result;
use git2::{BlameOptions, Oid, Repository};
use std::path::Path;
use tracing::debug;

/// One attribution group: contiguous lines last touched by the same commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    /// Commit that last modified these lines
    pub commit: CommitId,
    /// First line number in that commit's version of the file (1-indexed)
    pub orig_start_line: u32,
    /// First line number in the blamed (boundary) version (1-indexed)
    pub final_start_line: u32,
    /// Number of contiguous lines in this group
    pub lines_in_hunk: u32,
}

/// Blames a line range of a file as of a boundary commit.
pub trait LineAttributor {
    /// Attribute lines `line_start..line_start + line_count` of `path` in
    /// `boundary`'s tree. An empty range yields no groups.
    fn attribute(
        &self,
        path: &str,
        boundary: &Commit,
        line_start: u32,
        line_count: u32,
    ) -> Result<Vec<BlameLine>>;
}

/// Build the attribution strategy selected by configuration.
pub fn attributor_for(
    strategy: AttributionStrategy,
    repo: &GitRepo,
) -> Result<Box<dyn LineAttributor>> {
    debug!("Using {} line attribution", strategy);
    match strategy {
        AttributionStrategy::Native => Ok(Box::new(NativeBlame::open(repo.git_dir())?)),
        AttributionStrategy::Subprocess => Ok(Box::new(SubprocessBlame::new(repo.git_dir()))),
    }
}

/// Attribution through libgit2's blame.
pub struct NativeBlame {
    repo: Repository,
}

impl NativeBlame {
    /// Open a repository for blame analysis.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::open(path)?;
        Ok(Self { repo })
    }
}

impl LineAttributor for NativeBlame {
    fn attribute(
        &self,
        path: &str,
        boundary: &Commit,
        line_start: u32,
        line_count: u32,
    ) -> Result<Vec<BlameLine>> {
        if line_start == 0 || line_count == 0 {
            return Ok(vec![]);
        }

        let mut opts = BlameOptions::new();
        opts.newest_commit(Oid::from_str(boundary.id.as_str())?);
        opts.min_line(line_start as usize);
        opts.max_line((line_start + line_count - 1) as usize);

        let blame = self.repo.blame_file(Path::new(path), Some(&mut opts))?;

        Ok(blame
            .iter()
            .map(|hunk| BlameLine {
                commit: hunk.final_commit_id().into(),
                orig_start_line: hunk.orig_start_line() as u32,
                final_start_line: hunk.final_start_line() as u32,
                lines_in_hunk: hunk.lines_in_hunk() as u32,
            })
            .collect())
    }
}
