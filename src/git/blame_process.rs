//! Line attribution by shelling out to `git blame --porcelain`
//!
//! Runs the external command as a subprocess with `std::process::Command`
//! and parses the group headers of its porcelain output into [`BlameLine`]s.
//! Any non-zero exit status aborts the run.

use super::{BlameLine, Commit, CommitId, LineAttributor};
use crate::error::{DepsError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use tracing::debug;

/// `<hash> <orig_line> <final_line> <count>`; only group headers carry the count.
static GROUP_HEADER: OnceLock<Regex> = OnceLock::new();

fn group_header() -> &'static Regex {
    GROUP_HEADER.get_or_init(|| {
        Regex::new(r"^([0-9a-f]{40}|[0-9a-f]{64}) (\d+) (\d+) (\d+)$")
            .expect("valid porcelain header regex")
    })
}

/// Attribution through an external `git` process.
pub struct SubprocessBlame {
    git_dir: PathBuf,
    program: String,
}

impl SubprocessBlame {
    pub fn new(git_dir: &Path) -> Self {
        Self {
            git_dir: git_dir.to_path_buf(),
            program: "git".to_string(),
        }
    }

    /// Use a different git executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, path: &str, commit: &CommitId, line_start: u32, line_count: u32) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(format!("--git-dir={}", self.git_dir.display()))
            .arg("blame")
            .arg("--porcelain")
            .arg("-L")
            .arg(format!("{},+{}", line_start, line_count))
            .arg(commit.as_str())
            .arg("--")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl LineAttributor for SubprocessBlame {
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

        let mut command = self.command(path, &boundary.id, line_start, line_count);
        debug!("Running {:?}", command);
        let output = command.output()?;

        if !output.status.success() {
            return Err(DepsError::AttributionFailed {
                path: path.to_string(),
                commit: boundary.id.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_porcelain(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `git blame --porcelain` output into attribution groups.
pub fn parse_porcelain(output: &str) -> Result<Vec<BlameLine>> {
    let mut groups = Vec::new();
    for line in output.lines() {
        let Some(caps) = group_header().captures(line) else {
            continue;
        };
        groups.push(BlameLine {
            commit: CommitId::new(&caps[1]),
            orig_start_line: parse_number(line, &caps[2])?,
            final_start_line: parse_number(line, &caps[3])?,
            lines_in_hunk: parse_number(line, &caps[4])?,
        });
    }
    Ok(groups)
}

fn parse_number(line: &str, field: &str) -> Result<u32> {
    field.parse().map_err(|e| DepsError::Porcelain {
        line: line.to_string(),
        reason: format!("{}", e),
    })
}
