//! JSON document listener
//!
//! Collects every commit announced during a run plus one link per
//! discovered dependency, suitable for graph front ends.

use super::{DependencyEvent, DependencyListener};
use crate::error::Result;
use crate::git::Commit;
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::Serialize;
use std::io::Write;
use tracing::warn;

/// One node of the exported graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitJson {
    pub sha1: String,
    /// Abbreviated hash
    pub name: String,
    pub title: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    /// RFC 3339 in the author's timezone
    pub author_time: String,
}

impl From<&Commit> for CommitJson {
    fn from(commit: &Commit) -> Self {
        Self {
            sha1: commit.id.to_string(),
            name: commit.id.short().to_string(),
            title: commit.summary.clone(),
            message: commit.message.clone(),
            author_name: commit.author.name.clone(),
            author_email: commit.author.email.clone(),
            author_time: rfc3339(commit.author.time, commit.author.offset_minutes),
        }
    }
}

/// `parent` depends on `child`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyJson {
    pub parent: String,
    pub child: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JsonDocument {
    pub commits: Vec<CommitJson>,
    pub dependencies: Vec<DependencyJson>,
}

/// Accumulates a [`JsonDocument`] over one or more runs.
///
/// With a writer attached the document is written on every `all_done`.
#[derive(Default)]
pub struct JsonListener {
    commits: IndexMap<String, CommitJson>,
    dependencies: Vec<DependencyJson>,
    complete: bool,
    out: Option<Box<dyn Write>>,
}

impl JsonListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_writer<W: Write + 'static>(out: W) -> Self {
        Self {
            out: Some(Box::new(out)),
            ..Self::default()
        }
    }

    /// Whether `all_done` has been seen.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn document(&self) -> JsonDocument {
        JsonDocument {
            commits: self.commits.values().cloned().collect(),
            dependencies: self.dependencies.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.document())
            .map_err(|e| crate::error::DepsError::Io(e.into()))
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{}", self.to_json()?)?;
        Ok(())
    }

    fn add_commit(&mut self, commit: &Commit) {
        if !self.commits.contains_key(commit.id.as_str()) {
            self.commits
                .insert(commit.id.to_string(), CommitJson::from(commit));
        }
    }
}

impl DependencyListener for JsonListener {
    fn on_event(&mut self, event: &DependencyEvent<'_>) {
        match event {
            DependencyEvent::NewCommit(commit) => self.add_commit(commit),
            DependencyEvent::NewDependency(edge) => {
                self.add_commit(edge.dependent);
                self.add_commit(edge.dependency);
                self.dependencies.push(DependencyJson {
                    parent: edge.dependent.id.to_string(),
                    child: edge.dependency.id.to_string(),
                });
            }
            DependencyEvent::AllDone => {
                self.complete = true;
                self.flush();
            }
            _ => {}
        }
    }
}

impl JsonListener {
    fn flush(&mut self) {
        let Some(mut out) = self.out.take() else {
            return;
        };
        let written = self.write_to(&mut out).and_then(|_| Ok(out.flush()?));
        if let Err(e) = written {
            warn!("Failed to write JSON output: {}", e);
        }
        self.out = Some(out);
    }
}

fn rfc3339(seconds: i64, offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(offset_minutes * 60);
    match (DateTime::from_timestamp(seconds, 0), offset) {
        (Some(utc), Some(offset)) => utc.with_timezone(&offset).to_rfc3339(),
        _ => "1970-01-01T00:00:00+00:00".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{CommitId, Signature};
    use crate::listener::EdgeEvent;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn commit(c: char, summary: &str) -> Commit {
        Commit {
            id: CommitId::new(c.to_string().repeat(40)),
            parents: vec![],
            tree: String::new(),
            summary: summary.to_string(),
            message: format!("{summary}\n\nBody\n"),
            author: Signature {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                time: 1_700_000_000,
                offset_minutes: 60,
            },
        }
    }

    #[test]
    fn test_collects_commits_and_links() {
        let c = commit('c', "C");
        let b = commit('b', "B");
        let a = commit('a', "A");
        let mut listener = JsonListener::new();

        listener.on_event(&DependencyEvent::NewCommit(&c));
        for dependency in [&b, &a] {
            listener.on_event(&DependencyEvent::NewDependency(EdgeEvent {
                dependent: &c,
                dependency,
                path: "f",
                line: 1,
            }));
        }
        assert!(!listener.is_complete());
        listener.on_event(&DependencyEvent::AllDone);
        assert!(listener.is_complete());

        let doc = listener.document();
        let names: Vec<_> = doc.commits.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["cccccccc", "bbbbbbbb", "aaaaaaaa"]);
        assert_eq!(doc.dependencies.len(), 2);
        assert_eq!(doc.dependencies[0].parent, "c".repeat(40));
        assert_eq!(doc.dependencies[0].child, "b".repeat(40));
    }

    #[test]
    fn test_commit_fields() {
        let json = CommitJson::from(&commit('a', "Add parser"));
        assert_eq!(json.title, "Add parser");
        assert_eq!(json.author_email, "ada@example.com");
        assert_eq!(json.author_time, "2023-11-14T23:13:20+01:00");
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_receives_document_on_all_done() {
        let buf = SharedBuf::default();
        let mut listener = JsonListener::with_writer(buf.clone());
        let b = commit('b', "B");
        let a = commit('a', "A");

        listener.on_event(&DependencyEvent::NewCommit(&b));
        listener.on_event(&DependencyEvent::NewDependency(EdgeEvent {
            dependent: &b,
            dependency: &a,
            path: "f",
            line: 2,
        }));
        assert!(buf.0.borrow().is_empty());

        listener.on_event(&DependencyEvent::AllDone);
        let text = String::from_utf8(buf.0.borrow().clone()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["commits"].as_array().unwrap().len(), 2);
        assert_eq!(value["dependencies"][0]["parent"], "b".repeat(40));
        assert_eq!(value["dependencies"][0]["child"], "a".repeat(40));
    }

    #[test]
    fn test_json_shape() {
        let mut listener = JsonListener::new();
        let a = commit('a', "A");
        listener.on_event(&DependencyEvent::NewCommit(&a));
        let value: serde_json::Value = serde_json::from_str(&listener.to_json().unwrap()).unwrap();
        assert_eq!(value["commits"][0]["sha1"], "a".repeat(40));
        assert!(value["dependencies"].as_array().unwrap().is_empty());
    }
}
