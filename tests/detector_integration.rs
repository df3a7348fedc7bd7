//! End-to-end discovery against real repositories
//!
//! Every scenario runs with both line attribution strategies; they must
//! produce the same graph.

use git2::{Oid, Repository};
use git_deps::config::{AttributionStrategy, DetectorOptions};
use git_deps::detector::{DependencyDetector, DependencyGraph};
use git_deps::git::CommitId;
use git_deps::listener::{DependencyEvent, DependencyListener};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

const STRATEGIES: [AttributionStrategy; 2] = [AttributionStrategy::Native, AttributionStrategy::Subprocess];

struct Fixture {
    dir: TempDir,
    repo: Repository,
}

impl Fixture {
    fn new() -> TestResult<Self> {
        let dir = tempfile::tempdir()?;
        let repo = Repository::init(dir.path())?;
        let mut config = repo.config()?;
        config.set_str("user.name", "Test User")?;
        config.set_str("user.email", "test@example.com")?;
        Ok(Self { dir, repo })
    }

    /// Commit `files` (full contents) on top of `parents` without moving HEAD.
    fn commit<S: AsRef<str>>(&self, files: &[(&str, S)], message: &str, parents: &[Oid]) -> TestResult<Oid> {
        let mut index = self.repo.index()?;
        for (path, content) in files {
            let full = self.dir.path().join(path);
            if let Some(dir) = full.parent() {
                fs::create_dir_all(dir)?;
            }
            let content: &str = content.as_ref();
            fs::write(&full, content)?;
            index.add_path(Path::new(path))?;
        }
        index.write()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;
        let sig = self.repo.signature()?;
        let parents = parents
            .iter()
            .map(|id| self.repo.find_commit(*id))
            .collect::<Result<Vec<_>, _>>()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        Ok(self.repo.commit(None, &sig, &sig, message, &tree, &parent_refs)?)
    }

    fn detector(&self, options: DetectorOptions) -> TestResult<(DependencyDetector<git_deps::git::GitRepo>, Rc<RefCell<Events>>)> {
        let events = Rc::new(RefCell::new(Events::default()));
        let mut detector = DependencyDetector::open(self.dir.path(), options)?;
        detector.add_listener(Rc::clone(&events));
        Ok((detector, events))
    }
}

/// `(event name, first commit, dependency count or second commit)`
#[derive(Default)]
struct Events(Vec<(String, String, String)>);

impl DependencyListener for Events {
    fn on_event(&mut self, event: &DependencyEvent<'_>) {
        let name = event.name().to_string();
        let entry = match event {
            DependencyEvent::NewCommit(c) | DependencyEvent::NewDependent(c) => {
                (name, c.id.to_string(), String::new())
            }
            DependencyEvent::NewDependency(e)
            | DependencyEvent::NewPath(e)
            | DependencyEvent::NewLine(e) => (name, e.dependent.id.to_string(), e.dependency.id.to_string()),
            DependencyEvent::DependentDone {
                dependent,
                dependencies,
            } => (name, dependent.id.to_string(), dependencies.len().to_string()),
            DependencyEvent::AllDone => (name, String::new(), String::new()),
        };
        self.0.push(entry);
    }
}

fn lines(items: &[&str]) -> String {
    let mut text = items.join("\n");
    text.push('\n');
    text
}

fn edges(graph: &DependencyGraph) -> Vec<(String, String)> {
    graph
        .edges()
        .map(|(d, p)| (d.to_string(), p.to_string()))
        .collect()
}

fn edge(dependent: Oid, dependency: Oid) -> (String, String) {
    (dependent.to_string(), dependency.to_string())
}

/// a <- b <- c, where b rewrites lines 4-6 and c changes line 5.
fn linear(fx: &Fixture) -> TestResult<(Oid, Oid, Oid)> {
    let a = fx.commit(&[("a.txt", &lines(&["1", "2", "3", "4", "5", "6", "7", "8", "9"]))], "Add numbers", &[])?;
    let b = fx.commit(
        &[("a.txt", &lines(&["1", "2", "3", "four", "five", "six", "7", "8", "9"]))],
        "Spell out middle",
        &[a],
    )?;
    let c = fx.commit(
        &[("a.txt", &lines(&["1", "2", "3", "four", "FIVE", "six", "7", "8", "9"]))],
        "Shout five",
        &[b],
    )?;
    Ok((a, b, c))
}

#[test]
fn test_linear_history_recursive() -> TestResult {
    let fx = Fixture::new()?;
    let (a, b, c) = linear(&fx)?;

    for strategy in STRATEGIES {
        let options = DetectorOptions::default()
            .recursive(true)
            .with_attribution(strategy);
        let (mut detector, events) = fx.detector(options)?;
        let graph = detector.find_dependencies(&[c.to_string()])?;

        assert_eq!(edges(&graph), vec![edge(c, b), edge(b, a)], "{strategy}");
        assert!(!graph.contains_edge(&CommitId::from(c), &CommitId::from(a)));

        let c_on_b = graph.evidence(&c.into(), &b.into()).ok_or("missing edge")?;
        assert_eq!(c_on_b.lines("a.txt"), vec![4], "{strategy}");
        assert_eq!(
            c_on_b.evidence("a.txt", 4),
            Some(format!("{} 4 4", b).as_str())
        );
        let b_on_a = graph.evidence(&b.into(), &a.into()).ok_or("missing edge")?;
        assert_eq!(b_on_a.lines("a.txt"), vec![3], "{strategy}");

        let events = events.borrow();
        let all_done = events.0.iter().filter(|e| e.0 == "all_done").count();
        assert_eq!(all_done, 1);
        assert_eq!(events.0.last().map(|e| e.0.as_str()), Some("all_done"));
    }
    Ok(())
}

#[test]
fn test_new_file_has_no_dependencies() -> TestResult {
    let fx = Fixture::new()?;
    let a = fx.commit(&[("a.txt", "one\n")], "Add a", &[])?;
    let d = fx.commit(
        &[("a.txt", "one\n"), ("new/b.txt", "fresh\ncontent\n")],
        "Add b in a new directory",
        &[a],
    )?;

    for strategy in STRATEGIES {
        let (mut detector, events) = fx.detector(DetectorOptions::default().with_attribution(strategy))?;
        let graph = detector.find_dependencies(&[d.to_string()])?;

        assert_eq!(graph.edge_count(), 0);
        let done: Vec<_> = events
            .borrow()
            .0
            .iter()
            .filter(|e| e.0 == "dependent_done")
            .cloned()
            .collect();
        assert_eq!(done, vec![("dependent_done".to_string(), d.to_string(), "0".to_string())]);
    }
    Ok(())
}

#[test]
fn test_two_origins_in_one_file() -> TestResult {
    let fx = Fixture::new()?;
    let base = ["l1", "l2", "l3", "l4", "l5", "l6", "l7", "l8", "l9", "l10"];
    let f = fx.commit(&[("x.txt", &lines(&base))], "Add x", &[])?;

    let mut with_seven = base;
    with_seven[6] = "seven";
    let g = fx.commit(&[("x.txt", &lines(&with_seven))], "Spell seven", &[f])?;

    let mut shouting = with_seven;
    shouting[2] = "THREE";
    shouting[6] = "SEVEN";
    let e = fx.commit(&[("x.txt", &lines(&shouting))], "Shout", &[g])?;

    for strategy in STRATEGIES {
        let options = DetectorOptions::default()
            .with_context_lines(0)
            .with_attribution(strategy);
        let (mut detector, _events) = fx.detector(options)?;
        let graph = detector.find_dependencies(&[e.to_string()])?;

        assert_eq!(edges(&graph), vec![edge(e, f), edge(e, g)], "{strategy}");
        let on_f = graph.evidence(&e.into(), &f.into()).ok_or("missing edge")?;
        let on_g = graph.evidence(&e.into(), &g.into()).ok_or("missing edge")?;
        assert_eq!(on_f.lines("x.txt"), vec![3]);
        assert_eq!(on_g.lines("x.txt"), vec![7]);
    }
    Ok(())
}

#[test]
fn test_excluded_ancestors_are_dropped() -> TestResult {
    let fx = Fixture::new()?;
    let (a, b, c) = linear(&fx)?;

    for strategy in STRATEGIES {
        let options = DetectorOptions::default()
            .recursive(true)
            .with_exclude_commits([a.to_string()])
            .with_attribution(strategy);
        let (mut detector, _events) = fx.detector(options)?;
        let graph = detector.find_dependencies(&[c.to_string()])?;

        assert_eq!(edges(&graph), vec![edge(c, b)], "{strategy}");
        assert!(!graph.is_dependent(&b.into()));
    }
    Ok(())
}

#[test]
fn test_merge_follows_first_parent() -> TestResult {
    let fx = Fixture::new()?;
    let five = ["1", "2", "3", "4", "5"];
    let a = fx.commit(&[("a.txt", &lines(&five)), ("b.txt", &lines(&five))], "Base", &[])?;

    let main_a = lines(&["1", "two", "3", "4", "5"]);
    let t = fx.commit(&[("a.txt", &main_a), ("b.txt", &lines(&five))], "Main edit", &[a])?;

    let side_b = lines(&["1", "TWO", "3", "4", "5"]);
    let s = fx.commit(&[("a.txt", &lines(&five)), ("b.txt", &side_b)], "Side edit", &[a])?;

    let merged_a = lines(&["1", "two", "three", "4", "5"]);
    let m = fx.commit(&[("a.txt", &merged_a), ("b.txt", &side_b)], "Merge side", &[t, s])?;

    for strategy in STRATEGIES {
        let (mut detector, _events) = fx.detector(DetectorOptions::default().with_attribution(strategy))?;
        let graph = detector.find_dependencies(&[m.to_string()])?;

        let found = edges(&graph);
        assert!(found.contains(&edge(m, t)), "{strategy}: {found:?}");
        assert!(found.contains(&edge(m, a)), "{strategy}: {found:?}");
        assert!(!found.contains(&edge(m, s)), "{strategy}: {found:?}");
    }
    Ok(())
}

#[test]
fn test_strategies_agree_on_evidence() -> TestResult {
    let fx = Fixture::new()?;
    let (_, _, c) = linear(&fx)?;

    let mut graphs = Vec::new();
    for strategy in STRATEGIES {
        let options = DetectorOptions::default()
            .recursive(true)
            .with_attribution(strategy);
        let (mut detector, _events) = fx.detector(options)?;
        graphs.push(detector.find_dependencies(&[c.to_string()])?);
    }

    let describe = |graph: &DependencyGraph| -> Vec<String> {
        graph
            .edges()
            .flat_map(|(d, p)| {
                let evidence = graph.evidence(d, p).cloned().unwrap_or_default();
                evidence
                    .paths()
                    .flat_map(|path| {
                        evidence
                            .lines(path)
                            .into_iter()
                            .map(|line| format!("{d} {p} {path}:{line} {:?}", evidence.evidence(path, line)))
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    };
    assert_eq!(describe(&graphs[0]), describe(&graphs[1]));
    Ok(())
}

#[test]
fn test_repeated_runs_fire_identical_events() -> TestResult {
    let fx = Fixture::new()?;
    let (_, _, c) = linear(&fx)?;
    let (mut detector, events) = fx.detector(DetectorOptions::default().recursive(true))?;

    detector.find_dependencies(&[c.to_string()])?;
    let first = std::mem::take(&mut events.borrow_mut().0);
    detector.find_dependencies(&[c.to_string()])?;
    assert_eq!(events.borrow().0, first);
    Ok(())
}

#[test]
fn test_unresolvable_seed() -> TestResult {
    let fx = Fixture::new()?;
    linear(&fx)?;
    let (mut detector, events) = fx.detector(DetectorOptions::default())?;

    let err = detector.find_dependencies(&["does-not-exist"]).unwrap_err();
    assert!(matches!(err, git_deps::DepsError::UnresolvableRevision { .. }));
    assert!(events.borrow().0.is_empty());
    Ok(())
}
