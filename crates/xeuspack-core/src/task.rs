//! Deferred build tasks and the runner that executes them.
//!
//! The build step yields [`Task`] values describing what must happen; the
//! [`TaskRunner`] decides what actually runs. A task whose declared file
//! dependencies are unchanged since the last run is skipped, so repeated
//! builds only redo work whose inputs moved.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// State file recording dependency fingerprints between runs.
pub const TASK_STATE_FILE: &str = ".xeuspack-tasks.json";

pub type Action = Box<dyn Fn() -> Result<()>>;

/// A named unit of work with declared file dependencies. Immutable once
/// yielded; the runner owns execution order and skip decisions.
pub struct Task {
    name: String,
    doc: Option<String>,
    file_deps: Vec<PathBuf>,
    actions: Vec<Action>,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .field("file_deps", &self.file_deps)
            .field("actions", &self.actions.len())
            .finish()
    }
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            file_deps: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn dep(mut self, path: PathBuf) -> Self {
        self.file_deps.push(path);
        self
    }

    pub fn deps(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.file_deps.extend(paths);
        self
    }

    pub fn action(mut self, action: impl Fn() -> Result<()> + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_string(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn file_deps(&self) -> &[PathBuf] {
        &self.file_deps
    }

    /// Fingerprint of the declared file deps, `None` when there are none
    /// (such a task always runs). A dep that is missing on disk hashes a
    /// marker instead of failing: the patch task legitimately declares
    /// files that earlier tasks in the same run create.
    fn fingerprint(&self) -> Option<String> {
        if self.file_deps.is_empty() {
            return None;
        }
        let mut hasher = Sha256::new();
        for dep in &self.file_deps {
            hasher.update(dep.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            match fs::read(dep) {
                Ok(content) => hasher.update(&content),
                Err(_) => hasher.update(b"missing"),
            }
            hasher.update([0u8]);
        }
        Some(hex::encode(hasher.finalize()))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub skipped: usize,
}

/// Executes yielded tasks in order, skipping those whose dependency
/// fingerprint matches the recorded state.
pub struct TaskRunner {
    state_path: PathBuf,
    state: HashMap<String, String>,
}

impl TaskRunner {
    /// Runner with state persisted in `state_dir`. Unreadable or corrupt
    /// state is treated as empty: worst case everything re-runs.
    pub fn new(state_dir: &Path) -> Self {
        let state_path = state_dir.join(TASK_STATE_FILE);
        let state = fs::read_to_string(&state_path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self { state_path, state }
    }

    pub fn run(&mut self, tasks: &[Task]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for task in tasks {
            let fingerprint = task.fingerprint();
            if let Some(ref current) = fingerprint {
                if self.state.get(task.name()) == Some(current) {
                    tracing::debug!(task = task.name(), "up to date, skipping");
                    summary.skipped += 1;
                    continue;
                }
            }
            tracing::info!(task = task.name(), "running");
            for action in &task.actions {
                action().with_context(|| format!("Task failed: {}", task.name()))?;
            }
            // Re-fingerprint after running: the patch task mutates one of
            // its own declared deps, and the recorded state must match what
            // the next run will observe.
            if let Some(fp) = task.fingerprint() {
                self.state.insert(task.name().to_string(), fp);
            }
            summary.executed += 1;
        }
        self.save()?;
        Ok(summary)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.state_path, content)
            .with_context(|| format!("Failed to write task state: {}", self.state_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_task(name: &str, deps: Vec<PathBuf>, counter: Rc<Cell<usize>>) -> Task {
        let mut task = Task::new(name).action(move || {
            counter.set(counter.get() + 1);
            Ok(())
        });
        task = task.deps(deps);
        task
    }

    #[test]
    fn test_task_without_deps_always_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let counter = Rc::new(Cell::new(0));

        let mut runner = TaskRunner::new(tmp.path());
        let tasks = vec![counting_task("always", vec![], counter.clone())];
        runner.run(&tasks).unwrap();
        runner.run(&tasks).unwrap();
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_unchanged_deps_skip_second_run() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("input.txt");
        fs::write(&input, "v1").unwrap();
        let counter = Rc::new(Cell::new(0));
        let tasks = vec![counting_task("copy", vec![input.clone()], counter.clone())];

        let mut runner = TaskRunner::new(tmp.path());
        let first = runner.run(&tasks).unwrap();
        assert_eq!(first, RunSummary { executed: 1, skipped: 0 });

        // Fresh runner, same state dir: skip decision survives the process
        let mut runner = TaskRunner::new(tmp.path());
        let second = runner.run(&tasks).unwrap();
        assert_eq!(second, RunSummary { executed: 0, skipped: 1 });
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_changed_dep_reruns() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("input.txt");
        fs::write(&input, "v1").unwrap();
        let counter = Rc::new(Cell::new(0));
        let tasks = vec![counting_task("copy", vec![input.clone()], counter.clone())];

        let mut runner = TaskRunner::new(tmp.path());
        runner.run(&tasks).unwrap();
        fs::write(&input, "v2").unwrap();
        let summary = runner.run(&tasks).unwrap();
        assert_eq!(summary.executed, 1);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_failing_action_aborts_run() {
        let tmp = tempfile::tempdir().unwrap();
        let counter = Rc::new(Cell::new(0));
        let after = counting_task("after", vec![], counter.clone());
        let failing = Task::new("boom").action(|| anyhow::bail!("exploded"));

        let mut runner = TaskRunner::new(tmp.path());
        let err = runner.run(&[failing, after]).unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_corrupt_state_file_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(TASK_STATE_FILE), "not json").unwrap();
        let counter = Rc::new(Cell::new(0));
        let mut runner = TaskRunner::new(tmp.path());
        runner
            .run(&[counting_task("t", vec![], counter.clone())])
            .unwrap();
        assert_eq!(counter.get(), 1);
    }
}
