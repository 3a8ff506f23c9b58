//! File-backed task tracker client.
//!
//! Tasks live in a single `tasks.json` (a serialized task array) inside
//! the tracker directory; external tools rewrite that file at will. The
//! directory is watched with `notify` and every relevant write emits a
//! payload-free change signal, the way the desktop tracker surfaces
//! "something changed" without saying what. Note that our own
//! `update_status` writes trip the watcher too; that is exactly the
//! re-fetch race the reconciliation ledger exists for.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::core::task::{Task, TaskId, TaskStatus};
use crate::orchestration::source::{ChangeSignal, SourceError, TaskFilters, TaskSource};
use crate::{tlog_debug, tlog_warn, Result};

/// Name of the task file inside the tracker directory.
pub const TASKS_FILE: &str = "tasks.json";

type Subscribers = Arc<Mutex<Vec<mpsc::UnboundedSender<ChangeSignal>>>>;

/// Client for a directory-based task tracker.
pub struct JsonTracker {
    path: PathBuf,
    subscribers: Subscribers,
    _watcher: Option<Mutex<RecommendedWatcher>>,
}

impl JsonTracker {
    /// Create a client without file watching, for one-shot use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(TASKS_FILE),
            subscribers: Arc::default(),
            _watcher: None,
        }
    }

    /// Create a client that watches the tracker directory for changes.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let subscribers: Subscribers = Arc::default();
        let subs = Arc::clone(&subscribers);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if is_data_change(&event) => {
                    if let Ok(mut subs) = subs.lock() {
                        subs.retain(|tx| tx.send(ChangeSignal).is_ok());
                    }
                }
                Ok(_) => {}
                Err(err) => tlog_warn!("tracker watcher error: {}", err),
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tlog_debug!("watching tracker directory {}", dir.display());

        Ok(Self {
            path: dir.join(TASKS_FILE),
            subscribers,
            _watcher: Some(Mutex::new(watcher)),
        })
    }

    pub fn tasks_path(&self) -> &Path {
        &self.path
    }

    /// Write a full task list to the tracker file, creating it if needed.
    pub async fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        let json = serde_json::to_string_pretty(tasks)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    async fn read_tasks(&self) -> std::result::Result<Vec<Task>, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Transport(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| SourceError::Transport(format!("{}: {}", self.path.display(), e)))
    }

    async fn write_tasks(&self, tasks: &[Task]) -> std::result::Result<(), SourceError> {
        let json = serde_json::to_string_pretty(tasks)
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| SourceError::Transport(format!("{}: {}", self.path.display(), e)))
    }
}

/// Whether a watcher event represents a data change worth signalling.
fn is_data_change(event: &Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    if !relevant_kind {
        return false;
    }
    // Directory-level events carry no paths; pass those through.
    event.paths.is_empty()
        || event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == TASKS_FILE))
}

#[async_trait]
impl TaskSource for JsonTracker {
    async fn list_tasks(&self, filters: &TaskFilters) -> std::result::Result<Vec<Task>, SourceError> {
        let tasks = self.read_tasks().await?;
        Ok(tasks.into_iter().filter(|t| filters.matches(t)).collect())
    }

    async fn update_status(
        &self,
        id: &TaskId,
        status: TaskStatus,
    ) -> std::result::Result<(), SourceError> {
        let mut tasks = self.read_tasks().await?;
        let Some(task) = tasks.iter_mut().find(|t| &t.id == id) else {
            return Err(SourceError::Rejected(format!("unknown task: {}", id)));
        };
        task.status = status;
        task.updated_at = chrono::Utc::now();
        self.write_tasks(&tasks).await
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ChangeSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }
}
