//! The external task-tracking collaborator interface.
//!
//! The engine never owns task data; it talks to a tracker through this
//! narrow seam. Only these calls may suspend or fail; everything past the
//! merge is pure and synchronous.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::task::{Task, TaskId, TaskStatus};

/// Failure reported by the task tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The tracker could not be reached or returned garbage.
    #[error("tracker transport error: {0}")]
    Transport(String),
    /// The tracker refused a mutation.
    #[error("tracker rejected update: {0}")]
    Rejected(String),
}

/// Payload-free change notification: the underlying store may have
/// changed, with no detail about what. Receivers always do a full
/// re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSignal;

/// Filters for a task listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilters {
    /// Restrict the listing to one epic's tasks (the epic itself
    /// included). `None` lists everything.
    pub epic: Option<TaskId>,
}

impl TaskFilters {
    pub fn for_epic(epic: Option<TaskId>) -> Self {
        Self { epic }
    }

    /// Whether a task passes this filter.
    pub fn matches(&self, task: &Task) -> bool {
        match &self.epic {
            None => true,
            Some(epic) => &task.id == epic || task.belongs_to_epic(epic),
        }
    }
}

/// A task tracker the engine can read from, write to, and subscribe to.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Fetch a task snapshot.
    async fn list_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, SourceError>;

    /// Persist a status change for one task.
    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<(), SourceError>;

    /// Subscribe to change notifications. The receiver is live for the
    /// rest of the source's lifetime; dropped receivers are pruned on the
    /// next signal.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ChangeSignal>;
}

/// In-memory task source for tests and demos.
///
/// Failure injection: `fail_next_list` makes the next listing return a
/// transport error; `reject_updates` makes every mutation fail.
pub struct MemorySource {
    tasks: Mutex<Vec<Task>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChangeSignal>>>,
    fail_next_list: AtomicBool,
    reject_updates: AtomicBool,
    list_calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            subscribers: Mutex::new(Vec::new()),
            fail_next_list: AtomicBool::new(false),
            reject_updates: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Replace the stored tasks, as an external writer would.
    pub fn replace(&self, tasks: Vec<Task>) {
        *self.tasks.lock().unwrap() = tasks;
    }

    /// Emit a change signal to all live subscribers.
    pub fn notify(&self) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(ChangeSignal).is_ok());
    }

    /// Make the next `list_tasks` call fail with a transport error.
    pub fn fail_next_list(&self) {
        self.fail_next_list.store(true, Ordering::SeqCst);
    }

    /// Make every `update_status` call fail.
    pub fn reject_updates(&self, reject: bool) {
        self.reject_updates.store(reject, Ordering::SeqCst);
    }

    /// How many listings have been served (failed attempts included).
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored tasks.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskSource for MemorySource {
    async fn list_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_list.swap(false, Ordering::SeqCst) {
            return Err(SourceError::Transport("injected failure".to_string()));
        }
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks.iter().filter(|t| filters.matches(t)).cloned().collect())
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<(), SourceError> {
        if self.reject_updates.load(Ordering::SeqCst) {
            return Err(SourceError::Rejected("injected rejection".to_string()));
        }
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter_mut().find(|t| &t.id == id) {
            Some(task) => {
                task.status = status;
                task.updated_at = chrono::Utc::now();
                Ok(())
            }
            None => Err(SourceError::Rejected(format!("unknown task: {}", id))),
        }
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ChangeSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}
