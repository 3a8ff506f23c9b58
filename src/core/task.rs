//! Task data model for the planning engine.
//!
//! Tasks are owned by the external tracker; the engine only ever holds
//! read-only snapshots of them. A snapshot is replaced wholesale on every
//! merge, never mutated in place (the one exception is the optimistic
//! status write in the scheduler's mutation path).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a task, assigned by the external tracker.
///
/// Identifiers are plain strings such as `E1.3`. By convention an id that
/// starts with `<epic id>.` belongs to that epic, which also covers nested
/// subtasks (`E1.3.2` still starts with `E1.`). Explicit `parent` links
/// take precedence where present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Task status as reported by the tracker.
///
/// This is a closed set; anything else in the tracker file is a format
/// error, not a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Blocked,
    Deferred,
    Closed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Deferred => "deferred",
            TaskStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(TaskStatus::Open),
            "in-progress" => Ok(TaskStatus::InProgress),
            "blocked" => Ok(TaskStatus::Blocked),
            "deferred" => Ok(TaskStatus::Deferred),
            "closed" => Ok(TaskStatus::Closed),
            other => Err(crate::Error::InvalidStatus(other.to_string())),
        }
    }
}

/// Labels that mark a task as a container rather than a leaf work item.
const CONTAINER_LABELS: &[&str] = &["epic"];

/// Labels that mark test-authoring work.
pub const TEST_LABELS: &[&str] = &["test", "tests", "test-authoring"];

/// Labels that mark implementation work.
pub const IMPL_LABELS: &[&str] = &["impl", "implementation", "feature"];

/// A task snapshot from the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Tracker-assigned identifier.
    pub id: TaskId,
    /// Human-readable title.
    pub title: String,
    /// The epic (or other container) this task belongs to.
    #[serde(default)]
    pub parent: Option<TaskId>,
    /// Current status.
    pub status: TaskStatus,
    /// Free-form labels; role and phase are inferred from these.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Identifiers of tasks that block this one.
    #[serde(default)]
    pub blocked_by: Vec<TaskId>,
    /// Additional dependency references kept by the tracker separately
    /// from `blocked_by`; treated as equivalent blocking edges.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last modified in the tracker.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a task with the given id and title, Open, with no parent,
    /// labels, or blockers.
    pub fn new(id: impl Into<TaskId>, title: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.to_string(),
            parent: None,
            status: TaskStatus::Open,
            labels: Vec::new(),
            blocked_by: Vec::new(),
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn has_any_label(&self, names: &[&str]) -> bool {
        self.labels
            .iter()
            .any(|l| names.iter().any(|n| l.eq_ignore_ascii_case(n)))
    }

    /// True if this task is a container (e.g. an epic) rather than a leaf
    /// work item.
    pub fn is_container(&self) -> bool {
        self.has_any_label(CONTAINER_LABELS)
    }

    /// True if this task's labels mark it as test-authoring work.
    pub fn is_test_authoring(&self) -> bool {
        self.has_any_label(TEST_LABELS)
    }

    /// True if this task's labels mark it as implementation work.
    pub fn is_implementation(&self) -> bool {
        self.has_any_label(IMPL_LABELS)
    }

    /// True if this task belongs to the given epic, either through an
    /// explicit parent link or through the id-prefix convention.
    pub fn belongs_to_epic(&self, epic: &TaskId) -> bool {
        if self.parent.as_ref() == Some(epic) {
            return true;
        }
        self.id
            .as_str()
            .strip_prefix(epic.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

/// The subset of tasks the pipeline operates on for one epic: members of
/// the epic that are leaf work items.
pub fn scope_to_epic<'a>(tasks: &'a [Task], epic: &TaskId) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.belongs_to_epic(epic) && !t.is_container())
        .collect()
}
