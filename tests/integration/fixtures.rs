//! Shared task builders for the integration suite.

use tempo::{Task, TaskId, TaskStatus};

/// A leaf task inside the given epic.
pub fn epic_task(id: &str, epic: &str) -> Task {
    let mut task = Task::new(id, &format!("{} title", id));
    task.parent = Some(TaskId::from(epic));
    task
}

pub fn with_status(mut task: Task, status: TaskStatus) -> Task {
    task.status = status;
    task
}

pub fn blocked_by(mut task: Task, blockers: &[&str]) -> Task {
    task.blocked_by = blockers.iter().map(|b| TaskId::from(*b)).collect();
    task
}

pub fn labeled(mut task: Task, labels: &[&str]) -> Task {
    task.labels = labels.iter().map(|l| l.to_string()).collect();
    task
}

/// The canonical scenario: epic `E1` with `A` unblocked and `B`, `C`
/// both blocked by `A`.
pub fn epic_e1() -> Vec<Task> {
    vec![
        epic_task("A", "E1"),
        blocked_by(epic_task("B", "E1"), &["A"]),
        blocked_by(epic_task("C", "E1"), &["A"]),
    ]
}
