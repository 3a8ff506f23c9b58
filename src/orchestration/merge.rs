//! Reconciliation of fetched snapshots with optimistic local state.
//!
//! A local status change is applied immediately while the confirming
//! tracker write is still in flight. A re-fetch triggered by that same
//! write can land before the write is durably visible, and would briefly
//! "undo" the user's action on screen. The merge closes that race: for
//! tasks with a fresh ledger entry the locally held status wins, every
//! other field always comes from the fetched record.

use std::collections::HashMap;
use std::time::Instant;

use crate::core::task::{Task, TaskId, TaskStatus};
use crate::orchestration::ledger::UpdateLedger;
use crate::tlog_trace;

/// Merge a freshly fetched snapshot with the currently held task list.
///
/// The fetched list decides which tasks exist; a task that vanished from
/// the tracker vanishes from the result no matter what the ledger says.
pub fn merge_snapshot(
    fetched: Vec<Task>,
    local: &[Task],
    ledger: &UpdateLedger,
    now: Instant,
) -> Vec<Task> {
    let local_status: HashMap<&TaskId, TaskStatus> =
        local.iter().map(|t| (&t.id, t.status)).collect();

    fetched
        .into_iter()
        .map(|mut task| {
            if ledger.is_fresh(&task.id, now) {
                if let Some(&status) = local_status.get(&task.id) {
                    if status != task.status {
                        tlog_trace!(
                            "merge: keeping local status {} for {} over fetched {}",
                            status,
                            task.id,
                            task.status
                        );
                    }
                    task.status = status;
                }
            }
            task
        })
        .collect()
}

/// Carry a selection across a merge: a vanished id clears it, a surviving
/// id is kept and resolves against the merged snapshot on read.
pub fn carry_selection(selected: Option<TaskId>, merged: &[Task]) -> Option<TaskId> {
    selected.filter(|id| merged.iter().any(|t| &t.id == id))
}
