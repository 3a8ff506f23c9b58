//! Recent-update ledger backing the reconciliation window.
//!
//! The ledger records when each task was last mutated optimistically on
//! this side. While an entry is younger than the override window, the
//! local status outranks whatever a concurrent re-fetch reports for that
//! task; afterwards the fetched value wins again. The ledger is owned by
//! its scheduler instance: created empty at session start, entries added
//! by the mutation path, removed by expiry or failure rollback.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::task::TaskId;

/// Default span during which a local optimistic value outranks a
/// conflicting freshly fetched value.
pub const DEFAULT_OVERRIDE_WINDOW: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct UpdateLedger {
    window: Duration,
    entries: HashMap<TaskId, Instant>,
}

impl UpdateLedger {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_OVERRIDE_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an optimistic mutation of the given task at `now`. A second
    /// mutation of the same task restarts its window.
    pub fn record(&mut self, id: TaskId, now: Instant) {
        self.entries.insert(id, now);
    }

    /// Drop a task's entry, e.g. after a failed mutation was rolled back.
    /// Returns whether an entry existed.
    pub fn remove(&mut self, id: &TaskId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Whether the task was mutated within the override window as of `now`.
    pub fn is_fresh(&self, id: &TaskId, now: Instant) -> bool {
        self.entries
            .get(id)
            .is_some_and(|t| now.saturating_duration_since(*t) <= self.window)
    }

    /// Drop entries older than the window. Returns how many were removed.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let window = self.window;
        self.entries
            .retain(|_, t| now.saturating_duration_since(*t) <= window);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for UpdateLedger {
    fn default() -> Self {
        Self::new()
    }
}
