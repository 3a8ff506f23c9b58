//! Batch grouping and classification.
//!
//! Tasks sharing a blocking depth form one batch; batches are numbered
//! 1..K in increasing depth order with no gaps, so depths {0, 2, 5}
//! still produce batches 1, 2, 3. Every batch carries a derived phase,
//! an execution status, and progress counters. Batches are recreated
//! wholesale on every pipeline run and never mutated in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::depth::DepthMap;
use crate::core::task::{Task, TaskId, TaskStatus};

/// Work-phase classification of a batch, inferred from member labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPhase {
    /// Every member is test-authoring work and none is implementation.
    Red,
    /// Every member is implementation work and none is test-authoring.
    Green,
    /// Any mixture, including batches without role labels at all.
    Mixed,
}

impl std::fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchPhase::Red => write!(f, "red"),
            BatchPhase::Green => write!(f, "green"),
            BatchPhase::Mixed => write!(f, "mixed"),
        }
    }
}

/// Execution status of a batch, derived from member statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Every member is closed.
    Complete,
    /// At least one member is blocked. A single blocked task dominates
    /// even when others are in progress: forward progress is still gated
    /// on the blocker.
    Blocked,
    /// At least one member is in progress (and none blocked).
    Active,
    /// Only open or deferred members remain.
    Waiting,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Complete => write!(f, "complete"),
            BatchStatus::Blocked => write!(f, "blocked"),
            BatchStatus::Active => write!(f, "active"),
            BatchStatus::Waiting => write!(f, "waiting"),
        }
    }
}

/// Completion counters for a batch or a phase aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
}

impl BatchProgress {
    pub fn from_counts(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

/// One ordered unit of the plan: the tasks at a single blocking depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Position in the plan, 1-based and contiguous.
    pub number: u32,
    pub phase: BatchPhase,
    /// Member ids, sorted.
    pub task_ids: Vec<TaskId>,
    /// Member snapshots, in the same order as `task_ids`.
    pub tasks: Vec<Task>,
    pub status: BatchStatus,
    pub progress: BatchProgress,
}

/// Group a scoped task set into ordered batches by depth.
///
/// Infallible; an empty set yields an empty plan.
pub fn group(scoped: &[&Task], depths: &DepthMap) -> Vec<Batch> {
    let mut buckets: BTreeMap<u32, Vec<&Task>> = BTreeMap::new();
    for &task in scoped {
        let depth = depths.depth_of(&task.id).unwrap_or(0);
        buckets.entry(depth).or_default().push(task);
    }

    buckets
        .into_values()
        .enumerate()
        .map(|(i, mut members)| {
            members.sort_by(|a, b| a.id.cmp(&b.id));
            build_batch(i as u32 + 1, &members)
        })
        .collect()
}

fn build_batch(number: u32, members: &[&Task]) -> Batch {
    let completed = members
        .iter()
        .filter(|t| t.status == TaskStatus::Closed)
        .count();

    Batch {
        number,
        phase: classify_phase(members),
        task_ids: members.iter().map(|t| t.id.clone()).collect(),
        tasks: members.iter().map(|t| (*t).clone()).collect(),
        status: classify_status(members),
        progress: BatchProgress::from_counts(completed, members.len()),
    }
}

fn classify_phase(members: &[&Task]) -> BatchPhase {
    let any_test = members.iter().any(|t| t.is_test_authoring());
    let any_impl = members.iter().any(|t| t.is_implementation());
    let all_test = members.iter().all(|t| t.is_test_authoring());
    let all_impl = members.iter().all(|t| t.is_implementation());

    if all_test && !any_impl {
        BatchPhase::Red
    } else if all_impl && !any_test {
        BatchPhase::Green
    } else {
        BatchPhase::Mixed
    }
}

fn classify_status(members: &[&Task]) -> BatchStatus {
    if members.iter().all(|t| t.status == TaskStatus::Closed) {
        BatchStatus::Complete
    } else if members.iter().any(|t| t.status == TaskStatus::Blocked) {
        BatchStatus::Blocked
    } else if members.iter().any(|t| t.status == TaskStatus::InProgress) {
        BatchStatus::Active
    } else {
        BatchStatus::Waiting
    }
}

/// Aggregate view of a plan for the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_batches: usize,
    pub completed_batches: usize,
    /// The batch currently being worked: the lowest-numbered Active batch,
    /// or the lowest-numbered batch that is not Complete, or None when the
    /// plan is empty or fully complete.
    pub active_batch: Option<u32>,
    pub phase_progress: PhaseProgress,
}

/// Task-level progress aggregated per batch phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub red: BatchProgress,
    pub green: BatchProgress,
    pub mixed: BatchProgress,
}

/// Compute the aggregate summary for a plan. Pure function of its input.
pub fn summary(batches: &[Batch]) -> BatchSummary {
    let completed_batches = batches
        .iter()
        .filter(|b| b.status == BatchStatus::Complete)
        .count();

    let active_batch = batches
        .iter()
        .find(|b| b.status == BatchStatus::Active)
        .or_else(|| batches.iter().find(|b| b.status != BatchStatus::Complete))
        .map(|b| b.number);

    let mut red = (0, 0);
    let mut green = (0, 0);
    let mut mixed = (0, 0);
    for batch in batches {
        let slot = match batch.phase {
            BatchPhase::Red => &mut red,
            BatchPhase::Green => &mut green,
            BatchPhase::Mixed => &mut mixed,
        };
        slot.0 += batch.progress.completed;
        slot.1 += batch.progress.total;
    }

    BatchSummary {
        total_batches: batches.len(),
        completed_batches,
        active_batch,
        phase_progress: PhaseProgress {
            red: BatchProgress::from_counts(red.0, red.1),
            green: BatchProgress::from_counts(green.0, green.1),
            mixed: BatchProgress::from_counts(mixed.0, mixed.1),
        },
    }
}
