//! End-to-end pipeline tests: snapshot in, batch plan out.

use std::collections::HashSet;
use std::sync::Arc;

use tempo::core::batch;
use tempo::orchestration::source::MemorySource;
use tempo::{BatchPhase, BatchStatus, Scheduler, TaskId, TaskStatus};

use crate::fixtures::{blocked_by, epic_e1, epic_task, labeled, with_status};

async fn loaded_scheduler(tasks: Vec<tempo::Task>) -> Scheduler<MemorySource> {
    let source = Arc::new(MemorySource::new(tasks));
    let mut scheduler = Scheduler::with_defaults(source);
    scheduler.set_epic(Some(TaskId::from("E1"))).await.unwrap();
    scheduler
}

#[tokio::test]
async fn test_canonical_two_batch_plan() {
    let scheduler = loaded_scheduler(epic_e1()).await;
    let batches = scheduler.batches();

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].number, 1);
    assert_eq!(batches[0].task_ids, vec![TaskId::from("A")]);
    assert_eq!(batches[1].number, 2);
    assert_eq!(
        batches[1].task_ids,
        vec![TaskId::from("B"), TaskId::from("C")]
    );
}

#[tokio::test]
async fn test_canonical_statuses_after_closing_the_root() {
    let tasks = vec![
        with_status(epic_task("A", "E1"), TaskStatus::Closed),
        blocked_by(epic_task("B", "E1"), &["A"]),
        blocked_by(epic_task("C", "E1"), &["A"]),
    ];
    let scheduler = loaded_scheduler(tasks).await;

    assert_eq!(scheduler.batches()[0].status, BatchStatus::Complete);
    assert_eq!(scheduler.batches()[1].status, BatchStatus::Waiting);
}

#[tokio::test]
async fn test_batch_numbers_contiguous_and_membership_unique() {
    let tasks = vec![
        epic_task("A", "E1"),
        epic_task("B", "E1"),
        blocked_by(epic_task("C", "E1"), &["A"]),
        blocked_by(epic_task("D", "E1"), &["C", "B"]),
        blocked_by(epic_task("E", "E1"), &["D"]),
        blocked_by(epic_task("F", "E1"), &["D", "A"]),
    ];
    let scheduler = loaded_scheduler(tasks).await;
    let batches = scheduler.batches();

    let numbers: Vec<u32> = batches.iter().map(|b| b.number).collect();
    assert_eq!(numbers, (1..=batches.len() as u32).collect::<Vec<_>>());

    let mut seen = HashSet::new();
    for batch in batches {
        for id in &batch.task_ids {
            assert!(seen.insert(id.clone()), "{} appears twice", id);
        }
    }
    assert_eq!(seen.len(), 6);
}

#[tokio::test]
async fn test_blockers_always_land_earlier() {
    let tasks = vec![
        epic_task("A", "E1"),
        blocked_by(epic_task("B", "E1"), &["A"]),
        blocked_by(epic_task("C", "E1"), &["A", "B"]),
        blocked_by(epic_task("D", "E1"), &["C"]),
    ];
    let scheduler = loaded_scheduler(tasks.clone()).await;
    let batches = scheduler.batches();

    let batch_of = |id: &TaskId| {
        batches
            .iter()
            .find(|b| b.task_ids.contains(id))
            .map(|b| b.number)
            .unwrap()
    };
    for task in &tasks {
        for blocker in &task.blocked_by {
            assert!(batch_of(blocker) < batch_of(&task.id));
        }
    }
}

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let mut scheduler = loaded_scheduler(epic_e1()).await;
    let first = scheduler.batches().to_vec();
    scheduler.refresh().await.unwrap();
    assert_eq!(scheduler.batches(), &first[..]);
}

#[tokio::test]
async fn test_mutual_block_still_produces_a_plan() {
    let tasks = vec![
        blocked_by(epic_task("A", "E1"), &["B"]),
        blocked_by(epic_task("B", "E1"), &["A"]),
    ];
    let scheduler = loaded_scheduler(tasks).await;

    let members: usize = scheduler.batches().iter().map(|b| b.tasks.len()).sum();
    assert_eq!(members, 2);
}

#[tokio::test]
async fn test_phase_classification_in_plan() {
    let tasks = vec![
        labeled(epic_task("A", "E1"), &["tests"]),
        labeled(blocked_by(epic_task("B", "E1"), &["A"]), &["impl"]),
        blocked_by(epic_task("C", "E1"), &["B"]),
    ];
    let scheduler = loaded_scheduler(tasks).await;
    let batches = scheduler.batches();

    assert_eq!(batches[0].phase, BatchPhase::Red);
    assert_eq!(batches[1].phase, BatchPhase::Green);
    assert_eq!(batches[2].phase, BatchPhase::Mixed);
}

#[tokio::test]
async fn test_blocked_dominates_in_plan() {
    let tasks = vec![
        with_status(epic_task("A", "E1"), TaskStatus::Blocked),
        with_status(epic_task("B", "E1"), TaskStatus::InProgress),
        with_status(epic_task("C", "E1"), TaskStatus::InProgress),
    ];
    let scheduler = loaded_scheduler(tasks).await;
    assert_eq!(scheduler.batches()[0].status, BatchStatus::Blocked);
}

#[tokio::test]
async fn test_progress_in_plan() {
    let tasks = vec![
        with_status(epic_task("A", "E1"), TaskStatus::Closed),
        epic_task("B", "E1"),
        epic_task("C", "E1"),
        epic_task("D", "E1"),
    ];
    let scheduler = loaded_scheduler(tasks).await;

    let progress = scheduler.batches()[0].progress;
    assert_eq!(progress.completed, 1);
    assert_eq!(progress.total, 4);
    assert_eq!(progress.percent, 25);
}

#[tokio::test]
async fn test_summary_over_plan() {
    let tasks = vec![
        with_status(epic_task("A", "E1"), TaskStatus::Closed),
        blocked_by(epic_task("B", "E1"), &["A"]),
    ];
    let scheduler = loaded_scheduler(tasks).await;

    let summary = batch::summary(scheduler.batches());
    assert_eq!(summary.total_batches, 2);
    assert_eq!(summary.completed_batches, 1);
    assert_eq!(summary.active_batch, Some(2));
}

#[tokio::test]
async fn test_cross_epic_blockers_do_not_gate_batching() {
    // B is blocked by a task outside E1; inside the scope it is a root.
    let tasks = vec![
        epic_task("A", "E1"),
        blocked_by(epic_task("B", "E1"), &["E2.X"]),
        epic_task("E2.X", "E2"),
    ];
    let scheduler = loaded_scheduler(tasks).await;

    assert_eq!(scheduler.batches().len(), 1);
    assert_eq!(scheduler.batches()[0].task_ids.len(), 2);
}
