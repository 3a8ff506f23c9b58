//! Optimistic mutations racing external re-fetches.

use std::sync::Arc;
use std::time::Duration;

use tempo::orchestration::source::MemorySource;
use tempo::{BatchStatus, Scheduler, SchedulerOptions, TaskId, TaskStatus};

use crate::fixtures::epic_e1;

async fn loaded(
    options: SchedulerOptions,
) -> (Scheduler<MemorySource>, Arc<MemorySource>) {
    let source = Arc::new(MemorySource::new(epic_e1()));
    let mut scheduler = Scheduler::new(Arc::clone(&source), options);
    scheduler.set_epic(Some(TaskId::from("E1"))).await.unwrap();
    (scheduler, source)
}

#[tokio::test]
async fn test_stale_refetch_inside_window_keeps_local_status() {
    let (mut scheduler, source) = loaded(SchedulerOptions::default()).await;

    scheduler
        .set_task_status(&TaskId::from("A"), TaskStatus::Closed)
        .await
        .unwrap();
    // The write has not landed in the snapshot the next fetch will see
    source.replace(epic_e1());

    scheduler.refresh().await.unwrap();
    assert_eq!(scheduler.tasks()[0].status, TaskStatus::Closed);
    assert_eq!(scheduler.batches()[0].status, BatchStatus::Complete);
}

#[tokio::test]
async fn test_stale_refetch_after_window_adopts_fetched_status() {
    // A tiny override window so the test can outwait it for real.
    let options = SchedulerOptions {
        override_window: Duration::from_millis(10),
        ..Default::default()
    };
    let (mut scheduler, source) = loaded(options).await;

    scheduler
        .set_task_status(&TaskId::from("A"), TaskStatus::Closed)
        .await
        .unwrap();
    source.replace(epic_e1());

    tokio::time::sleep(Duration::from_millis(50)).await;
    scheduler.refresh().await.unwrap();
    assert_eq!(scheduler.tasks()[0].status, TaskStatus::Open);
}

#[tokio::test]
async fn test_ledger_entry_expires_rather_than_clearing_on_success() {
    let (mut scheduler, _source) = loaded(SchedulerOptions::default()).await;

    scheduler
        .set_task_status(&TaskId::from("A"), TaskStatus::Closed)
        .await
        .unwrap();
    // Confirmed success must NOT clear the entry: a re-fetch racing the
    // confirmation could still carry the pre-write snapshot.
    assert_eq!(scheduler.ledger().len(), 1);
}

#[tokio::test]
async fn test_rejected_mutation_rolls_back_cleanly() {
    let (mut scheduler, source) = loaded(SchedulerOptions::default()).await;
    source.reject_updates(true);

    let result = scheduler
        .set_task_status(&TaskId::from("A"), TaskStatus::Closed)
        .await;

    assert!(result.is_err());
    assert_eq!(scheduler.tasks()[0].status, TaskStatus::Open);
    assert_eq!(source.tasks()[0].status, TaskStatus::Open);
    assert!(scheduler.ledger().is_empty());
    // The plan reflects the rolled-back state
    assert_eq!(scheduler.batches()[0].status, BatchStatus::Waiting);
}

#[tokio::test]
async fn test_rolled_back_task_is_not_protected_from_refetch() {
    let (mut scheduler, source) = loaded(SchedulerOptions::default()).await;
    source.reject_updates(true);
    let _ = scheduler
        .set_task_status(&TaskId::from("A"), TaskStatus::Closed)
        .await;

    // The tracker now legitimately closes A; the merge must adopt it.
    source.reject_updates(false);
    let mut tasks = epic_e1();
    tasks[0].status = TaskStatus::Closed;
    source.replace(tasks);

    scheduler.refresh().await.unwrap();
    assert_eq!(scheduler.tasks()[0].status, TaskStatus::Closed);
}

#[tokio::test]
async fn test_selection_cleared_when_task_vanishes() {
    let (mut scheduler, source) = loaded(SchedulerOptions::default()).await;
    scheduler.select(Some(TaskId::from("C")));
    assert_eq!(
        scheduler.selected_task().map(|t| t.id.clone()),
        Some(TaskId::from("C"))
    );

    let mut tasks = epic_e1();
    tasks.retain(|t| t.id != TaskId::from("C"));
    source.replace(tasks);
    scheduler.refresh().await.unwrap();

    assert!(scheduler.selected_task().is_none());
}

#[tokio::test]
async fn test_selection_resolves_against_merged_snapshot() {
    let (mut scheduler, source) = loaded(SchedulerOptions::default()).await;
    scheduler.select(Some(TaskId::from("B")));

    // B is retitled upstream; the selection must point at the new record
    let mut tasks = epic_e1();
    tasks[1].title = "retitled".to_string();
    source.replace(tasks);
    scheduler.refresh().await.unwrap();

    assert_eq!(scheduler.selected_task().map(|t| t.title.as_str()), Some("retitled"));
}

#[tokio::test]
async fn test_fetch_failure_keeps_tasks_and_ledger() {
    let (mut scheduler, source) = loaded(SchedulerOptions::default()).await;
    scheduler
        .set_task_status(&TaskId::from("A"), TaskStatus::Closed)
        .await
        .unwrap();

    source.fail_next_list();
    assert!(scheduler.refresh().await.is_err());

    assert!(scheduler.fetch_failed());
    assert_eq!(scheduler.tasks().len(), 3);
    assert_eq!(scheduler.tasks()[0].status, TaskStatus::Closed);
    assert_eq!(scheduler.ledger().len(), 1);
}
