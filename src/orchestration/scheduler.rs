//! Recompute scheduling over the planning pipeline.
//!
//! Decides when the scope/graph/depth/batch pipeline re-runs:
//! an epic change or manual refresh reloads immediately, external change
//! notifications are debounced so a burst collapses into one fetch, and a
//! fetch already in flight suppresses duplicates instead of queueing them.
//! The scheduler owns the engine's only mutable state (task snapshot,
//! ledger, selection, current plan) and is reached exclusively through its
//! methods, so no locking is needed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant as TokioInstant};
use tokio_util::sync::CancellationToken;

use crate::core::batch::{self, Batch, BatchSummary};
use crate::core::plan;
use crate::core::task::{Task, TaskId, TaskStatus};
use crate::orchestration::ledger::{UpdateLedger, DEFAULT_OVERRIDE_WINDOW};
use crate::orchestration::merge;
use crate::orchestration::source::{SourceError, TaskFilters, TaskSource};
use crate::{tlog_debug, tlog_trace, tlog_warn, Error, Result};

/// Default delay between the first change notification of a burst and the
/// resulting re-fetch.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

type FetchResult = std::result::Result<Vec<Task>, SourceError>;

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Coalescing delay for external change notifications.
    pub debounce: Duration,
    /// Span during which local optimistic statuses outrank fetched ones.
    pub override_window: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            override_window: DEFAULT_OVERRIDE_WINDOW,
        }
    }
}

/// Inputs to the scheduler loop.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// The scoping epic changed; reload immediately.
    EpicChanged(Option<TaskId>),
    /// The task source may have changed; debounce and reload.
    SourceChanged,
    /// Manual refresh; reload immediately, bypassing the debounce.
    Refresh,
    /// Apply an optimistic status change and sync it to the tracker.
    SetStatus { id: TaskId, status: TaskStatus },
    /// Move the focused task.
    Select(Option<TaskId>),
}

/// Outputs for the rendering collaborator.
#[derive(Debug, Clone)]
pub enum PlanEvent {
    /// The plan was recomputed.
    PlanUpdated {
        batches: Vec<Batch>,
        summary: BatchSummary,
    },
    /// A fetch failed; the previous plan is retained.
    FetchFailed { error: String },
    /// An optimistic status change was rejected and rolled back.
    StatusRolledBack { id: TaskId, error: String },
}

/// Drives the planning pipeline against a task source.
pub struct Scheduler<S> {
    source: Arc<S>,
    options: SchedulerOptions,
    epic: Option<TaskId>,
    tasks: Vec<Task>,
    ledger: UpdateLedger,
    selected: Option<TaskId>,
    batches: Vec<Batch>,
    fetch_failed: bool,
    in_flight: bool,
    deadline: Option<TokioInstant>,
}

impl<S: TaskSource> Scheduler<S> {
    pub fn new(source: Arc<S>, options: SchedulerOptions) -> Self {
        let ledger = UpdateLedger::with_window(options.override_window);
        Self {
            source,
            options,
            epic: None,
            tasks: Vec::new(),
            ledger,
            selected: None,
            batches: Vec::new(),
            fetch_failed: false,
            in_flight: false,
            deadline: None,
        }
    }

    pub fn with_defaults(source: Arc<S>) -> Self {
        Self::new(source, SchedulerOptions::default())
    }

    // ===== Read access =====

    pub fn epic(&self) -> Option<&TaskId> {
        self.epic.as_ref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The current plan; retained across failed fetches.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Whether the most recent fetch failed.
    pub fn fetch_failed(&self) -> bool {
        self.fetch_failed
    }

    /// Whether a debounced recompute is armed.
    pub fn pending_recompute(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn ledger(&self) -> &UpdateLedger {
        &self.ledger
    }

    /// The focused task, resolved against the current snapshot.
    pub fn selected_task(&self) -> Option<&Task> {
        let id = self.selected.as_ref()?;
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Compute batches for an arbitrary epic over the currently loaded
    /// tasks. Synchronous and side-effect-free.
    pub fn compute_batches(&self, epic: &TaskId) -> Vec<Batch> {
        plan::compute(&self.tasks, epic).batches
    }

    // ===== Triggers =====

    /// Change the scoping epic and reload immediately.
    pub async fn set_epic(&mut self, epic: Option<TaskId>) -> Result<()> {
        tlog_debug!("epic changed to {:?}", epic.as_ref().map(|e| e.as_str()));
        self.epic = epic;
        self.deadline = None;
        self.reload().await
    }

    /// Note an external change notification. The first notification of a
    /// burst arms the debounce deadline; the rest are absorbed into it.
    pub fn notify_change(&mut self) {
        if self.deadline.is_none() {
            self.deadline = Some(TokioInstant::now() + self.options.debounce);
            tlog_trace!("change notification: recompute armed");
        } else {
            tlog_trace!("change notification absorbed into pending recompute");
        }
    }

    /// Manual refresh: reload immediately, bypassing any armed debounce.
    pub async fn refresh(&mut self) -> Result<()> {
        self.deadline = None;
        self.reload().await
    }

    /// Move the focused task. Selecting an id that is not currently
    /// loaded clears the selection.
    pub fn select(&mut self, id: Option<TaskId>) {
        self.selected = id.filter(|id| self.tasks.iter().any(|t| &t.id == id));
    }

    // ===== Fetch lifecycle =====

    /// Start a fetch, unless one is already in flight (the duplicate is
    /// dropped, not queued; the next trigger covers any missed update).
    /// Returns the filters the fetch should use.
    pub fn begin_fetch(&mut self) -> Option<TaskFilters> {
        if self.in_flight {
            tlog_debug!("fetch already in flight, dropping duplicate request");
            return None;
        }
        self.in_flight = true;
        // This fetch satisfies any armed debounce.
        self.deadline = None;
        Some(TaskFilters::for_epic(self.epic.clone()))
    }

    /// Feed a completed fetch back in: merge under the override window,
    /// prune the ledger, carry the selection, recompute the plan. On
    /// failure the previous plan is retained and the failure flag set.
    pub fn complete_fetch(&mut self, result: FetchResult) -> std::result::Result<(), SourceError> {
        self.in_flight = false;
        match result {
            Ok(fetched) => {
                let now = Instant::now();
                let merged = merge::merge_snapshot(fetched, &self.tasks, &self.ledger, now);
                self.ledger.prune(now);
                self.selected = merge::carry_selection(self.selected.take(), &merged);
                self.tasks = merged;
                self.fetch_failed = false;
                self.recompute();
                Ok(())
            }
            Err(err) => {
                self.fetch_failed = true;
                tlog_warn!("task fetch failed, retaining previous plan: {}", err);
                Err(err)
            }
        }
    }

    /// Fetch and recompute inline. A no-op when a fetch is already in
    /// flight.
    pub async fn reload(&mut self) -> Result<()> {
        let Some(filters) = self.begin_fetch() else {
            return Ok(());
        };
        let result = self.source.list_tasks(&filters).await;
        self.complete_fetch(result).map_err(Error::from)
    }

    // ===== Mutation path =====

    /// Apply a status change optimistically and sync it to the tracker.
    ///
    /// Local state and the ledger entry are written before the tracker
    /// call goes out, so a re-fetch racing the confirmation cannot undo
    /// the change on screen. On rejection the local status is rolled back
    /// and the ledger entry removed; on success the entry is left to
    /// expire naturally, since clearing it early would reopen the race.
    pub async fn set_task_status(&mut self, id: &TaskId, status: TaskStatus) -> Result<()> {
        let Some(pos) = self.tasks.iter().position(|t| &t.id == id) else {
            return Err(Error::TaskNotFound(id.to_string()));
        };
        let previous = self.tasks[pos].status;
        self.tasks[pos].status = status;
        self.ledger.record(id.clone(), Instant::now());
        self.recompute();

        match self.source.update_status(id, status).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tlog_warn!("status update for {} rejected, rolling back: {}", id, err);
                self.tasks[pos].status = previous;
                self.ledger.remove(id);
                self.recompute();
                Err(err.into())
            }
        }
    }

    fn recompute(&mut self) {
        match &self.epic {
            Some(epic) => {
                let plan = plan::compute(&self.tasks, epic);
                self.batches = plan.batches;
            }
            None => self.batches.clear(),
        }
    }

    fn emit_plan(&self, events: &mpsc::UnboundedSender<PlanEvent>) {
        let _ = events.send(PlanEvent::PlanUpdated {
            batches: self.batches.clone(),
            summary: batch::summary(&self.batches),
        });
    }
}

impl<S: TaskSource + 'static> Scheduler<S> {
    /// Run the scheduler loop until cancellation or the trigger channel
    /// closes.
    ///
    /// Fetches run as spawned tasks so that triggers keep flowing while a
    /// fetch is in the air; the in-flight guard drops duplicates in the
    /// meantime. There is no cancellation of a running fetch: it is
    /// allowed to complete and its result is still merged.
    pub async fn run(
        mut self,
        mut triggers: mpsc::UnboundedReceiver<Trigger>,
        events: mpsc::UnboundedSender<PlanEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut changes = self.source.subscribe();
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<FetchResult>();

        loop {
            let deadline = self.deadline;
            let debounce = async move {
                match deadline {
                    Some(d) => sleep_until(d).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                maybe = triggers.recv() => match maybe {
                    Some(trigger) => self.handle_trigger(trigger, &done_tx, &events).await,
                    None => break,
                },
                Some(_) = changes.recv() => self.notify_change(),
                Some(result) = done_rx.recv() => self.finish_fetch(result, &events),
                _ = debounce => {
                    self.deadline = None;
                    self.spawn_fetch(&done_tx);
                }
            }
        }

        tlog_debug!("scheduler loop exiting");
        Ok(())
    }

    async fn handle_trigger(
        &mut self,
        trigger: Trigger,
        done_tx: &mpsc::UnboundedSender<FetchResult>,
        events: &mpsc::UnboundedSender<PlanEvent>,
    ) {
        match trigger {
            Trigger::EpicChanged(epic) => {
                tlog_debug!("epic changed to {:?}", epic.as_ref().map(|e| e.as_str()));
                self.epic = epic;
                self.deadline = None;
                self.spawn_fetch(done_tx);
            }
            Trigger::SourceChanged => self.notify_change(),
            Trigger::Refresh => {
                self.deadline = None;
                self.spawn_fetch(done_tx);
            }
            Trigger::SetStatus { id, status } => {
                let result = self.set_task_status(&id, status).await;
                self.emit_plan(events);
                if let Err(err) = result {
                    let _ = events.send(PlanEvent::StatusRolledBack {
                        id,
                        error: err.to_string(),
                    });
                }
            }
            Trigger::Select(id) => self.select(id),
        }
    }

    fn spawn_fetch(&mut self, done_tx: &mpsc::UnboundedSender<FetchResult>) {
        let Some(filters) = self.begin_fetch() else {
            return;
        };
        let source = Arc::clone(&self.source);
        let tx = done_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(source.list_tasks(&filters).await);
        });
    }

    fn finish_fetch(&mut self, result: FetchResult, events: &mpsc::UnboundedSender<PlanEvent>) {
        match self.complete_fetch(result) {
            Ok(()) => self.emit_plan(events),
            Err(err) => {
                let _ = events.send(PlanEvent::FetchFailed {
                    error: err.to_string(),
                });
            }
        }
    }
}
