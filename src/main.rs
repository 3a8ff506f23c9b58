use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tempo::core::batch::{self, Batch};
use tempo::state::ViewState;
use tempo::tracker::JsonTracker;
use tempo::{tlog, Config, PlanEvent, Scheduler, SchedulerOptions, TaskId, TaskStatus, Trigger};

#[derive(Parser)]
#[command(name = "tempo", about = "Batch planner for epic task boards", version)]
struct Cli {
    /// Tracker directory containing tasks.json
    #[arg(long, global = true)]
    tracker: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and print the batch plan for an epic
    Plan {
        /// Epic identifier to scope to
        epic: String,
    },
    /// Watch the tracker and reprint the plan when it changes
    Watch {
        /// Epic identifier to scope to
        epic: String,
    },
    /// Optimistically set a task's status and sync it to the tracker
    SetStatus {
        /// Task identifier
        id: String,
        /// New status (open, in-progress, blocked, deferred, closed)
        status: String,
    },
    /// Collapse or expand a batch in plan output
    Toggle {
        /// Batch number
        batch: u32,
    },
}

#[tokio::main]
async fn main() -> tempo::Result<()> {
    let cli = Cli::parse();
    tempo::log::init_with_debug(cli.debug);
    if tempo::log::is_debug() {
        tlog!("debug logging enabled");
    }
    Config::ensure_dirs()?;
    let config = Config::load()?;
    let tracker_dir = config.effective_tracker_dir(cli.tracker.as_deref());

    match cli.command {
        Commands::Plan { epic } => plan(tracker_dir, &epic, &config).await,
        Commands::Watch { epic } => watch(tracker_dir, &epic, &config).await,
        Commands::SetStatus { id, status } => set_status(tracker_dir, &id, &status).await,
        Commands::Toggle { batch } => toggle(batch),
    }
}

fn toggle(batch: u32) -> tempo::Result<()> {
    let mut view = ViewState::load()?;
    let collapsed = view.toggle(batch);
    view.save()?;
    println!(
        "batch {} {}",
        batch,
        if collapsed { "collapsed" } else { "expanded" }
    );
    Ok(())
}

fn options_from(config: &Config) -> SchedulerOptions {
    SchedulerOptions {
        debounce: config.debounce(),
        ..Default::default()
    }
}

async fn plan(dir: PathBuf, epic: &str, config: &Config) -> tempo::Result<()> {
    let tracker = Arc::new(JsonTracker::new(dir));
    let mut scheduler = Scheduler::new(tracker, options_from(config));
    scheduler.set_epic(Some(TaskId::from(epic))).await?;

    let view = ViewState::load()?;
    print_plan(scheduler.batches(), &view);
    Ok(())
}

async fn watch(dir: PathBuf, epic: &str, config: &Config) -> tempo::Result<()> {
    let tracker = Arc::new(JsonTracker::open(dir)?);
    let scheduler = Scheduler::new(tracker, options_from(config));

    let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let scheduler_loop = tokio::spawn(scheduler.run(trigger_rx, event_tx, cancel.clone()));

    trigger_tx
        .send(Trigger::EpicChanged(Some(TaskId::from(epic))))
        .ok();
    tlog!("watching epic {}", epic);
    let view = ViewState::load()?;

    while let Some(event) = event_rx.recv().await {
        match event {
            PlanEvent::PlanUpdated { batches, .. } => {
                println!();
                print_plan(&batches, &view);
            }
            PlanEvent::FetchFailed { error } => {
                eprintln!("fetch failed, keeping last plan: {}", error);
            }
            PlanEvent::StatusRolledBack { id, error } => {
                eprintln!("status change for {} rolled back: {}", id, error);
            }
        }
    }

    cancel.cancel();
    let _ = scheduler_loop.await;
    Ok(())
}

async fn set_status(dir: PathBuf, id: &str, status: &str) -> tempo::Result<()> {
    let status = TaskStatus::from_str(status)?;
    let tracker = Arc::new(JsonTracker::new(dir));
    let mut scheduler = Scheduler::with_defaults(tracker);
    scheduler.set_epic(None).await?;
    scheduler.set_task_status(&TaskId::from(id), status).await?;
    println!("{} -> {}", id, status);
    Ok(())
}

fn print_plan(batches: &[Batch], view: &ViewState) {
    if batches.is_empty() {
        println!("no tasks in scope");
        return;
    }
    for batch in batches {
        println!(
            "Batch {} [{}] {} - {}/{} ({}%)",
            batch.number,
            batch.phase,
            batch.status,
            batch.progress.completed,
            batch.progress.total,
            batch.progress.percent
        );
        if view.is_collapsed(batch.number) {
            println!("  ({} tasks hidden)", batch.tasks.len());
            continue;
        }
        for task in &batch.tasks {
            println!("  {:<12} {:<12} {}", task.id, task.status.as_str(), task.title);
        }
    }

    let summary = batch::summary(batches);
    match summary.active_batch {
        Some(n) => println!(
            "{}/{} batches complete, working batch {}",
            summary.completed_batches, summary.total_batches, n
        ),
        None => println!(
            "{}/{} batches complete",
            summary.completed_batches, summary.total_batches
        ),
    }
}
