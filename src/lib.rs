pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod orchestration;
pub mod state;
pub mod tracker;

pub use crate::core::batch::{Batch, BatchPhase, BatchStatus, BatchSummary};
pub use crate::core::task::{Task, TaskId, TaskStatus};
pub use config::Config;
pub use error::{Error, Result};
pub use orchestration::{PlanEvent, Scheduler, SchedulerOptions, TaskSource, Trigger};
