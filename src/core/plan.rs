//! The planning pipeline: scope, graph, depth, batches.
//!
//! `compute` is a pure function of the task snapshot and the epic id; two
//! runs over identical inputs produce element-wise identical plans.

use crate::core::batch::{self, Batch};
use crate::core::depth::{self, CycleEdge};
use crate::core::graph::BlockerGraph;
use crate::core::task::{self, Task, TaskId};
use crate::tlog_debug;

/// The output of one pipeline run.
#[derive(Debug, Clone)]
pub struct Plan {
    pub epic: TaskId,
    pub batches: Vec<Batch>,
    /// Back-edges ignored during depth assignment, surfaced as diagnostics.
    pub cycles: Vec<CycleEdge>,
}

/// Run the full pipeline for one epic over a task snapshot.
pub fn compute(tasks: &[Task], epic: &TaskId) -> Plan {
    let scoped = task::scope_to_epic(tasks, epic);
    let graph = BlockerGraph::build(&scoped);
    let depths = depth::assign(&graph);
    let batches = batch::group(&scoped, &depths);
    tlog_debug!(
        "plan for {}: {} tasks in scope, {} batches",
        epic,
        scoped.len(),
        batches.len()
    );
    Plan {
        epic: epic.clone(),
        batches,
        cycles: depths.cycles().to_vec(),
    }
}
