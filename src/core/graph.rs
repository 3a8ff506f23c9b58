//! Blocking-dependency graph over a scoped task set.
//!
//! The graph is rebuilt from scratch on every pipeline run and only knows
//! about tasks inside the scoped set: a `blocked_by` reference that points
//! outside the set is treated as an external, already-resolved dependency
//! and never becomes an edge.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::task::{Task, TaskId};

/// Directed graph of blocking dependencies, restricted to one scoped set.
///
/// Nodes carry task identifiers; an edge runs from a blocker to the task
/// it blocks. Nodes are inserted in sorted-id order so that traversals
/// over node indices are reproducible for a fixed input.
pub struct BlockerGraph {
    graph: DiGraph<TaskId, ()>,
    index: HashMap<TaskId, NodeIndex>,
}

impl BlockerGraph {
    /// Build the graph for a scoped task set.
    ///
    /// Edges are the union of each task's `blocked_by` list and its
    /// `dependencies` list, with duplicates collapsed and out-of-set
    /// references skipped. Never fails; an empty set yields an empty
    /// graph.
    pub fn build(scoped: &[&Task]) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        let mut ids: Vec<&TaskId> = scoped.iter().map(|t| &t.id).collect();
        ids.sort();
        ids.dedup();
        for id in ids {
            let node = graph.add_node(id.clone());
            index.insert(id.clone(), node);
        }

        for task in scoped {
            let Some(&blocked) = index.get(&task.id) else {
                continue;
            };
            for blocker_id in task.blocked_by.iter().chain(task.dependencies.iter()) {
                let Some(&blocker) = index.get(blocker_id) else {
                    // External blocker, already resolved as far as this
                    // scope is concerned.
                    continue;
                };
                if graph.find_edge(blocker, blocked).is_none() {
                    graph.add_edge(blocker, blocked, ());
                }
            }
        }

        Self { graph, index }
    }

    /// Number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of blocking edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.index.contains_key(id)
    }

    /// In-set blockers of the given task.
    pub fn blockers_of(&self, id: &TaskId) -> Vec<&TaskId> {
        let Some(&node) = self.index.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .filter_map(|n| self.graph.node_weight(n))
            .collect()
    }

    pub(crate) fn graph(&self) -> &DiGraph<TaskId, ()> {
        &self.graph
    }
}

impl std::fmt::Debug for BlockerGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockerGraph")
            .field("tasks", &self.len())
            .field("edges", &self.edge_count())
            .finish()
    }
}
