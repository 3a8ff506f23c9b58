//! Cycle-tolerant depth assignment over the blocker graph.
//!
//! A task's depth is the length of its longest chain of in-set blockers:
//! 0 with no in-set blockers, otherwise one more than the deepest blocker.
//! Traversal is an explicit-stack post-order walk over the graph's node
//! indices; recursion would overflow on pathological chains, and the
//! on-path marks double as the cycle detector.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use petgraph::Direction;

use crate::core::graph::BlockerGraph;
use crate::core::task::TaskId;
use crate::tlog_warn;

/// A blocking edge that closed a cycle during traversal.
///
/// Reported as a diagnostic and treated as non-blocking (a contribution of
/// zero) so that depth assignment always terminates. Malformed input must
/// not take the board down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleEdge {
    /// The blocker side of the edge that was ignored.
    pub blocker: TaskId,
    /// The task it claimed to block.
    pub blocked: TaskId,
}

impl std::fmt::Display for CycleEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.blocker, self.blocked)
    }
}

/// Result of depth assignment: a depth per task plus any cycle diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DepthMap {
    depths: HashMap<TaskId, u32>,
    cycles: Vec<CycleEdge>,
}

impl DepthMap {
    pub fn depth_of(&self, id: &TaskId) -> Option<u32> {
        self.depths.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Back-edges that were ignored during traversal, if any.
    pub fn cycles(&self) -> &[CycleEdge] {
        &self.cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

struct Frame {
    node: NodeIndex,
    blockers: Vec<NodeIndex>,
    next: usize,
    best: u32,
}

enum Step {
    Noop,
    Descend(NodeIndex),
    BackEdge { blocker: NodeIndex, blocked: NodeIndex },
    Finish,
}

/// Assign a depth to every task in the graph.
///
/// Deterministic for a fixed graph: roots are visited in the graph's
/// sorted-id node order, so even cycle resolution is reproducible.
pub fn assign(graph: &BlockerGraph) -> DepthMap {
    let g = graph.graph();
    let mut marks = vec![Mark::Unvisited; g.node_count()];
    let mut depths = vec![0u32; g.node_count()];
    let mut cycles: Vec<CycleEdge> = Vec::new();

    let frame = |node: NodeIndex| Frame {
        node,
        blockers: g.neighbors_directed(node, Direction::Incoming).collect(),
        next: 0,
        best: 0,
    };

    for start in g.node_indices() {
        if marks[start.index()] != Mark::Unvisited {
            continue;
        }
        marks[start.index()] = Mark::OnPath;
        let mut stack = vec![frame(start)];

        loop {
            let step = match stack.last_mut() {
                None => break,
                Some(top) => {
                    if top.next < top.blockers.len() {
                        let blocker = top.blockers[top.next];
                        top.next += 1;
                        match marks[blocker.index()] {
                            Mark::Done => {
                                top.best = top.best.max(depths[blocker.index()] + 1);
                                Step::Noop
                            }
                            Mark::OnPath => Step::BackEdge {
                                blocker,
                                blocked: top.node,
                            },
                            Mark::Unvisited => Step::Descend(blocker),
                        }
                    } else {
                        Step::Finish
                    }
                }
            };

            match step {
                Step::Noop => {}
                Step::Descend(node) => {
                    marks[node.index()] = Mark::OnPath;
                    stack.push(frame(node));
                }
                Step::BackEdge { blocker, blocked } => {
                    // Treated as non-blocking: contributes 0 to the depth.
                    if let (Some(from), Some(to)) = (g.node_weight(blocker), g.node_weight(blocked))
                    {
                        cycles.push(CycleEdge {
                            blocker: from.clone(),
                            blocked: to.clone(),
                        });
                    }
                }
                Step::Finish => {
                    if let Some(done) = stack.pop() {
                        marks[done.node.index()] = Mark::Done;
                        depths[done.node.index()] = done.best;
                        if let Some(parent) = stack.last_mut() {
                            parent.best = parent.best.max(done.best + 1);
                        }
                    }
                }
            }
        }
    }

    for edge in &cycles {
        tlog_warn!("dependency cycle: ignoring blocking edge {}", edge);
    }

    let depths = g
        .node_indices()
        .filter_map(|n| g.node_weight(n).map(|id| (id.clone(), depths[n.index()])))
        .collect();

    DepthMap { depths, cycles }
}
