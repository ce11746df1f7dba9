use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::TaskGraph;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DagNode {
    Start,
    End,
    Task(TaskId),
}

/// The petgraph view of the task graph used by the passes: leaf tasks as
/// nodes, anchored between synthetic start and end sentinels. Rebuilt from
/// the current predecessor/successor sets on every structural reset, so
/// stale edges from earlier partial recalculations cannot survive.
pub struct ScheduleDag {
    pub graph: DiGraph<DagNode, ()>,
    pub start: NodeIndex,
    pub end: NodeIndex,
    id_to_index: FxHashMap<TaskId, NodeIndex>,
}

impl ScheduleDag {
    pub fn build(tasks: &TaskGraph) -> Self {
        let mut graph: DiGraph<DagNode, ()> = DiGraph::new();
        let start = graph.add_node(DagNode::Start);
        let end = graph.add_node(DagNode::End);
        let mut id_to_index: FxHashMap<TaskId, NodeIndex> = FxHashMap::default();

        // Nodes first: only leaf, non-external tasks are scheduled.
        for task in tasks.tasks().filter(|t| t.is_scheduled()) {
            let ix = graph.add_node(DagNode::Task(task.id));
            id_to_index.insert(task.id, ix);
        }

        // Then edges between scheduled tasks. Edges touching summaries or
        // externals are resolved by the passes, not the DAG.
        let mut task_edges = 0usize;
        for task in tasks.tasks().filter(|t| t.is_scheduled()) {
            let Some(&v) = id_to_index.get(&task.id) else {
                continue;
            };
            for pred in &task.predecessors {
                if let Some(&u) = id_to_index.get(pred) {
                    graph.add_edge(u, v, ());
                    task_edges += 1;
                }
            }
        }

        // Anchor to the sentinels: no predecessors hangs off Start, no
        // successors feeds End.
        let task_nodes: Vec<NodeIndex> = id_to_index.values().copied().collect();
        for &ix in &task_nodes {
            if graph
                .neighbors_directed(ix, Direction::Incoming)
                .next()
                .is_none()
            {
                graph.add_edge(start, ix, ());
            }
            if graph
                .neighbors_directed(ix, Direction::Outgoing)
                .next()
                .is_none()
            {
                graph.add_edge(ix, end, ());
            }
        }
        graph.add_edge(start, end, ());

        if task_edges == 0 && id_to_index.len() > 1 {
            // Valid degenerate shape, not a graph error: every task is
            // anchored directly to both sentinels.
            warn!(
                tasks = id_to_index.len(),
                "project has no dependency edges, all tasks anchored to sentinels"
            );
        }

        Self {
            graph,
            start,
            end,
            id_to_index,
        }
    }

    pub fn node_of(&self, id: TaskId) -> Option<NodeIndex> {
        self.id_to_index.get(&id).copied()
    }

    /// Scheduled task ids in dependency order, start sentinel first.
    pub fn toposort_tasks(&self) -> ScheduleResult<Vec<TaskId>> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            let at = match self.graph[cycle.node_id()] {
                DagNode::Task(id) => id,
                DagNode::Start | DagNode::End => 0,
            };
            ScheduleError::DependencyCycle(at)
        })?;
        Ok(order
            .into_iter()
            .filter_map(|ix| match self.graph[ix] {
                DagNode::Task(id) => Some(id),
                _ => None,
            })
            .collect())
    }
}
