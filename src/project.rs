use chrono::NaiveDate;

use crate::error::ScheduleResult;
use crate::graph::TaskGraph;
use crate::metadata::ProjectMetadata;
use crate::task::{Task, TaskId};
use crate::wbs::{OutlineNode, WbsCache};

pub type ProjectId = i64;

/// Mutable per-project scheduling state, created on first access and torn
/// down with the project.
#[derive(Debug, Default, Clone)]
pub struct ProjectScheduleState {
    pub needs_recalculation: bool,
    pub critical_path_changed: bool,
    pub earliest_start: Option<NaiveDate>,
    pub latest_finish: Option<NaiveDate>,
    pub critical_path: Vec<TaskId>,
}

/// One project: metadata, the dependency graph, the authoritative outline
/// and its derived WBS cache, and the schedule state.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub metadata: ProjectMetadata,
    pub graph: TaskGraph,
    pub outline: Option<OutlineNode>,
    pub wbs: WbsCache,
    pub state: ProjectScheduleState,
}

impl Project {
    pub fn new(id: ProjectId, metadata: ProjectMetadata) -> Self {
        Self {
            id,
            metadata,
            graph: TaskGraph::new(),
            outline: None,
            wbs: WbsCache::new(),
            state: ProjectScheduleState {
                needs_recalculation: true,
                ..ProjectScheduleState::default()
            },
        }
    }

    pub fn add_task(&mut self, task: Task) {
        self.graph.insert(task);
        self.mark_dirty();
    }

    pub fn add_dependency(&mut self, predecessor: TaskId, successor: TaskId) -> ScheduleResult<bool> {
        let added = self.graph.add_dependency(predecessor, successor)?;
        if added {
            self.mark_dirty();
        }
        Ok(added)
    }

    pub fn set_outline(&mut self, outline: Option<OutlineNode>) {
        self.outline = outline;
        self.mark_dirty();
    }

    pub fn mark_dirty(&mut self) {
        self.state.needs_recalculation = true;
    }
}
