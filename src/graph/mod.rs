//! In-memory dependency graph: tasks as nodes, ordered predecessor and
//! successor edge lists, summary/child grouping queried through the WBS
//! cache.

pub mod schedule_dag;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{Task, TaskId};
use crate::wbs::WbsCache;

#[derive(Debug, Default, Clone)]
pub struct TaskGraph {
    tasks: FxHashMap<TaskId, Task>,
    /// Insertion order, so iteration and results stay deterministic.
    order: Vec<TaskId>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a task. Edge lists of other tasks are untouched.
    pub fn insert(&mut self, task: Task) {
        if !self.tasks.contains_key(&task.id) {
            self.order.push(task.id);
        }
        self.tasks.insert(task.id, task);
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub fn require(&self, id: TaskId) -> ScheduleResult<&Task> {
        self.tasks.get(&id).ok_or(ScheduleError::UnknownTask(id))
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> &[TaskId] {
        &self.order
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Add a predecessor -> successor edge to both ordered lists. Returns
    /// false when the edge already exists (duplicates are never stored).
    pub fn add_dependency(&mut self, predecessor: TaskId, successor: TaskId) -> ScheduleResult<bool> {
        if predecessor == successor {
            return Err(ScheduleError::SelfDependency(successor));
        }
        self.require(predecessor)?;
        let succ = self.require(successor)?;
        if succ.predecessors.contains(&predecessor) {
            debug!(predecessor, successor, "dependency already present, skipping");
            return Ok(false);
        }

        if let Some(task) = self.tasks.get_mut(&successor) {
            task.predecessors.push(predecessor);
        }
        if let Some(task) = self.tasks.get_mut(&predecessor) {
            task.successors.push(successor);
        }
        Ok(true)
    }

    /// Remove the edge from both lists. Returns whether it existed.
    pub fn remove_dependency(&mut self, predecessor: TaskId, successor: TaskId) -> bool {
        let mut removed = false;
        if let Some(task) = self.tasks.get_mut(&successor) {
            let before = task.predecessors.len();
            task.predecessors.retain(|&p| p != predecessor);
            removed = task.predecessors.len() != before;
        }
        if let Some(task) = self.tasks.get_mut(&predecessor) {
            task.successors.retain(|&s| s != successor);
        }
        removed
    }

    pub fn predecessors_of(&self, id: TaskId) -> &[TaskId] {
        self.tasks.get(&id).map(|t| t.predecessors.as_slice()).unwrap_or(&[])
    }

    pub fn successors_of(&self, id: TaskId) -> &[TaskId] {
        self.tasks.get(&id).map(|t| t.successors.as_slice()).unwrap_or(&[])
    }

    /// Discard every non-external task's cached schedule.
    pub fn invalidate_schedules(&mut self) {
        for task in self.tasks.values_mut() {
            if !task.is_external {
                task.clear_schedule();
            }
        }
    }

    /// Derived query: does any leaf descendant of this summary carry the
    /// critical flag? Never stored on the summary itself.
    pub fn contains_critical_children(&self, wbs: &WbsCache, id: TaskId) -> bool {
        for &child in wbs.children_of(id) {
            match self.tasks.get(&child) {
                Some(task) if task.is_summary => {
                    if self.contains_critical_children(wbs, child) {
                        return true;
                    }
                }
                Some(task) if task.is_critical => return true,
                _ => {}
            }
        }
        false
    }

    /// Derived query: minimum total slack among leaf descendants of this
    /// summary. `None` when no descendant has computed slack.
    pub fn min_child_slack(&self, wbs: &WbsCache, id: TaskId) -> Option<i64> {
        let mut min = None;
        for &child in wbs.children_of(id) {
            let candidate = match self.tasks.get(&child) {
                Some(task) if task.is_summary => self.min_child_slack(wbs, child),
                Some(task) => task.total_slack,
                None => None,
            };
            min = match (min, candidate) {
                (Some(a), Some(b)) => Some(std::cmp::min(a, b)),
                (a, b) => a.or(b),
            };
        }
        min
    }
}
