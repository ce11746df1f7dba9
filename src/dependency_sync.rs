//! Idempotent reconciliation between an externally edited predecessor set
//! and the graph's current one. The plan is a pair of plain set
//! differences; applying it and reconciling again yields an empty plan.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::ScheduleResult;
use crate::graph::TaskGraph;
use crate::task::{Task, TaskId};

/// Minimal edge operations needed to make `current` equal `desired`.
/// Orders follow the input lists, so edits stay stable for the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub to_add: Vec<TaskId>,
    pub to_remove: Vec<TaskId>,
}

impl SyncPlan {
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Reconciles predecessor edits and keeps running counters for
/// observability. The counters are not part of the reconciliation
/// contract.
#[derive(Debug, Default)]
pub struct DependencySynchronizer {
    created: u64,
    removed: u64,
    skipped: u64,
}

impl DependencySynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `to_add = desired - current`, `to_remove = current - desired`.
    pub fn reconcile(
        &mut self,
        task: TaskId,
        desired: &[TaskId],
        current: &[TaskId],
    ) -> SyncPlan {
        let desired_set: FxHashSet<TaskId> = desired.iter().copied().collect();
        let current_set: FxHashSet<TaskId> = current.iter().copied().collect();

        let plan = SyncPlan {
            to_add: desired
                .iter()
                .copied()
                .filter(|id| !current_set.contains(id))
                .collect(),
            to_remove: current
                .iter()
                .copied()
                .filter(|id| !desired_set.contains(id))
                .collect(),
        };

        if plan.is_noop() {
            // Already synchronized: a valid state, not an error.
            self.skipped += 1;
            debug!(task, "predecessor set already synchronized");
        }
        plan
    }

    /// Apply a plan to the graph. Duplicate adds (another edit raced this
    /// one) are counted as skips rather than failures.
    pub fn apply(
        &mut self,
        graph: &mut TaskGraph,
        task: TaskId,
        plan: &SyncPlan,
    ) -> ScheduleResult<()> {
        for &pred in &plan.to_add {
            if graph.add_dependency(pred, task)? {
                self.created += 1;
            } else {
                self.skipped += 1;
            }
        }
        for &pred in &plan.to_remove {
            if graph.remove_dependency(pred, task) {
                self.removed += 1;
            } else {
                self.skipped += 1;
            }
        }
        Ok(())
    }

    pub fn created_edges(&self) -> u64 {
        self.created
    }

    pub fn removed_edges(&self) -> u64 {
        self.removed
    }

    pub fn skipped_edges(&self) -> u64 {
        self.skipped
    }
}

/// Stable identity used when matching tasks from the external edit
/// source: the explicit external id, falling back to the display name.
/// The fallback is deliberately lossy: two tasks sharing a name with no
/// explicit id are indistinguishable here. The intended invariant is that
/// ids are always set; nothing enforces it, so this stays a known gap.
pub fn sync_key(task: &Task) -> &str {
    task.sync_key()
}
