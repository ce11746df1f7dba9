use chrono::NaiveDate;
use tracing::debug;

use crate::calculations::{CalendarScope, ScheduleSolution};
use crate::error::ScheduleResult;
use crate::graph::TaskGraph;
use crate::task::{ConstraintKind, TaskId};

/// Backward pass: latest start/finish in reverse topological order,
/// seeded from the resolved deadline (imposed or computed). Must only run
/// after the forward pass has produced the deadline when none is imposed.
pub struct BackwardPass<'a> {
    graph: &'a TaskGraph,
}

impl<'a> BackwardPass<'a> {
    pub fn new(graph: &'a TaskGraph) -> Self {
        Self { graph }
    }

    pub fn execute(
        &self,
        order: &[TaskId],
        scope: &mut CalendarScope<'_>,
        deadline: NaiveDate,
        solution: &mut ScheduleSolution,
    ) -> ScheduleResult<()> {
        for &id in order.iter().rev() {
            let task = self.graph.require(id)?;
            let cal = scope.pattern(task.calendar);

            // Latest finish: min of successor late starts and the
            // deadline; an imposed deadline earlier than the computed
            // schedule legitimately drives slack negative.
            let mut late_finish = cal.roll_backward(deadline);
            for &succ in &task.successors {
                let succ_start = match self.graph.get(succ) {
                    Some(s) if s.is_external => s.late_start.or(s.early_start),
                    Some(s) if s.is_scheduled() => {
                        solution.late.get(&succ).map(|&(start, _)| start)
                    }
                    _ => None,
                };
                if let Some(start) = succ_start {
                    let candidate = cal.prev_available(start);
                    if candidate < late_finish {
                        late_finish = candidate;
                    }
                }
            }

            if let Some(constraint) = task.constraint {
                if constraint.kind == ConstraintKind::FinishNoLaterThan {
                    let bound = cal.roll_backward(constraint.date);
                    if bound < late_finish {
                        late_finish = bound;
                    }
                }
            }

            let late_start = if task.duration_days <= 0 {
                late_finish
            } else {
                cal.sub_work_days(late_finish, task.duration_days)
            };

            debug!(task = id, start = %late_start, finish = %late_finish, "backward pass scheduled task");
            solution.late.insert(id, (late_start, late_finish));
        }
        Ok(())
    }
}
