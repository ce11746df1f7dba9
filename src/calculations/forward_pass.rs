use chrono::NaiveDate;
use tracing::debug;

use crate::calculations::{CalendarScope, ScheduleSolution};
use crate::error::ScheduleResult;
use crate::graph::TaskGraph;
use crate::task::{ConstraintKind, TaskId};

/// Forward pass: earliest start/finish for every scheduled task, walking
/// the DAG's topological order from the start sentinel.
pub struct ForwardPass<'a> {
    graph: &'a TaskGraph,
}

impl<'a> ForwardPass<'a> {
    pub fn new(graph: &'a TaskGraph) -> Self {
        Self { graph }
    }

    pub fn execute(
        &self,
        order: &[TaskId],
        scope: &mut CalendarScope<'_>,
        project_start: NaiveDate,
        solution: &mut ScheduleSolution,
    ) -> ScheduleResult<()> {
        for &id in order {
            let task = self.graph.require(id)?;
            let cal = scope.pattern(task.calendar);

            // Earliest start: latest predecessor finish, pushed to the
            // next working day. External predecessors anchor through
            // their stored finish; summary predecessors are ignored.
            let mut early_start: Option<NaiveDate> = None;
            for &pred in &task.predecessors {
                let pred_finish = match self.graph.get(pred) {
                    Some(p) if p.is_external => p.early_finish,
                    Some(p) if p.is_scheduled() => {
                        solution.early.get(&pred).map(|&(_, finish)| finish)
                    }
                    _ => None,
                };
                if let Some(finish) = pred_finish {
                    let candidate = cal.next_available(finish);
                    early_start = Some(match early_start {
                        Some(current) => current.max(candidate),
                        None => candidate,
                    });
                }
            }

            // Anchored at the start sentinel when nothing constrains it.
            let mut early_start =
                early_start.unwrap_or_else(|| cal.roll_forward(project_start));

            if let Some(constraint) = task.constraint {
                match constraint.kind {
                    ConstraintKind::StartNoEarlierThan => {
                        let bound = cal.roll_forward(constraint.date);
                        if bound > early_start {
                            early_start = bound;
                        }
                    }
                    ConstraintKind::MustStartOn => {
                        early_start = cal.roll_forward(constraint.date);
                    }
                    ConstraintKind::FinishNoLaterThan => {}
                }
            }

            let early_finish = if task.duration_days <= 0 {
                early_start
            } else {
                cal.add_work_days(early_start, task.duration_days)
            };

            debug!(task = id, start = %early_start, finish = %early_finish, "forward pass scheduled task");
            solution.early.insert(id, (early_start, early_finish));

            solution.project_start = Some(match solution.project_start {
                Some(current) => current.min(early_start),
                None => early_start,
            });
            solution.project_finish = Some(match solution.project_finish {
                Some(current) => current.max(early_finish),
                None => early_finish,
            });
        }
        Ok(())
    }
}
