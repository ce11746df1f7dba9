//! Slack computation, critical flagging, critical-path extraction, and
//! bottom-up summary aggregation.

use chrono::NaiveDate;

use crate::calculations::{CalendarScope, DateWindow, ScheduleSolution};
use crate::graph::TaskGraph;
use crate::task::TaskId;
use crate::wbs::{OutlineNode, WbsCache};

/// Total slack per task (`lateFinish - earlyFinish` in working days),
/// free slack against the earliest successor start, and the critical flag
/// for leaves at or under the threshold. Threshold comparison is `<=`, a
/// tolerance rather than strict equality.
pub fn compute_slack(
    graph: &TaskGraph,
    scope: &mut CalendarScope<'_>,
    threshold: i64,
    solution: &mut ScheduleSolution,
) {
    let deadline = solution.deadline;
    for &id in graph.ids() {
        let Some(&(_, early_finish)) = solution.early.get(&id) else {
            continue;
        };
        let Some(&(_, late_finish)) = solution.late.get(&id) else {
            continue;
        };
        let task = match graph.get(id) {
            Some(task) => task,
            None => continue,
        };
        let cal = scope.pattern(task.calendar);

        let total = cal.work_days_between(early_finish, late_finish);
        solution.total_slack.insert(id, total);
        if total <= threshold {
            solution.critical.insert(id);
        }

        // Free slack: how far the finish can drift before the earliest
        // successor (or the deadline, for terminal tasks) moves.
        let mut free: Option<i64> = None;
        for &succ in &task.successors {
            if let Some(&(succ_start, _)) = solution.early.get(&succ) {
                let gap = cal.work_days_between(early_finish, succ_start) - 1;
                free = Some(match free {
                    Some(current) => current.min(gap),
                    None => gap,
                });
            }
        }
        let free = free.or_else(|| {
            deadline.map(|d| cal.work_days_between(early_finish, cal.roll_backward(d)))
        });
        if let Some(free) = free {
            solution.free_slack.insert(id, free);
        }
    }

    extract_critical_path(solution);
}

/// Critical task ids ordered by early start, then id, for a stable path
/// listing.
fn extract_critical_path(solution: &mut ScheduleSolution) {
    let mut path: Vec<(NaiveDate, TaskId)> = solution
        .critical
        .iter()
        .filter_map(|&id| solution.early.get(&id).map(|&(start, _)| (start, id)))
        .collect();
    path.sort();
    solution.critical_path = path.into_iter().map(|(_, id)| id).collect();
}

/// Recompute each summary's window as the union of its children's
/// windows, children before parents so nested groups fold correctly.
/// Running it twice without child changes is a no-op.
pub fn aggregate_summaries(
    graph: &TaskGraph,
    wbs: &WbsCache,
    outline: Option<&OutlineNode>,
    solution: &mut ScheduleSolution,
) {
    for summary in wbs.summaries_bottom_up(outline) {
        let Some(task) = graph.get(summary) else {
            continue;
        };
        if !task.is_summary {
            continue;
        }

        let mut window: Option<DateWindow> = None;
        for &child in wbs.children_of(summary) {
            let child_window = child_window(graph, solution, child);
            if let Some(next) = child_window {
                window = Some(match window {
                    Some(current) => DateWindow {
                        early_start: current.early_start.min(next.early_start),
                        early_finish: current.early_finish.max(next.early_finish),
                        late_start: current.late_start.min(next.late_start),
                        late_finish: current.late_finish.max(next.late_finish),
                    },
                    None => next,
                });
            }
        }

        if let Some(window) = window {
            solution.summary_windows.insert(summary, window);
        }
    }
}

fn child_window(graph: &TaskGraph, solution: &ScheduleSolution, id: TaskId) -> Option<DateWindow> {
    if let Some(window) = solution.summary_windows.get(&id) {
        return Some(*window);
    }
    if let (Some(&(es, ef)), Some(&(ls, lf))) =
        (solution.early.get(&id), solution.late.get(&id))
    {
        return Some(DateWindow {
            early_start: es,
            early_finish: ef,
            late_start: ls,
            late_finish: lf,
        });
    }
    // External children anchor with whatever dates they carry.
    let task = graph.get(id)?;
    let es = task.early_start?;
    let ef = task.early_finish.unwrap_or(es);
    Some(DateWindow {
        early_start: es,
        early_finish: ef,
        late_start: task.late_start.unwrap_or(es),
        late_finish: task.late_finish.unwrap_or(ef),
    })
}
