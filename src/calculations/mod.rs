//! The per-recalculation pipeline: phase sequencing, the scratch solution
//! the passes write into, and calendar resolution shared by the passes.
//!
//! Passes never touch task state directly. They fill a `ScheduleSolution`,
//! and the orchestrator commits it only once every phase has succeeded, so
//! a failed run leaves the last good schedule in place.

pub mod backward_pass;
pub mod forward_pass;
pub mod slack;

use std::fmt;

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::calendar::{CalendarId, CalendarRegistry, WorkCalendar};
use crate::graph::TaskGraph;
use crate::task::TaskId;

/// Phases of one recalculation run, in order. Terminal on `Done` or on
/// the first failure, which is reported with the phase it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalcPhase {
    Invalidated,
    StructuralReset,
    DeadlineResolved,
    ForwardPass,
    BackwardPass,
    SlackAndFlagging,
    SummaryAggregation,
    Done,
}

impl fmt::Display for RecalcPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecalcPhase::Invalidated => "invalidation",
            RecalcPhase::StructuralReset => "structural reset",
            RecalcPhase::DeadlineResolved => "deadline resolution",
            RecalcPhase::ForwardPass => "forward pass",
            RecalcPhase::BackwardPass => "backward pass",
            RecalcPhase::SlackAndFlagging => "slack and flagging",
            RecalcPhase::SummaryAggregation => "summary aggregation",
            RecalcPhase::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Aggregated early/late window of a summary task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
}

/// Scratch output of one recalculation run, keyed by task id.
#[derive(Debug, Default)]
pub struct ScheduleSolution {
    pub early: FxHashMap<TaskId, (NaiveDate, NaiveDate)>,
    pub late: FxHashMap<TaskId, (NaiveDate, NaiveDate)>,
    pub total_slack: FxHashMap<TaskId, i64>,
    pub free_slack: FxHashMap<TaskId, i64>,
    pub critical: FxHashSet<TaskId>,
    pub summary_windows: FxHashMap<TaskId, DateWindow>,
    pub critical_path: Vec<TaskId>,
    pub project_start: Option<NaiveDate>,
    pub project_finish: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
}

impl ScheduleSolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the solution back into the task graph: invalidate cached
    /// schedules, then apply the computed dates. This is the only point
    /// where task state changes.
    pub fn commit(&self, graph: &mut TaskGraph) {
        graph.invalidate_schedules();
        let ids: Vec<TaskId> = graph.ids().to_vec();
        for id in ids {
            let Some(task) = graph.get_mut(id) else {
                continue;
            };
            if task.is_summary {
                if let Some(window) = self.summary_windows.get(&id) {
                    task.early_start = Some(window.early_start);
                    task.early_finish = Some(window.early_finish);
                    task.late_start = Some(window.late_start);
                    task.late_finish = Some(window.late_finish);
                }
                // Summaries are never critical; their slack is a derived
                // query, not a stored value.
                task.is_critical = false;
                task.total_slack = None;
                continue;
            }
            if task.is_external {
                continue;
            }
            if let Some(&(es, ef)) = self.early.get(&id) {
                task.early_start = Some(es);
                task.early_finish = Some(ef);
            }
            if let Some(&(ls, lf)) = self.late.get(&id) {
                task.late_start = Some(ls);
                task.late_finish = Some(lf);
            }
            task.total_slack = self.total_slack.get(&id).copied();
            task.is_critical = self.critical.contains(&id);
        }
    }
}

/// Per-run calendar resolution with memoized effective patterns. Tasks
/// without an association use the project calendar, then the standard
/// pattern.
pub struct CalendarScope<'a> {
    registry: &'a CalendarRegistry,
    project_calendar: Option<CalendarId>,
    cache: FxHashMap<CalendarId, WorkCalendar>,
    fallback: WorkCalendar,
}

impl<'a> CalendarScope<'a> {
    pub fn new(registry: &'a CalendarRegistry, project_calendar: Option<CalendarId>) -> Self {
        Self {
            registry,
            project_calendar,
            cache: FxHashMap::default(),
            fallback: WorkCalendar::standard(),
        }
    }

    pub fn pattern(&mut self, calendar: Option<CalendarId>) -> &WorkCalendar {
        match calendar.or(self.project_calendar) {
            Some(id) => self
                .cache
                .entry(id)
                .or_insert_with(|| self.registry.effective_pattern(id)),
            None => &self.fallback,
        }
    }
}
