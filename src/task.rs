use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarId;

/// Internal sequential task key, handed out by the engine's id counter.
pub type TaskId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    StartNoEarlierThan,
    FinishNoLaterThan,
    MustStartOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskConstraint {
    pub kind: ConstraintKind,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Stable id from the external edit source, when one was assigned.
    pub external_id: Option<String>,
    pub name: String,
    /// Duration in working days of the task's calendar.
    pub duration_days: i64,
    /// Association into the calendar registry; `None` uses the project
    /// calendar.
    pub calendar: Option<CalendarId>,
    pub constraint: Option<TaskConstraint>,
    /// Summary (group) task: dates aggregate from children, never
    /// scheduled or flagged critical directly.
    pub is_summary: bool,
    /// External placeholder: excluded from scheduling, but stored dates
    /// may still anchor successors.
    pub is_external: bool,
    pub early_start: Option<NaiveDate>,
    pub early_finish: Option<NaiveDate>,
    pub late_start: Option<NaiveDate>,
    pub late_finish: Option<NaiveDate>,
    /// Working days between early finish and late finish.
    pub total_slack: Option<i64>,
    pub is_critical: bool,
    pub predecessors: Vec<TaskId>,
    pub successors: Vec<TaskId>,
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>, duration_days: i64) -> Self {
        Self {
            id,
            external_id: None,
            name: name.into(),
            duration_days,
            calendar: None,
            constraint: None,
            is_summary: false,
            is_external: false,
            early_start: None,
            early_finish: None,
            late_start: None,
            late_finish: None,
            total_slack: None,
            is_critical: false,
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn summary(id: TaskId, name: impl Into<String>) -> Self {
        let mut task = Self::new(id, name, 0);
        task.is_summary = true;
        task
    }

    pub fn external(id: TaskId, name: impl Into<String>) -> Self {
        let mut task = Self::new(id, name, 0);
        task.is_external = true;
        task
    }

    pub fn with_constraint(mut self, kind: ConstraintKind, date: NaiveDate) -> Self {
        self.constraint = Some(TaskConstraint { kind, date });
        self
    }

    pub fn with_calendar(mut self, calendar: CalendarId) -> Self {
        self.calendar = Some(calendar);
        self
    }

    /// Identity used by the dependency synchronizer. Falls back to the
    /// display name when no external id is set, which is lossy when two
    /// unidentified tasks share a name.
    pub fn sync_key(&self) -> &str {
        self.external_id.as_deref().unwrap_or(&self.name)
    }

    /// Leaf tasks participate in the passes; summaries aggregate and
    /// externals anchor.
    pub fn is_scheduled(&self) -> bool {
        !self.is_summary && !self.is_external
    }

    pub fn clear_schedule(&mut self) {
        self.early_start = None;
        self.early_finish = None;
        self.late_start = None;
        self.late_finish = None;
        self.total_slack = None;
        self.is_critical = false;
    }
}
