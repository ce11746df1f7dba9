use chrono::{DateTime, Duration, NaiveDate, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calculations::ScheduleSolution;
use crate::project::{Project, ProjectId};
use crate::task::TaskId;

/// Per-task schedule line in a recalculation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskScheduleInfo {
    pub task_id: TaskId,
    pub name: String,
    pub start: Option<NaiveDate>,
    pub finish: Option<NaiveDate>,
    pub duration_days: i64,
    pub total_slack: Option<i64>,
    pub free_slack: Option<i64>,
    pub is_critical: bool,
    pub is_summary: bool,
}

/// Immutable outcome of one recalculation run, constructed in a single
/// step and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculationResult {
    pub project_id: ProjectId,
    pub timestamp: DateTime<Utc>,
    pub tasks: Vec<TaskScheduleInfo>,
    pub critical_path: Vec<TaskId>,
    pub project_start: Option<NaiveDate>,
    pub project_finish: Option<NaiveDate>,
    pub success: bool,
    pub error: Option<String>,
}

impl RecalculationResult {
    pub(crate) fn from_solution(
        project: &Project,
        solution: &ScheduleSolution,
        now: DateTime<Utc>,
    ) -> Self {
        let tasks = project
            .graph
            .tasks()
            .map(|task| TaskScheduleInfo {
                task_id: task.id,
                name: task.name.clone(),
                start: task.early_start,
                finish: task.early_finish,
                duration_days: task.duration_days,
                total_slack: task.total_slack,
                free_slack: solution.free_slack.get(&task.id).copied(),
                is_critical: task.is_critical,
                is_summary: task.is_summary,
            })
            .collect();

        Self {
            project_id: project.id,
            timestamp: now,
            tasks,
            critical_path: solution.critical_path.clone(),
            project_start: solution.project_start,
            project_finish: solution.project_finish,
            success: true,
            error: None,
        }
    }

    pub fn failure(project_id: ProjectId, now: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            project_id,
            timestamp: now,
            tasks: Vec::new(),
            critical_path: Vec::new(),
            project_start: None,
            project_finish: None,
            success: false,
            error: Some(message.into()),
        }
    }

    pub fn schedule_for(&self, task: TaskId) -> Option<&TaskScheduleInfo> {
        self.tasks.iter().find(|t| t.task_id == task)
    }

    /// JSON view of the result for the transport adapters.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Columnar view of the per-task schedule for the adapter layer.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let n = self.tasks.len();
        let mut ids: Vec<i64> = Vec::with_capacity(n);
        let mut names: Vec<&str> = Vec::with_capacity(n);
        let mut starts: Vec<Option<i32>> = Vec::with_capacity(n);
        let mut finishes: Vec<Option<i32>> = Vec::with_capacity(n);
        let mut durations: Vec<i64> = Vec::with_capacity(n);
        let mut total_slack: Vec<Option<i64>> = Vec::with_capacity(n);
        let mut free_slack: Vec<Option<i64>> = Vec::with_capacity(n);
        let mut critical: Vec<bool> = Vec::with_capacity(n);
        let mut summary: Vec<bool> = Vec::with_capacity(n);
        let mut on_path: Vec<bool> = Vec::with_capacity(n);

        for task in &self.tasks {
            ids.push(task.task_id);
            names.push(task.name.as_str());
            starts.push(task.start.map(date_to_i32));
            finishes.push(task.finish.map(date_to_i32));
            durations.push(task.duration_days);
            total_slack.push(task.total_slack);
            free_slack.push(task.free_slack);
            critical.push(task.is_critical);
            summary.push(task.is_summary);
            on_path.push(self.critical_path.contains(&task.task_id));
        }

        let columns = vec![
            Series::new(PlSmallStr::from_static("task_id"), ids).into_column(),
            Series::new(PlSmallStr::from_static("name"), names).into_column(),
            Series::new(PlSmallStr::from_static("start"), starts)
                .cast(&DataType::Date)?
                .into_column(),
            Series::new(PlSmallStr::from_static("finish"), finishes)
                .cast(&DataType::Date)?
                .into_column(),
            Series::new(PlSmallStr::from_static("duration_days"), durations).into_column(),
            Series::new(PlSmallStr::from_static("total_slack"), total_slack).into_column(),
            Series::new(PlSmallStr::from_static("free_slack"), free_slack).into_column(),
            Series::new(PlSmallStr::from_static("is_critical"), critical).into_column(),
            Series::new(PlSmallStr::from_static("is_summary"), summary).into_column(),
            Series::new(PlSmallStr::from_static("on_critical_path"), on_path).into_column(),
        ];
        DataFrame::new(columns)
    }
}

fn date_to_i32(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

// Used by adapters mapping Date columns back to NaiveDate.
pub fn date_from_i32(days: i32) -> NaiveDate {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    epoch + Duration::days(days as i64)
}
