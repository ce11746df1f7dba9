//! Recalculation orchestration: the phase sequence over one project,
//! result assembly, and the incremental single-task variant.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::calculations::backward_pass::BackwardPass;
use crate::calculations::forward_pass::ForwardPass;
use crate::calculations::slack::{aggregate_summaries, compute_slack};
use crate::calculations::{CalendarScope, RecalcPhase, ScheduleSolution};
use crate::calendar::CalendarRegistry;
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::schedule_dag::ScheduleDag;
use crate::project::Project;
use crate::result::RecalculationResult;
use crate::task::TaskId;

/// Tuning knobs for a recalculation run.
#[derive(Debug, Clone, Copy)]
pub struct RecalcOptions {
    /// A leaf is critical when its total slack is at or under this bound
    /// (working days). Kept configurable so sub-day calendars can widen
    /// it; integral day durations need no rounding tolerance.
    pub critical_slack_threshold: i64,
}

impl Default for RecalcOptions {
    fn default() -> Self {
        Self {
            critical_slack_threshold: 0,
        }
    }
}

/// Full recalculation of one project. Runs every phase against a scratch
/// solution; on success commits it, refreshes the schedule state, and
/// synchronizes the auxiliary finish date. On failure the prior schedule
/// is left untouched and the result carries the failing phase.
pub fn recalculate_full(
    project: &mut Project,
    calendars: &CalendarRegistry,
    options: RecalcOptions,
    now: DateTime<Utc>,
) -> RecalculationResult {
    match run_phases(project, calendars, options, true) {
        Ok(solution) => finish_run(project, solution, now, true),
        Err(err) => {
            warn!(project = project.id, error = %err, "recalculation failed, keeping last good schedule");
            RecalculationResult::failure(project.id, now, err.to_string())
        }
    }
}

/// Incremental recalculation after a single-task edit: reruns the passes
/// over the existing structure, skipping the WBS rebuild and the
/// auxiliary write-back. Faster than a full run, but outline or grouping
/// edits made since the last full recalculation are not picked up;
/// callers trade that completeness for latency.
pub fn recalculate_incremental(
    project: &mut Project,
    task: TaskId,
    calendars: &CalendarRegistry,
    options: RecalcOptions,
    now: DateTime<Utc>,
) -> RecalculationResult {
    if !project.graph.contains(task) {
        return RecalculationResult::failure(
            project.id,
            now,
            ScheduleError::UnknownTask(task).to_string(),
        );
    }
    debug!(project = project.id, task, "incremental recalculation");

    match run_phases(project, calendars, options, false) {
        Ok(solution) => finish_run(project, solution, now, false),
        Err(err) => RecalculationResult::failure(project.id, now, err.to_string()),
    }
}

fn run_phases(
    project: &mut Project,
    calendars: &CalendarRegistry,
    options: RecalcOptions,
    structural_reset: bool,
) -> ScheduleResult<ScheduleSolution> {
    let mut solution = ScheduleSolution::new();

    // Invalidation is deferred into the commit so a failed run cannot
    // leave the project half-cleared.
    if structural_reset {
        project.wbs.rebuild(project.outline.as_ref());
    }

    // Structural reset: sentinels and task-to-sentinel edges rebuilt from
    // the current predecessor/successor sets.
    let dag = ScheduleDag::build(&project.graph);
    let order = dag
        .toposort_tasks()
        .map_err(|e| e.in_phase(RecalcPhase::StructuralReset))?;

    let mut scope = CalendarScope::new(calendars, project.metadata.calendar);
    let project_start = project.metadata.project_start_date;

    ForwardPass::new(&project.graph)
        .execute(&order, &mut scope, project_start, &mut solution)
        .map_err(|e| e.in_phase(RecalcPhase::ForwardPass))?;

    // Deadline resolution: the imposed finish is authoritative when set,
    // otherwise the forward pass's computed finish (standard CPM). The
    // backward pass never runs before this value exists.
    let deadline = match project.metadata.imposed_finish_date {
        Some(imposed) => imposed,
        None => solution.project_finish.unwrap_or(project_start),
    };
    solution.deadline = Some(deadline);

    BackwardPass::new(&project.graph)
        .execute(&order, &mut scope, deadline, &mut solution)
        .map_err(|e| e.in_phase(RecalcPhase::BackwardPass))?;

    compute_slack(
        &project.graph,
        &mut scope,
        options.critical_slack_threshold,
        &mut solution,
    );

    aggregate_summaries(
        &project.graph,
        &project.wbs,
        project.outline.as_ref(),
        &mut solution,
    );

    Ok(solution)
}

fn finish_run(
    project: &mut Project,
    solution: ScheduleSolution,
    now: DateTime<Utc>,
    full: bool,
) -> RecalculationResult {
    solution.commit(&mut project.graph);

    let previous_path = std::mem::take(&mut project.state.critical_path);
    project.state.critical_path = solution.critical_path.clone();
    project.state.critical_path_changed = previous_path != solution.critical_path;
    project.state.earliest_start = solution.project_start;
    project.state.latest_finish = latest_finish(project, &solution);
    project.state.needs_recalculation = false;

    if full {
        // Close the feedback loop for the persistence adapters: a later
        // deadline resolution from stored metadata must reproduce this
        // schedule instead of accumulating stale maximums.
        if project.metadata.imposed_finish_date.is_none() {
            if let Some(finish) = solution.project_finish {
                project.metadata.project_end_date = finish;
            }
        }
    }

    info!(
        project = project.id,
        tasks = project.graph.len(),
        critical = solution.critical_path.len(),
        "recalculation complete"
    );
    RecalculationResult::from_solution(project, &solution, now)
}

fn latest_finish(project: &Project, solution: &ScheduleSolution) -> Option<NaiveDate> {
    // External anchors can extend past the computed finish.
    let external_max = project
        .graph
        .tasks()
        .filter(|t| t.is_external)
        .filter_map(|t| t.early_finish)
        .max();
    match (solution.project_finish, external_max) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
