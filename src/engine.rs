//! Entry point for concurrent callers: per-project write serialization,
//! shared calendar registry, and the monotonic id counter.
//!
//! There are no process-wide singletons; whatever composes the service
//! constructs a `SchedulingEngine`, passes it around, and drops it when
//! done. Each project sits behind its own `RwLock`, so one project's
//! recalculation never blocks another's readers, and no cross-project
//! lock ordering exists. Calendars are shared across projects and sit
//! behind a single dedicated lock distinct from the project locks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::debug;

use crate::calendar::{BaseCalendar, CalendarId, CalendarRegistry, DerivedCalendar};
use crate::calendar_validation::{self, CalendarValidation};
use crate::dependency_sync::{DependencySynchronizer, SyncPlan};
use crate::error::{ScheduleError, ScheduleResult};
use crate::metadata::ProjectMetadata;
use crate::project::{Project, ProjectId};
use crate::recalc::{recalculate_full, recalculate_incremental, RecalcOptions};
use crate::result::RecalculationResult;
use crate::task::TaskId;

/// Running totals from the dependency synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncCounters {
    pub created: u64,
    pub removed: u64,
    pub skipped: u64,
}

#[derive(Clone)]
pub struct EngineConfig {
    pub recalc: RecalcOptions,
    /// Clock consumed from the composing layer; only results and the
    /// deadline fallback read it.
    pub clock: fn() -> DateTime<Utc>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recalc: RecalcOptions::default(),
            clock: Utc::now,
        }
    }
}

pub struct SchedulingEngine {
    config: EngineConfig,
    projects: RwLock<HashMap<ProjectId, Arc<RwLock<Project>>>>,
    calendars: Mutex<CalendarRegistry>,
    synchronizer: Mutex<DependencySynchronizer>,
    /// Never decremented and never reused; ids burned by failed
    /// operations stay burned.
    next_id: AtomicI64,
}

impl SchedulingEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            projects: RwLock::new(HashMap::new()),
            calendars: Mutex::new(CalendarRegistry::new()),
            synchronizer: Mutex::new(DependencySynchronizer::new()),
            next_id: AtomicI64::new(0),
        }
    }

    /// Monotonically increasing id for tasks, calendars, and projects.
    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn create_project(&self, metadata: ProjectMetadata) -> ProjectId {
        let id = self.next_id();
        let project = Project::new(id, metadata);
        self.projects.write().insert(id, Arc::new(RwLock::new(project)));
        debug!(project = id, "project registered");
        id
    }

    pub fn insert_project(&self, project: Project) {
        self.projects
            .write()
            .insert(project.id, Arc::new(RwLock::new(project)));
    }

    pub fn remove_project(&self, id: ProjectId) -> bool {
        self.projects.write().remove(&id).is_some()
    }

    fn project(&self, id: ProjectId) -> ScheduleResult<Arc<RwLock<Project>>> {
        self.projects
            .read()
            .get(&id)
            .cloned()
            .ok_or(ScheduleError::UnknownProject(id))
    }

    /// Run a closure under the project's shared read lock.
    pub fn with_project<R>(
        &self,
        id: ProjectId,
        f: impl FnOnce(&Project) -> R,
    ) -> ScheduleResult<R> {
        let slot = self.project(id)?;
        let guard = slot.read();
        Ok(f(&guard))
    }

    /// Run a mutation under the project's exclusive write lock. The
    /// project is marked dirty afterwards; every structural or calendar
    /// edit goes through here.
    pub fn update_project<R>(
        &self,
        id: ProjectId,
        f: impl FnOnce(&mut Project) -> R,
    ) -> ScheduleResult<R> {
        let slot = self.project(id)?;
        let mut guard = slot.write();
        let out = f(&mut guard);
        guard.mark_dirty();
        Ok(out)
    }

    /// Full recalculation, serialized against all other writers of this
    /// project. Runs to completion or failure inside the lock; there is
    /// no cancellation.
    pub fn recalculate(&self, id: ProjectId) -> ScheduleResult<RecalculationResult> {
        let slot = self.project(id)?;
        let calendars = self.calendars.lock().clone();
        let mut project = slot.write();
        Ok(recalculate_full(
            &mut project,
            &calendars,
            self.config.recalc,
            (self.config.clock)(),
        ))
    }

    /// Incremental recalculation after a single-task edit. See
    /// `recalc::recalculate_incremental` for the completeness tradeoff.
    pub fn recalculate_task(
        &self,
        id: ProjectId,
        task: TaskId,
    ) -> ScheduleResult<RecalculationResult> {
        let slot = self.project(id)?;
        let calendars = self.calendars.lock().clone();
        let mut project = slot.write();
        Ok(recalculate_incremental(
            &mut project,
            task,
            &calendars,
            self.config.recalc,
            (self.config.clock)(),
        ))
    }

    /// Recalculate every registered project. Projects lock independently,
    /// so the runs proceed in parallel.
    pub fn recalculate_all(&self) -> Vec<(ProjectId, RecalculationResult)> {
        let slots: Vec<(ProjectId, Arc<RwLock<Project>>)> = self
            .projects
            .read()
            .iter()
            .map(|(&id, slot)| (id, Arc::clone(slot)))
            .collect();
        let calendars = self.calendars.lock().clone();
        let options = self.config.recalc;
        let clock = self.config.clock;

        slots
            .into_par_iter()
            .map(|(id, slot)| {
                let mut project = slot.write();
                let result = recalculate_full(&mut project, &calendars, options, clock());
                (id, result)
            })
            .collect()
    }

    pub fn needs_recalculation(&self, id: ProjectId) -> ScheduleResult<bool> {
        self.with_project(id, |p| p.state.needs_recalculation)
    }

    pub fn is_critical_path_changed(&self, id: ProjectId) -> ScheduleResult<bool> {
        self.with_project(id, |p| p.state.critical_path_changed)
    }

    /// Called by any mutation outside the engine, e.g. an edited duration.
    pub fn mark_dirty(&self, id: ProjectId) -> ScheduleResult<()> {
        self.update_project(id, |_| ())
    }

    pub fn rebuild_wbs(&self, id: ProjectId) -> ScheduleResult<()> {
        self.update_project(id, |p| {
            let outline = p.outline.take();
            p.wbs.rebuild(outline.as_ref());
            p.outline = outline;
        })
    }

    /// Reconcile a task's predecessor set against an external edit:
    /// computes the minimal add/remove plan, applies it, and returns the
    /// plan. Reconciling again with the same desired set is a no-op.
    pub fn reconcile(
        &self,
        id: ProjectId,
        task: TaskId,
        desired: &[TaskId],
    ) -> ScheduleResult<SyncPlan> {
        let slot = self.project(id)?;
        let mut project = slot.write();
        let mut sync = self.synchronizer.lock();
        let current = project.graph.predecessors_of(task).to_vec();
        let plan = sync.reconcile(task, desired, &current);
        // Validate additions before touching the graph: a bad id must not
        // leave the plan half-applied with the dirty flag unset.
        for &pred in &plan.to_add {
            if pred == task {
                return Err(ScheduleError::SelfDependency(task));
            }
            project.graph.require(pred)?;
        }
        sync.apply(&mut project.graph, task, &plan)?;
        if !plan.is_noop() {
            project.mark_dirty();
        }
        Ok(plan)
    }

    pub fn sync_counters(&self) -> SyncCounters {
        let sync = self.synchronizer.lock();
        SyncCounters {
            created: sync.created_edges(),
            removed: sync.removed_edges(),
            skipped: sync.skipped_edges(),
        }
    }

    // Calendar operations share one registry across projects, guarded by
    // its own lock. Every rule mutation invalidates the calendar: any
    // project may reference the edited id, including ids that resolved to
    // the fallback pattern before the calendar existed.

    pub fn add_base_calendar(&self, calendar: BaseCalendar) {
        let id = calendar.id;
        self.calendars.lock().add_base(calendar);
        self.invalidate_calendar(id);
    }

    pub fn add_derived_calendar(&self, calendar: DerivedCalendar) {
        let id = calendar.id;
        self.calendars.lock().add_derived(calendar);
        self.invalidate_calendar(id);
    }

    pub fn validate_calendar(&self, id: CalendarId) -> CalendarValidation {
        calendar_validation::validate(&self.calendars.lock(), id)
    }

    pub fn heal_calendar(&self, id: CalendarId) -> bool {
        let healed = calendar_validation::heal(&mut self.calendars.lock(), id);
        if healed {
            self.invalidate_calendar(id);
        }
        healed
    }

    pub fn find_base_calendar(&self, name: &str) -> Option<BaseCalendar> {
        calendar_validation::find_base_calendar(&self.calendars.lock(), name).cloned()
    }

    pub fn find_derived_calendar(&self, name: &str) -> Option<DerivedCalendar> {
        calendar_validation::find_derived_calendar(&self.calendars.lock(), name).cloned()
    }

    pub fn deduplicate_calendars(&self) {
        calendar_validation::deduplicate(&mut self.calendars.lock());
    }

    /// Force schedules depending on this calendar to recompute. Calendars
    /// can be shared across projects, so all of them are marked.
    pub fn invalidate_calendar(&self, id: CalendarId) {
        debug!(calendar = id, "calendar changed, marking projects for recalculation");
        self.mark_all_projects_dirty();
    }

    /// Read the shared calendar registry under its lock.
    pub fn with_calendars<R>(&self, f: impl FnOnce(&CalendarRegistry) -> R) -> R {
        f(&self.calendars.lock())
    }

    /// Edit the shared calendar registry under its lock. Rule edits change
    /// resolved working time, so every project is marked for
    /// recalculation afterwards.
    pub fn edit_calendars<R>(&self, f: impl FnOnce(&mut CalendarRegistry) -> R) -> R {
        let out = f(&mut self.calendars.lock());
        self.mark_all_projects_dirty();
        out
    }

    fn mark_all_projects_dirty(&self) {
        let slots: Vec<Arc<RwLock<Project>>> =
            self.projects.read().values().cloned().collect();
        for slot in slots {
            slot.write().mark_dirty();
        }
    }
}

impl Default for SchedulingEngine {
    fn default() -> Self {
        Self::new()
    }
}
