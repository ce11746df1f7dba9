//! Calendar-aware critical-path scheduling core.
//!
//! Computes feasible start/finish dates for a network of interdependent
//! tasks under working-time calendars, identifies the critical path, and
//! keeps the computation consistent while tasks, dependencies, and
//! calendars change concurrently. Adapters (HTTP, persistence, UI) sit
//! outside this crate and talk to [`SchedulingEngine`].

pub mod calculations;
pub mod calendar;
pub mod calendar_validation;
pub mod dependency_sync;
pub mod engine;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod project;
pub mod recalc;
pub mod result;
pub mod task;
pub mod wbs;

pub use calculations::{DateWindow, RecalcPhase};
pub use calendar::{
    BaseCalendar, CalendarId, CalendarRegistry, DayOverride, DerivedCalendar, SystemCalendarKind,
    WeekdayOverride, WorkCalendar, MAX_BASE_CHAIN_DEPTH,
};
pub use calendar_validation::{CalendarIssueCode, CalendarValidation};
pub use dependency_sync::{DependencySynchronizer, SyncPlan};
pub use engine::{EngineConfig, SchedulingEngine, SyncCounters};
pub use error::{ScheduleError, ScheduleResult};
pub use graph::schedule_dag::{DagNode, ScheduleDag};
pub use graph::TaskGraph;
pub use metadata::ProjectMetadata;
pub use project::{Project, ProjectId, ProjectScheduleState};
pub use recalc::{recalculate_full, recalculate_incremental, RecalcOptions};
pub use result::{RecalculationResult, TaskScheduleInfo};
pub use task::{ConstraintKind, Task, TaskConstraint, TaskId};
pub use wbs::{OutlineNode, WbsCache};
