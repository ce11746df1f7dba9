//! Error surface for scheduling operations. Structural problems carry the
//! offending id; phase failures carry which recalculation phase gave up.

use thiserror::Error;

use crate::calculations::RecalcPhase;
use crate::project::ProjectId;
use crate::task::TaskId;

pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("unknown project {0}")]
    UnknownProject(ProjectId),

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("dependency cycle through task {0}")]
    DependencyCycle(TaskId),

    #[error("{phase} failed: {message}")]
    PhaseFailed { phase: String, message: String },
}

impl ScheduleError {
    /// Tag an error with the recalculation phase it surfaced in. Already
    /// tagged errors pass through so the innermost phase wins.
    pub fn in_phase(self, phase: RecalcPhase) -> Self {
        match self {
            ScheduleError::PhaseFailed { .. } => self,
            other => ScheduleError::PhaseFailed {
                phase: phase.to_string(),
                message: other.to_string(),
            },
        }
    }
}
