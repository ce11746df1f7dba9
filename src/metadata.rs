use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_name: String,
    pub project_description: String,
    pub project_start_date: NaiveDate,
    /// Auxiliary finish field consumed by the persistence/import adapters.
    /// A successful full recalculation without an imposed deadline writes
    /// the computed project finish back here so a later deadline
    /// resolution from stored fields reproduces the same schedule.
    pub project_end_date: NaiveDate,
    /// User-set finish date. When present it is authoritative for the
    /// backward pass and may legitimately produce negative slack.
    pub imposed_finish_date: Option<NaiveDate>,
    /// Project-wide calendar used by tasks without their own association.
    pub calendar: Option<CalendarId>,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            project_name: "New Project".to_string(),
            project_description: "No description".to_string(),
            project_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            project_end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            imposed_finish_date: None,
            calendar: None,
        }
    }
}

impl ProjectMetadata {
    pub fn starting(start: NaiveDate) -> Self {
        Self {
            project_start_date: start,
            project_end_date: start,
            ..Self::default()
        }
    }
}
