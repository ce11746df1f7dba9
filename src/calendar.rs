use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

pub type CalendarId = i64;

/// Maximum length of a derived-calendar base chain before validation
/// reports `DEPTH_EXCEEDED`.
pub const MAX_BASE_CHAIN_DEPTH: usize = 10;

/// Safety bound on linear date scans so a calendar with no working days
/// cannot spin forever. Ten years of daily steps.
const SCAN_LIMIT_DAYS: i64 = 3660;

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// The fixed system calendars every project starts from. Derived calendars
/// chaining down to one of these is the expected architecture, never a
/// validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemCalendarKind {
    Default,
    Standard,
    TwentyFourHour,
    NightShift,
}

impl SystemCalendarKind {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SystemCalendarKind::Default),
            1 => Some(SystemCalendarKind::Standard),
            2 => Some(SystemCalendarKind::TwentyFourHour),
            3 => Some(SystemCalendarKind::NightShift),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            SystemCalendarKind::Default => 0,
            SystemCalendarKind::Standard => 1,
            SystemCalendarKind::TwentyFourHour => 2,
            SystemCalendarKind::NightShift => 3,
        }
    }

    /// Substring expected (case-insensitively) in the name of a calendar
    /// claiming this kind; used by the `SUSPICIOUS_SYSTEM` check.
    pub fn expected_name_fragment(self) -> &'static str {
        match self {
            SystemCalendarKind::Default => "default",
            SystemCalendarKind::Standard => "standard",
            SystemCalendarKind::TwentyFourHour => "24",
            SystemCalendarKind::NightShift => "night",
        }
    }

    /// Weekly pattern a system calendar of this kind carries.
    pub fn pattern(self) -> WorkCalendar {
        match self {
            SystemCalendarKind::TwentyFourHour => WorkCalendar::continuous(),
            // Night shift still runs a five-day week at day granularity.
            _ => WorkCalendar::standard(),
        }
    }
}

/// A resolved working-time pattern: weekly rhythm plus dated exceptions.
/// All date arithmetic in the scheduling passes goes through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    non_working_weekdays: HashSet<Weekday>,
    holidays: HashSet<NaiveDate>,
    /// Dated exceptions that open a day the weekly pattern would close.
    extra_working_days: HashSet<NaiveDate>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::standard()
    }
}

impl WorkCalendar {
    /// Monday-to-Friday week with no exceptions.
    pub fn standard() -> Self {
        Self {
            non_working_weekdays: HashSet::from([Weekday::Sat, Weekday::Sun]),
            holidays: HashSet::new(),
            extra_working_days: HashSet::new(),
        }
    }

    /// Every day of the week is working time.
    pub fn continuous() -> Self {
        Self {
            non_working_weekdays: HashSet::new(),
            holidays: HashSet::new(),
            extra_working_days: HashSet::new(),
        }
    }

    pub fn custom<I, J>(working_days: I, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let working: HashSet<Weekday> = working_days.into_iter().collect();
        Self {
            non_working_weekdays: ALL_WEEKDAYS
                .into_iter()
                .filter(|d| !working.contains(d))
                .collect(),
            holidays: holidays.into_iter().collect(),
            extra_working_days: HashSet::new(),
        }
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.extra_working_days.remove(&date);
        self.holidays.insert(date);
    }

    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        for date in dates {
            self.add_holiday(*date);
        }
    }

    /// Recurring month-day exception across a span of years, e.g. Dec 24
    /// for 2025-2030. Invalid combinations (Feb 30) are skipped.
    pub fn add_recurring_holiday(&mut self, month: u32, day: u32, start_year: i32, end_year: i32) {
        for year in start_year..=end_year {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                self.add_holiday(date);
            }
        }
    }

    /// Open a specific date regardless of the weekly pattern.
    pub fn add_working_exception(&mut self, date: NaiveDate) {
        self.holidays.remove(&date);
        self.extra_working_days.insert(date);
    }

    pub fn set_working_days(&mut self, days: &[Weekday]) {
        self.non_working_weekdays = ALL_WEEKDAYS
            .into_iter()
            .filter(|d| !days.contains(d))
            .collect();
    }

    /// Apply a single weekday override (true opens the day, false closes it).
    pub fn override_weekday(&mut self, weekday: Weekday, working: bool) {
        if working {
            self.non_working_weekdays.remove(&weekday);
        } else {
            self.non_working_weekdays.insert(weekday);
        }
    }

    /// Apply a single dated override.
    pub fn override_day(&mut self, date: NaiveDate, working: bool) {
        if working {
            self.add_working_exception(date);
        } else {
            self.add_holiday(date);
        }
    }

    pub fn is_available(&self, date: NaiveDate) -> bool {
        if self.extra_working_days.contains(&date) {
            return true;
        }
        !self.holidays.contains(&date) && !self.non_working_weekdays.contains(&date.weekday())
    }

    /// First available day strictly after `from`.
    pub fn next_available(&self, from: NaiveDate) -> NaiveDate {
        self.scan(from + Duration::days(1), 1)
    }

    /// First available day strictly before `from`.
    pub fn prev_available(&self, from: NaiveDate) -> NaiveDate {
        self.scan(from - Duration::days(1), -1)
    }

    /// First available day on or after `from`.
    pub fn roll_forward(&self, from: NaiveDate) -> NaiveDate {
        self.scan(from, 1)
    }

    /// First available day on or before `from`.
    pub fn roll_backward(&self, from: NaiveDate) -> NaiveDate {
        self.scan(from, -1)
    }

    /// Inclusive finish date of a task starting on (or rolled forward to)
    /// `start` with a duration of `days` working days. `days <= 1` finishes
    /// on the start day itself.
    pub fn add_work_days(&self, start: NaiveDate, days: i64) -> NaiveDate {
        let mut current = self.roll_forward(start);
        let mut remaining = days.max(1) - 1;
        while remaining > 0 {
            current = self.next_available(current);
            remaining -= 1;
        }
        current
    }

    /// Inclusive start date of a task finishing on (or rolled backward to)
    /// `finish` with a duration of `days` working days.
    pub fn sub_work_days(&self, finish: NaiveDate, days: i64) -> NaiveDate {
        let mut current = self.roll_backward(finish);
        let mut remaining = days.max(1) - 1;
        while remaining > 0 {
            current = self.prev_available(current);
            remaining -= 1;
        }
        current
    }

    /// Signed count of available days after `from` up to and including
    /// `to`. Zero when the dates coincide, negative when `to` precedes
    /// `from`. This is the slack measure.
    pub fn work_days_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        if to >= from {
            self.count_available_days(from + Duration::days(1), to)
        } else {
            -self.count_available_days(to + Duration::days(1), from)
        }
    }

    /// Count of available days in `[start, end]`, inclusive on both ends.
    pub fn count_available_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let mut count = 0;
        let mut current = start;
        while current <= end {
            if self.is_available(current) {
                count += 1;
            }
            current = current + Duration::days(1);
        }
        count
    }

    pub fn available_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut current = start;
        while current <= end {
            if self.is_available(current) {
                days.push(current);
            }
            current = current + Duration::days(1);
        }
        days
    }

    fn scan(&self, from: NaiveDate, step: i64) -> NaiveDate {
        let mut current = from;
        let mut steps = 0;
        while !self.is_available(current) {
            current = current + Duration::days(step);
            steps += 1;
            if steps > SCAN_LIMIT_DAYS {
                warn!(date = %from, "calendar has no reachable working day, using raw date");
                return from;
            }
        }
        current
    }
}

/// A weekday-level override carried by a derived calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayOverride {
    pub weekday: Weekday,
    pub working: bool,
}

/// A dated override carried by a derived calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOverride {
    pub date: NaiveDate,
    pub working: bool,
}

/// A self-contained calendar: full weekly pattern plus exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseCalendar {
    pub id: CalendarId,
    pub name: String,
    /// Set when this record represents one of the fixed system calendars.
    pub system_kind: Option<SystemCalendarKind>,
    pub pattern: WorkCalendar,
}

impl BaseCalendar {
    pub fn new(id: CalendarId, name: impl Into<String>, pattern: WorkCalendar) -> Self {
        Self {
            id,
            name: name.into(),
            system_kind: None,
            pattern,
        }
    }

    pub fn system(id: CalendarId, name: impl Into<String>, kind: SystemCalendarKind) -> Self {
        Self {
            id,
            name: name.into(),
            system_kind: Some(kind),
            pattern: kind.pattern(),
        }
    }
}

/// Overrides layered on top of a reference to another calendar. The
/// reference is an id into the registry; `None` means the calendar is
/// unconfigured and falls back to the standard pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedCalendar {
    /// Ids are positive; zero or negative marks a broken placeholder
    /// record that lookups deprioritize.
    pub id: CalendarId,
    pub name: String,
    pub base: Option<CalendarId>,
    pub weekday_overrides: Vec<WeekdayOverride>,
    pub day_overrides: Vec<DayOverride>,
}

impl DerivedCalendar {
    pub fn new(id: CalendarId, name: impl Into<String>, base: Option<CalendarId>) -> Self {
        Self {
            id,
            name: name.into(),
            base,
            weekday_overrides: Vec::new(),
            day_overrides: Vec::new(),
        }
    }

    pub fn has_valid_id(&self) -> bool {
        self.id > 0
    }

    /// Clear or retarget the base reference. Consistency healing calls this
    /// with `None`; the calendar then reverts to the standard pattern until
    /// reconfigured.
    pub fn set_base(&mut self, base: Option<CalendarId>) {
        self.base = base;
    }

    fn apply_overrides(&self, pattern: &mut WorkCalendar) {
        for o in &self.weekday_overrides {
            pattern.override_weekday(o.weekday, o.working);
        }
        for o in &self.day_overrides {
            pattern.override_day(o.date, o.working);
        }
    }
}

/// Reference into either registry half, as returned by id lookups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalendarEntry<'a> {
    Base(&'a BaseCalendar),
    Derived(&'a DerivedCalendar),
}

/// Flat ownership of all calendars, base and derived, indexed by id and by
/// normalized name. Tasks hold `CalendarId` associations, never copies.
#[derive(Debug, Default, Clone)]
pub struct CalendarRegistry {
    base: Vec<BaseCalendar>,
    derived: Vec<DerivedCalendar>,
}

impl CalendarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_base(&mut self, calendar: BaseCalendar) {
        self.base.push(calendar);
    }

    pub fn add_derived(&mut self, calendar: DerivedCalendar) {
        self.derived.push(calendar);
    }

    pub fn base_calendars(&self) -> &[BaseCalendar] {
        &self.base
    }

    pub fn derived_calendars(&self) -> &[DerivedCalendar] {
        &self.derived
    }

    pub fn base_by_id(&self, id: CalendarId) -> Option<&BaseCalendar> {
        self.base.iter().find(|c| c.id == id)
    }

    pub fn base_by_id_mut(&mut self, id: CalendarId) -> Option<&mut BaseCalendar> {
        self.base.iter_mut().find(|c| c.id == id)
    }

    pub fn derived_by_id(&self, id: CalendarId) -> Option<&DerivedCalendar> {
        self.derived.iter().find(|c| c.id == id)
    }

    pub fn derived_by_id_mut(&mut self, id: CalendarId) -> Option<&mut DerivedCalendar> {
        self.derived.iter_mut().find(|c| c.id == id)
    }

    pub fn by_id(&self, id: CalendarId) -> Option<CalendarEntry<'_>> {
        if let Some(base) = self.base_by_id(id) {
            return Some(CalendarEntry::Base(base));
        }
        self.derived_by_id(id).map(CalendarEntry::Derived)
    }

    /// Resolve the working-time pattern a task scheduled against calendar
    /// `id` actually sees: the base chain bottom's pattern with each
    /// derived layer's overrides applied, nearest layer winning. Broken or
    /// missing references fall back to the standard pattern.
    pub fn effective_pattern(&self, id: CalendarId) -> WorkCalendar {
        let mut layers: Vec<&DerivedCalendar> = Vec::new();
        let mut visited: HashSet<CalendarId> = HashSet::new();
        let mut cursor = Some(id);

        let mut bottom: Option<WorkCalendar> = None;
        while let Some(current) = cursor {
            if !visited.insert(current) || layers.len() > MAX_BASE_CHAIN_DEPTH {
                warn!(
                    calendar = current,
                    "broken calendar chain, falling back to standard pattern"
                );
                break;
            }
            match self.by_id(current) {
                Some(CalendarEntry::Base(base)) => {
                    bottom = Some(base.pattern.clone());
                    break;
                }
                Some(CalendarEntry::Derived(derived)) => {
                    layers.push(derived);
                    cursor = derived.base;
                }
                None => break,
            }
        }

        let mut pattern = bottom.unwrap_or_else(WorkCalendar::standard);
        for layer in layers.iter().rev() {
            layer.apply_overrides(&mut pattern);
        }
        pattern
    }

    /// Replace both halves in one step, as `deduplicate` requires.
    pub fn replace(&mut self, base: Vec<BaseCalendar>, derived: Vec<DerivedCalendar>) {
        self.base = base;
        self.derived = derived;
    }
}

/// Trim, collapse internal whitespace, lowercase. All name lookups compare
/// through this.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn standard_calendar_closes_weekends() {
        let cal = WorkCalendar::standard();
        assert!(!cal.is_available(d(2025, 1, 4))); // Saturday
        assert!(!cal.is_available(d(2025, 1, 5))); // Sunday
        assert!(cal.is_available(d(2025, 1, 6))); // Monday
    }

    #[test]
    fn add_work_days_is_inclusive() {
        let cal = WorkCalendar::standard();
        // One working day starting Monday finishes that Monday.
        assert_eq!(cal.add_work_days(d(2025, 1, 6), 1), d(2025, 1, 6));
        // Five working days starting Monday finish Friday.
        assert_eq!(cal.add_work_days(d(2025, 1, 6), 5), d(2025, 1, 10));
        // Six spill over the weekend.
        assert_eq!(cal.add_work_days(d(2025, 1, 6), 6), d(2025, 1, 13));
    }

    #[test]
    fn sub_work_days_mirrors_add() {
        let cal = WorkCalendar::standard();
        assert_eq!(cal.sub_work_days(d(2025, 1, 10), 5), d(2025, 1, 6));
        assert_eq!(cal.sub_work_days(d(2025, 1, 13), 6), d(2025, 1, 6));
    }

    #[test]
    fn work_days_between_is_signed() {
        let cal = WorkCalendar::standard();
        assert_eq!(cal.work_days_between(d(2025, 1, 6), d(2025, 1, 6)), 0);
        // Mon -> Fri same week: four working days forward.
        assert_eq!(cal.work_days_between(d(2025, 1, 6), d(2025, 1, 10)), 4);
        assert_eq!(cal.work_days_between(d(2025, 1, 10), d(2025, 1, 6)), -4);
        // Weekend in between does not count.
        assert_eq!(cal.work_days_between(d(2025, 1, 10), d(2025, 1, 13)), 1);
    }

    #[test]
    fn dated_exception_opens_a_weekend_day() {
        let mut cal = WorkCalendar::standard();
        cal.add_working_exception(d(2025, 1, 4));
        assert!(cal.is_available(d(2025, 1, 4)));
    }

    #[test]
    fn effective_pattern_layers_derived_overrides() {
        let mut reg = CalendarRegistry::new();
        reg.add_base(BaseCalendar::system(1, "Standard", SystemCalendarKind::Standard));
        let mut derived = DerivedCalendar::new(2, "Six Day Crew", Some(1));
        derived.weekday_overrides.push(WeekdayOverride {
            weekday: Weekday::Sat,
            working: true,
        });
        reg.add_derived(derived);

        let pattern = reg.effective_pattern(2);
        assert!(pattern.is_available(d(2025, 1, 4))); // Saturday now open
        assert!(!pattern.is_available(d(2025, 1, 5))); // Sunday still closed
    }

    #[test]
    fn effective_pattern_survives_broken_chain() {
        let mut reg = CalendarRegistry::new();
        let mut x = DerivedCalendar::new(1, "X", Some(2));
        let y = DerivedCalendar::new(2, "Y", Some(1));
        x.weekday_overrides.push(WeekdayOverride {
            weekday: Weekday::Sun,
            working: true,
        });
        reg.add_derived(x);
        reg.add_derived(y);

        // Cycle: falls back to standard, outermost overrides still apply.
        let pattern = reg.effective_pattern(1);
        assert!(pattern.is_available(d(2025, 1, 5)));
        assert!(!pattern.is_available(d(2025, 1, 4)));
    }

    #[test]
    fn normalize_name_collapses_whitespace_and_case() {
        assert_eq!(normalize_name("  Night   Shift "), "night shift");
    }
}
