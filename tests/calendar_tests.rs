use chrono::{Datelike, NaiveDate, Weekday};
use cpm_engine::{
    BaseCalendar, CalendarRegistry, DayOverride, DerivedCalendar, SystemCalendarKind,
    WeekdayOverride, WorkCalendar,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn default_calendar_weekends_unavailable() {
    let cal = WorkCalendar::default();
    assert!(!cal.is_available(d(2025, 1, 4))); // Saturday
    assert!(!cal.is_available(d(2025, 1, 5))); // Sunday
    assert!(cal.is_available(d(2025, 1, 2))); // Thursday
}

#[test]
fn next_available_skips_weekend() {
    let cal = WorkCalendar::default();
    let next = cal.next_available(d(2025, 1, 3)); // Friday
    assert_eq!(next.weekday(), Weekday::Mon);
    assert_eq!(next, d(2025, 1, 6));
}

#[test]
fn holidays_block_scheduling() {
    let mut cal = WorkCalendar::standard();
    cal.add_holiday(d(2025, 1, 6)); // Monday
    assert!(!cal.is_available(d(2025, 1, 6)));
    assert_eq!(cal.next_available(d(2025, 1, 3)), d(2025, 1, 7));
}

#[test]
fn recurring_holiday_spans_years() {
    let mut cal = WorkCalendar::standard();
    cal.add_recurring_holiday(12, 24, 2025, 2027);
    assert!(!cal.is_available(d(2025, 12, 24)));
    assert!(!cal.is_available(d(2026, 12, 24)));
    assert!(!cal.is_available(d(2027, 12, 24)));
    assert!(cal.is_available(d(2028, 12, 24)));
}

#[test]
fn custom_work_week() {
    let cal = WorkCalendar::custom(
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ],
        [],
    );
    assert!(cal.is_available(d(2025, 1, 4))); // Saturday open
    assert!(!cal.is_available(d(2025, 1, 5))); // Sunday closed
}

#[test]
fn set_working_days_replaces_the_weekly_pattern() {
    let mut cal = WorkCalendar::standard();
    cal.set_working_days(&[Weekday::Sat, Weekday::Sun]);
    assert!(cal.is_available(d(2025, 1, 4)));
    assert!(!cal.is_available(d(2025, 1, 6)));
}

#[test]
fn twenty_four_hour_system_calendar_never_closes() {
    let pattern = SystemCalendarKind::TwentyFourHour.pattern();
    assert!(pattern.is_available(d(2025, 1, 4)));
    assert!(pattern.is_available(d(2025, 1, 5)));
}

#[test]
fn derived_calendar_inherits_base_holidays() {
    let mut reg = CalendarRegistry::new();
    let mut base = BaseCalendar::system(1, "Standard", SystemCalendarKind::Standard);
    base.pattern.add_holiday(d(2025, 7, 4));
    reg.add_base(base);
    reg.add_derived(DerivedCalendar::new(2, "Crew", Some(1)));

    let pattern = reg.effective_pattern(2);
    assert!(!pattern.is_available(d(2025, 7, 4)));
}

#[test]
fn derived_day_override_beats_base() {
    let mut reg = CalendarRegistry::new();
    let mut base = BaseCalendar::system(1, "Standard", SystemCalendarKind::Standard);
    base.pattern.add_holiday(d(2025, 7, 4)); // Friday
    reg.add_base(base);
    let mut derived = DerivedCalendar::new(2, "Crunch Crew", Some(1));
    derived.day_overrides.push(DayOverride {
        date: d(2025, 7, 4),
        working: true,
    });
    reg.add_derived(derived);

    assert!(reg.effective_pattern(2).is_available(d(2025, 7, 4)));
}

#[test]
fn nested_derived_chain_applies_nearest_override_last() {
    let mut reg = CalendarRegistry::new();
    reg.add_base(BaseCalendar::system(1, "Standard", SystemCalendarKind::Standard));
    let mut mid = DerivedCalendar::new(2, "Six Day", Some(1));
    mid.weekday_overrides.push(WeekdayOverride {
        weekday: Weekday::Sat,
        working: true,
    });
    reg.add_derived(mid);
    let mut top = DerivedCalendar::new(3, "Six Day No Sat", Some(2));
    top.weekday_overrides.push(WeekdayOverride {
        weekday: Weekday::Sat,
        working: false,
    });
    reg.add_derived(top);

    assert!(reg.effective_pattern(2).is_available(d(2025, 1, 4)));
    assert!(!reg.effective_pattern(3).is_available(d(2025, 1, 4)));
}

#[test]
fn count_available_days_inclusive_week() {
    let cal = WorkCalendar::standard();
    assert_eq!(cal.count_available_days(d(2025, 1, 6), d(2025, 1, 12)), 5);
    let days = cal.available_days_in_range(d(2025, 1, 6), d(2025, 1, 12));
    assert_eq!(days.first().copied(), Some(d(2025, 1, 6)));
    assert_eq!(days.last().copied(), Some(d(2025, 1, 10)));
}
