//! Consistency checks and repair for the calendar registry.
//!
//! Validation is ordered: direct self-reference, then reachable cycle,
//! then chain depth, then the suspicious-system name check. A derived
//! calendar whose chain bottoms out at a fixed system calendar is the
//! expected architecture and always passes.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, warn};

use crate::calendar::{
    normalize_name, BaseCalendar, CalendarEntry, CalendarId, CalendarRegistry, DerivedCalendar,
    MAX_BASE_CHAIN_DEPTH,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarIssueCode {
    SelfReference,
    CircularDependency,
    DepthExceeded,
    SuspiciousSystem,
}

impl fmt::Display for CalendarIssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CalendarIssueCode::SelfReference => "SELF_REFERENCE",
            CalendarIssueCode::CircularDependency => "CIRCULAR_DEPENDENCY",
            CalendarIssueCode::DepthExceeded => "DEPTH_EXCEEDED",
            CalendarIssueCode::SuspiciousSystem => "SUSPICIOUS_SYSTEM",
        };
        write!(f, "{code}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalendarValidation {
    Valid,
    Invalid {
        code: CalendarIssueCode,
        message: String,
    },
}

impl CalendarValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, CalendarValidation::Valid)
    }

    pub fn code(&self) -> Option<CalendarIssueCode> {
        match self {
            CalendarValidation::Valid => None,
            CalendarValidation::Invalid { code, .. } => Some(*code),
        }
    }

    fn invalid(code: CalendarIssueCode, message: impl Into<String>) -> Self {
        CalendarValidation::Invalid {
            code,
            message: message.into(),
        }
    }
}

/// Validate the calendar with the given id against the registry it lives
/// in. Unknown ids are treated as valid; there is nothing to check.
pub fn validate(registry: &CalendarRegistry, id: CalendarId) -> CalendarValidation {
    match registry.by_id(id) {
        Some(CalendarEntry::Base(base)) => validate_base(base),
        Some(CalendarEntry::Derived(derived)) => validate_derived(registry, derived),
        None => CalendarValidation::Valid,
    }
}

fn validate_base(base: &BaseCalendar) -> CalendarValidation {
    if let Some(kind) = base.system_kind {
        let fragment = kind.expected_name_fragment();
        if !base.name.to_lowercase().contains(fragment) {
            return CalendarValidation::invalid(
                CalendarIssueCode::SuspiciousSystem,
                format!(
                    "calendar {} claims system kind {} but its name {:?} does not contain {:?}",
                    base.id,
                    kind.code(),
                    base.name,
                    fragment
                ),
            );
        }
    }
    CalendarValidation::Valid
}

fn validate_derived(registry: &CalendarRegistry, calendar: &DerivedCalendar) -> CalendarValidation {
    let Some(base) = calendar.base else {
        return CalendarValidation::Valid;
    };

    if base == calendar.id {
        return CalendarValidation::invalid(
            CalendarIssueCode::SelfReference,
            format!("calendar {} references itself as base", calendar.id),
        );
    }

    // Walk the reference chain until it bottoms out, revisits a node, or
    // runs past the depth bound.
    let mut visited: HashSet<CalendarId> = HashSet::from([calendar.id]);
    let mut cursor = base;
    let mut depth = 1usize;
    loop {
        if !visited.insert(cursor) {
            return CalendarValidation::invalid(
                CalendarIssueCode::CircularDependency,
                format!(
                    "calendar {} reaches calendar {} twice through its base chain",
                    calendar.id, cursor
                ),
            );
        }
        if depth > MAX_BASE_CHAIN_DEPTH {
            return CalendarValidation::invalid(
                CalendarIssueCode::DepthExceeded,
                format!(
                    "calendar {} base chain exceeds depth {}",
                    calendar.id, MAX_BASE_CHAIN_DEPTH
                ),
            );
        }
        match registry.by_id(cursor) {
            // Bottoming out at any base calendar, system or not, is fine.
            Some(CalendarEntry::Base(_)) | None => return CalendarValidation::Valid,
            Some(CalendarEntry::Derived(next)) => match next.base {
                Some(next_base) => {
                    cursor = next_base;
                    depth += 1;
                }
                None => return CalendarValidation::Valid,
            },
        }
    }
}

/// Last-resort repair: if the calendar is structurally invalid, sever its
/// base reference. The calendar reverts to the standard working pattern;
/// that side effect is accepted policy, not an inference of the intended
/// structure. Returns whether anything changed.
pub fn heal(registry: &mut CalendarRegistry, id: CalendarId) -> bool {
    let structural = match validate(registry, id).code() {
        Some(CalendarIssueCode::SelfReference)
        | Some(CalendarIssueCode::CircularDependency)
        | Some(CalendarIssueCode::DepthExceeded) => true,
        // A suspicious system name has no base reference to sever.
        Some(CalendarIssueCode::SuspiciousSystem) | None => false,
    };
    if !structural {
        return false;
    }

    let Some(calendar) = registry.derived_by_id_mut(id) else {
        return false;
    };
    warn!(
        calendar = id,
        "severing unsafe base reference, calendar reverts to standard pattern"
    );
    calendar.set_base(None);
    true
}

/// Find a base calendar by normalized name.
pub fn find_base_calendar<'a>(
    registry: &'a CalendarRegistry,
    name: &str,
) -> Option<&'a BaseCalendar> {
    let wanted = normalize_name(name);
    registry
        .base_calendars()
        .iter()
        .find(|c| normalize_name(&c.name) == wanted)
}

/// Find a derived calendar by normalized name. When several share the
/// name, one with a valid positive id beats a broken placeholder.
pub fn find_derived_calendar<'a>(
    registry: &'a CalendarRegistry,
    name: &str,
) -> Option<&'a DerivedCalendar> {
    let wanted = normalize_name(name);
    let mut fallback = None;
    for calendar in registry.derived_calendars() {
        if normalize_name(&calendar.name) != wanted {
            continue;
        }
        if calendar.has_valid_id() {
            return Some(calendar);
        }
        fallback.get_or_insert(calendar);
    }
    fallback
}

/// Remove duplicate registry entries: calendars with a valid id dedupe by
/// id, placeholders dedupe by normalized name. The filtered registry
/// replaces the old one in a single swap.
pub fn deduplicate(registry: &mut CalendarRegistry) {
    let mut seen_base_ids: HashSet<CalendarId> = HashSet::new();
    let mut seen_base_names: HashSet<String> = HashSet::new();
    let base: Vec<BaseCalendar> = registry
        .base_calendars()
        .iter()
        .filter(|c| {
            if c.id > 0 {
                seen_base_ids.insert(c.id)
            } else {
                seen_base_names.insert(normalize_name(&c.name))
            }
        })
        .cloned()
        .collect();

    let mut seen_ids: HashSet<CalendarId> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    let derived: Vec<DerivedCalendar> = registry
        .derived_calendars()
        .iter()
        .filter(|c| {
            if c.has_valid_id() {
                seen_ids.insert(c.id)
            } else {
                seen_names.insert(normalize_name(&c.name))
            }
        })
        .cloned()
        .collect();

    let dropped = registry.base_calendars().len() - base.len() + registry.derived_calendars().len()
        - derived.len();
    if dropped > 0 {
        debug!(dropped, "removed duplicate calendar entries");
    }
    registry.replace(base, derived);
}
