//! Time Resolver - clock-face tokens to absolute timestamps
//!
//! Ramp exports carry a schedule date (`YYMMDD`) plus bare `HH:MM` clock
//! times for the scheduled, ramp-out and actual departure events. Only the
//! scheduled departure has a date; every other event is placed on the
//! scheduled departure's calendar day and then corrected across midnight.
//!
//! ## Rollover rules
//!
//! - anchor before 04:00, event after 20:00 → event was the previous day
//! - anchor after 20:00, event before 04:00 → event is the next day
//! - an event that follows a resolved base event (actual departure after
//!   ramp-out) and lands strictly before it moves one day forward
//!
//! Failures never abort a batch: callers turn a `TimeParseError` into
//! `Resolved::Unparseable` for the affected field.

use crate::types::{FlightRow, Resolved, ResolvedTimes};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Schedule dates are two-digit years in the 2000s.
const CENTURY_BASE: i32 = 2000;

/// Default anchor/event hour bounds for midnight rollover.
pub const DEFAULT_EARLY_HOUR_LIMIT: u32 = 4;
pub const DEFAULT_LATE_HOUR_LIMIT: u32 = 20;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("Date token '{0}' is not 6 characters (YYMMDD)")]
    DateLength(String),

    #[error("Date token '{0}' contains non-digit characters")]
    DateDigits(String),

    #[error("Date token '{0}' is not a valid calendar date")]
    InvalidDate(String),

    #[error("Clock time '{0}' is not HH:MM")]
    ClockTime(String),
}

// ============================================================================
// Rollover Window
// ============================================================================

/// Hour bounds that decide when a clock time belongs to the neighbouring day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverWindow {
    /// Anchor/event hours strictly below this count as "just after midnight"
    #[serde(default = "default_early_hour_limit")]
    pub early_hour_limit: u32,
    /// Anchor/event hours strictly above this count as "late evening"
    #[serde(default = "default_late_hour_limit")]
    pub late_hour_limit: u32,
}

fn default_early_hour_limit() -> u32 {
    DEFAULT_EARLY_HOUR_LIMIT
}
fn default_late_hour_limit() -> u32 {
    DEFAULT_LATE_HOUR_LIMIT
}

impl Default for RolloverWindow {
    fn default() -> Self {
        Self {
            early_hour_limit: DEFAULT_EARLY_HOUR_LIMIT,
            late_hour_limit: DEFAULT_LATE_HOUR_LIMIT,
        }
    }
}

// ============================================================================
// Token Parsing
// ============================================================================

/// Parse a 6-character `YYMMDD` token into a calendar date in the 2000s.
pub fn parse_schedule_date(token: &str) -> Result<NaiveDate, TimeParseError> {
    let t = token.trim();
    if t.chars().count() != 6 {
        return Err(TimeParseError::DateLength(t.to_string()));
    }
    if !t.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeParseError::DateDigits(t.to_string()));
    }

    // All ASCII digits, so byte slicing is safe and each part parses.
    let part = |range: std::ops::Range<usize>| t[range].parse::<u32>().unwrap_or_default();
    let (yy, mm, dd) = (part(0..2), part(2..4), part(4..6));

    NaiveDate::from_ymd_opt(CENTURY_BASE + yy as i32, mm, dd)
        .ok_or_else(|| TimeParseError::InvalidDate(t.to_string()))
}

/// Parse an `HH:MM` (or `H:MM`) clock time.
pub fn parse_clock_time(token: &str) -> Result<NaiveTime, TimeParseError> {
    let t = token.trim();
    let bad = || TimeParseError::ClockTime(t.to_string());

    let (hh, mm) = t.split_once(':').ok_or_else(bad)?;
    let digits = |s: &str| (1..=2).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(hh) || !digits(mm) {
        return Err(bad());
    }

    let hour = hh.parse::<u32>().map_err(|_| bad())?;
    let minute = mm.parse::<u32>().map_err(|_| bad())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(bad)
}

// ============================================================================
// Resolution
// ============================================================================

/// Combine the schedule date and scheduled clock time into the anchor
/// timestamp of a flight.
pub fn resolve_schedule(date_str: &str, time_str: &str) -> Result<NaiveDateTime, TimeParseError> {
    let date = parse_schedule_date(date_str)?;
    let time = parse_clock_time(time_str)?;
    Ok(date.and_time(time))
}

/// Shift `candidate` across midnight relative to `anchor`, per the window.
pub fn apply_rollover(
    anchor: NaiveDateTime,
    candidate: NaiveDateTime,
    window: RolloverWindow,
) -> NaiveDateTime {
    let (anchor_hour, candidate_hour) = (anchor.hour(), candidate.hour());

    if anchor_hour < window.early_hour_limit && candidate_hour > window.late_hour_limit {
        candidate - Duration::days(1)
    } else if anchor_hour > window.late_hour_limit && candidate_hour < window.early_hour_limit {
        candidate + Duration::days(1)
    } else {
        candidate
    }
}

/// Place a bare clock time on the anchor's calendar day, corrected for
/// midnight rollover.
pub fn resolve_relative(
    anchor: NaiveDateTime,
    clock_time: &str,
    window: RolloverWindow,
) -> Result<NaiveDateTime, TimeParseError> {
    let time = parse_clock_time(clock_time)?;
    let candidate = anchor.date().and_time(time);
    Ok(apply_rollover(anchor, candidate, window))
}

/// Place a bare clock time on `base`'s calendar day; an event that cannot
/// precede `base` moves forward one day when it lands strictly earlier.
pub fn resolve_following(
    base: NaiveDateTime,
    clock_time: &str,
) -> Result<NaiveDateTime, TimeParseError> {
    let time = parse_clock_time(clock_time)?;
    Ok(not_before(base, base.date().and_time(time)))
}

fn not_before(base: NaiveDateTime, candidate: NaiveDateTime) -> NaiveDateTime {
    if candidate < base {
        candidate + Duration::days(1)
    } else {
        candidate
    }
}

/// Resolve all three timestamps of a flight.
///
/// The scheduled departure anchors everything. Ramp-out is resolved against
/// the anchor; actual departure is resolved against the anchor and then
/// kept from preceding a resolved ramp-out. Without an anchor nothing
/// resolves.
pub fn resolve_times(row: &FlightRow, window: RolloverWindow) -> ResolvedTimes {
    let anchor = match (row.schedule_date_raw.as_deref(), row.scheduled_time_raw.as_deref()) {
        (Some(date), Some(time)) => resolve_schedule(date, time)
            .map_err(|e| debug!(flight = %row.flight_id, error = %e, "Unparseable schedule"))
            .ok(),
        _ => {
            debug!(flight = %row.flight_id, "Missing Date or STD");
            None
        }
    };

    let Some(anchor) = anchor else {
        return ResolvedTimes {
            scheduled_ts: Resolved::Unparseable,
            ramp_out_ts: Resolved::Unparseable,
            actual_departure_ts: Resolved::Unparseable,
        };
    };

    let relative = |raw: Option<&str>, field: &'static str| -> Resolved<NaiveDateTime> {
        match raw {
            Some(clock) => Resolved::from_result(resolve_relative(anchor, clock, window).map_err(
                |e| debug!(flight = %row.flight_id, field, error = %e, "Unparseable clock time"),
            )),
            None => Resolved::Unparseable,
        }
    };

    let ramp_out_ts = relative(row.ramp_out_time_raw.as_deref(), "RAM");
    let mut actual_departure_ts = relative(row.actual_departure_time_raw.as_deref(), "ATD");

    if let (Some(ram), Resolved::Value(atd)) = (ramp_out_ts.value(), actual_departure_ts) {
        actual_departure_ts = Resolved::Value(not_before(ram, atd));
    }

    ResolvedTimes {
        scheduled_ts: Resolved::Value(anchor),
        ramp_out_ts,
        actual_departure_ts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{columns, RawRow};

    fn at(date: (i32, u32, u32), hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_resolve_schedule() {
        let ts = resolve_schedule("250131", "23:50").unwrap();
        assert_eq!(ts, at((2025, 1, 31), 23, 50));

        let ts = resolve_schedule(" 240229 ", "7:05").unwrap();
        assert_eq!(ts, at((2024, 2, 29), 7, 5));
    }

    #[test]
    fn test_resolve_schedule_failures() {
        assert!(matches!(
            resolve_schedule("25013", "10:00"),
            Err(TimeParseError::DateLength(_))
        ));
        assert!(matches!(
            resolve_schedule("25A131", "10:00"),
            Err(TimeParseError::DateDigits(_))
        ));
        assert!(matches!(
            resolve_schedule("250230", "10:00"),
            Err(TimeParseError::InvalidDate(_))
        ));
        assert!(matches!(
            resolve_schedule("250131", "24:00"),
            Err(TimeParseError::ClockTime(_))
        ));
        assert!(resolve_schedule("250131", "1030").is_err());
        assert!(resolve_schedule("250131", "10:30:00").is_err());
    }

    #[test]
    fn test_rollover_forward_across_midnight() {
        let anchor = at((2025, 1, 31), 23, 50);
        let ts = resolve_relative(anchor, "00:10", RolloverWindow::default()).unwrap();
        assert_eq!(ts, at((2025, 2, 1), 0, 10));
        assert_eq!((ts - anchor).num_minutes(), 20);
    }

    #[test]
    fn test_rollover_backward_across_midnight() {
        let anchor = at((2025, 3, 1), 2, 0);
        let ts = resolve_relative(anchor, "23:40", RolloverWindow::default()).unwrap();
        assert_eq!(ts, at((2025, 2, 28), 23, 40));
    }

    #[test]
    fn test_no_rollover_midday() {
        let anchor = at((2025, 6, 15), 12, 0);
        let ts = resolve_relative(anchor, "12:05", RolloverWindow::default()).unwrap();
        assert_eq!(ts, at((2025, 6, 15), 12, 5));
    }

    #[test]
    fn test_rollover_bounds_are_strict() {
        // Anchor at exactly 20:xx is not "late"; event at exactly 04:xx is not "early".
        let anchor = at((2025, 6, 15), 20, 30);
        let ts = resolve_relative(anchor, "01:00", RolloverWindow::default()).unwrap();
        assert_eq!(ts, at((2025, 6, 15), 1, 0));

        let anchor = at((2025, 6, 15), 22, 0);
        let ts = resolve_relative(anchor, "04:00", RolloverWindow::default()).unwrap();
        assert_eq!(ts, at((2025, 6, 15), 4, 0));
    }

    #[test]
    fn test_resolve_following() {
        let base = at((2025, 6, 15), 23, 55);
        assert_eq!(resolve_following(base, "00:15").unwrap(), at((2025, 6, 16), 0, 15));
        assert_eq!(resolve_following(base, "23:55").unwrap(), base);
        assert!(resolve_following(base, "xx").is_err());
    }

    #[test]
    fn test_resolve_times_late_evening_departure() {
        // Ramp-out 4.5 h late, take-off after midnight: the anchor rule alone
        // cannot see the rollover, the ramp-out guard does.
        let raw = RawRow::new()
            .with(columns::DATE, "250615")
            .with(columns::STD, "19:30")
            .with(columns::RAM, "23:55")
            .with(columns::ATD, "00:20");
        let row = FlightRow::from_raw(&raw);
        let times = resolve_times(&row, RolloverWindow::default());

        assert_eq!(times.ramp_out_ts.value(), Some(at((2025, 6, 15), 23, 55)));
        assert_eq!(times.actual_departure_ts.value(), Some(at((2025, 6, 16), 0, 20)));
    }

    #[test]
    fn test_resolve_times_without_anchor() {
        let raw = RawRow::new()
            .with(columns::DATE, "garbage")
            .with(columns::STD, "10:00")
            .with(columns::RAM, "10:10");
        let times = resolve_times(&FlightRow::from_raw(&raw), RolloverWindow::default());

        assert!(times.scheduled_ts.is_unparseable());
        assert!(times.ramp_out_ts.is_unparseable());
        assert!(times.actual_departure_ts.is_unparseable());
    }

    #[test]
    fn test_resolve_times_bad_ram_keeps_anchor() {
        let raw = RawRow::new()
            .with(columns::DATE, "250615")
            .with(columns::STD, "10:00")
            .with(columns::RAM, "--:--")
            .with(columns::ATD, "10:30");
        let times = resolve_times(&FlightRow::from_raw(&raw), RolloverWindow::default());

        assert_eq!(times.scheduled_ts.value(), Some(at((2025, 6, 15), 10, 0)));
        assert!(times.ramp_out_ts.is_unparseable());
        assert_eq!(times.actual_departure_ts.value(), Some(at((2025, 6, 15), 10, 30)));
    }
}
