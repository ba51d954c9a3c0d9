//! Delay metrics derived from resolved flight timestamps
//!
//! All metrics are minutes and degrade to zero when their inputs are
//! missing, so classification always has numbers to work with.

use crate::types::{DelayMetrics, FlightRow, MeasuredFlight, ResolvedTimes, TaxiSource};
use chrono::NaiveDateTime;

/// Signed minutes from `from` to `to`, with sub-minute precision.
pub fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / 60.0
}

/// Derive ramp delay, taxi time and total delay for one flight.
///
/// - ramp delay: ramp-out − scheduled (may be negative)
/// - taxi time: the `ATD-RAM` column when numeric, else actual departure −
///   ramp-out
/// - total delay: actual departure − scheduled
///
/// A flight without a scheduled anchor gets all-zero metrics, including
/// when `ATD-RAM` is present.
pub fn compute(row: &FlightRow, times: &ResolvedTimes) -> DelayMetrics {
    let Some(scheduled) = times.scheduled_ts.value() else {
        return DelayMetrics::default();
    };
    let ramp_out = times.ramp_out_ts.value();
    let actual = times.actual_departure_ts.value();

    let ramp_delay_minutes = ramp_out.map_or(0.0, |ram| minutes_between(scheduled, ram));
    let total_delay_minutes = actual.map_or(0.0, |atd| minutes_between(scheduled, atd));

    let (taxi_time_minutes, taxi_source) = match (row.precomputed_taxi_minutes, ramp_out, actual) {
        (Some(precomputed), _, _) => (precomputed, TaxiSource::Precomputed),
        (None, Some(ram), Some(atd)) => (minutes_between(ram, atd), TaxiSource::Derived),
        _ => (0.0, TaxiSource::Unavailable),
    };

    DelayMetrics {
        ramp_delay_minutes,
        taxi_time_minutes,
        total_delay_minutes,
        taxi_source,
    }
}

/// Bundle a row with its resolved times and derived metrics.
pub fn measure(row: FlightRow, times: ResolvedTimes) -> MeasuredFlight {
    let metrics = compute(&row, &times);
    MeasuredFlight { row, times, metrics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_resolver::{resolve_times, RolloverWindow};
    use crate::types::{columns, RawRow};

    fn measured(raw: &RawRow) -> MeasuredFlight {
        let row = FlightRow::from_raw(raw);
        let times = resolve_times(&row, RolloverWindow::default());
        measure(row, times)
    }

    fn base_row() -> RawRow {
        RawRow::new()
            .with(columns::FLIGHT, "KE017")
            .with(columns::DATE, "250110")
            .with(columns::STD, "10:00")
    }

    #[test]
    fn test_derived_metrics() {
        let m = measured(&base_row().with(columns::RAM, "10:18").with(columns::ATD, "10:45"));
        assert_eq!(m.metrics.ramp_delay_minutes, 18.0);
        assert_eq!(m.metrics.taxi_time_minutes, 27.0);
        assert_eq!(m.metrics.total_delay_minutes, 45.0);
        assert_eq!(m.metrics.taxi_source, TaxiSource::Derived);
    }

    #[test]
    fn test_precomputed_taxi_wins() {
        let m = measured(
            &base_row()
                .with(columns::RAM, "10:18")
                .with(columns::ATD, "10:45")
                .with(columns::TAXI_MINUTES, 31.0),
        );
        assert_eq!(m.metrics.taxi_time_minutes, 31.0);
        assert_eq!(m.metrics.taxi_source, TaxiSource::Precomputed);
    }

    #[test]
    fn test_negative_ramp_delay_preserved() {
        let m = measured(&base_row().with(columns::RAM, "09:55"));
        assert_eq!(m.metrics.ramp_delay_minutes, -5.0);
        assert_eq!(m.metrics.taxi_time_minutes, 0.0);
        assert_eq!(m.metrics.total_delay_minutes, 0.0);
        assert_eq!(m.metrics.taxi_source, TaxiSource::Unavailable);
    }

    #[test]
    fn test_midnight_rollover_metrics() {
        let raw = RawRow::new()
            .with(columns::DATE, "250110")
            .with(columns::STD, "23:50")
            .with(columns::RAM, "00:05")
            .with(columns::ATD, "00:30");
        let m = measured(&raw);
        assert_eq!(m.metrics.ramp_delay_minutes, 15.0);
        assert_eq!(m.metrics.taxi_time_minutes, 25.0);
        assert_eq!(m.metrics.total_delay_minutes, 40.0);
    }

    #[test]
    fn test_missing_anchor_zeroes_everything() {
        let raw = RawRow::new()
            .with(columns::DATE, "??????")
            .with(columns::STD, "10:00")
            .with(columns::TAXI_MINUTES, 40.0);
        let m = measured(&raw);
        assert_eq!(m.metrics, DelayMetrics::default());
        assert!(m.month().is_none());
    }
}
