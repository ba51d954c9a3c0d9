//! Reporting queries over classified records
//!
//! Read-only views used by dashboards: pick a day or hour of operations,
//! count causes, and build an hourly profile. Every query borrows the
//! records and keeps input order.

use crate::config::defaults::HOURS_PER_DAY;
use crate::types::{DelayCause, FlightRecord, FlightStatus, TaxiSource};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Time basis
// ============================================================================

/// Which resolved timestamp places a record on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBasis {
    #[default]
    Scheduled,
    RampOut,
    ActualDeparture,
}

impl TimeBasis {
    pub const ALL: [TimeBasis; 3] = [
        TimeBasis::Scheduled,
        TimeBasis::RampOut,
        TimeBasis::ActualDeparture,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TimeBasis::Scheduled => "scheduled",
            TimeBasis::RampOut => "ramp-out",
            TimeBasis::ActualDeparture => "actual-departure",
        }
    }

    /// The record's timestamp on this basis, if it resolved.
    pub fn timestamp(self, record: &FlightRecord) -> Option<NaiveDateTime> {
        match self {
            TimeBasis::Scheduled => record.times.scheduled_ts.value(),
            TimeBasis::RampOut => record.times.ramp_out_ts.value(),
            TimeBasis::ActualDeparture => record.times.actual_departure_ts.value(),
        }
    }
}

impl fmt::Display for TimeBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimeBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|b| b.name() == normalized)
            .ok_or_else(|| format!("unknown time basis '{s}' (expected scheduled, ramp-out or actual-departure)"))
    }
}

// ============================================================================
// Selections
// ============================================================================

/// Records whose basis timestamp falls on `date`.
pub fn select_day(records: &[FlightRecord], date: NaiveDate, basis: TimeBasis) -> Vec<&FlightRecord> {
    records
        .iter()
        .filter(|r| basis.timestamp(r).is_some_and(|ts| ts.date() == date))
        .collect()
}

/// Records whose basis timestamp falls within `hour` of `date`.
pub fn select_hour(
    records: &[FlightRecord],
    date: NaiveDate,
    hour: u32,
    basis: TimeBasis,
) -> Vec<&FlightRecord> {
    records
        .iter()
        .filter(|r| {
            basis
                .timestamp(r)
                .is_some_and(|ts| ts.date() == date && ts.hour() == hour)
        })
        .collect()
}

/// Earliest and latest scheduled dates in the batch.
pub fn date_range(records: &[FlightRecord]) -> Option<(NaiveDate, NaiveDate)> {
    records
        .iter()
        .filter_map(|r| r.scheduled_ts().map(|ts| ts.date()))
        .fold(None, |range, d| match range {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
}

// ============================================================================
// Cause breakdown
// ============================================================================

/// Record counts per delay cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseBreakdown {
    pub normal: usize,
    pub ramp_gate: usize,
    pub taxi_ground: usize,
}

impl CauseBreakdown {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a FlightRecord>,
    {
        let mut breakdown = Self::default();
        for record in records {
            breakdown.add(record.delay_cause);
        }
        breakdown
    }

    pub fn add(&mut self, cause: DelayCause) {
        *self.slot(cause) += 1;
    }

    pub fn count(&self, cause: DelayCause) -> usize {
        match cause {
            DelayCause::Normal => self.normal,
            DelayCause::RampGate => self.ramp_gate,
            DelayCause::TaxiGround => self.taxi_ground,
        }
    }

    pub fn total(&self) -> usize {
        self.normal + self.ramp_gate + self.taxi_ground
    }

    /// Fraction of records with `cause`; 0 for an empty breakdown.
    pub fn share(&self, cause: DelayCause) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.count(cause) as f64 / total as f64,
        }
    }

    fn slot(&mut self, cause: DelayCause) -> &mut usize {
        match cause {
            DelayCause::Normal => &mut self.normal,
            DelayCause::RampGate => &mut self.ramp_gate,
            DelayCause::TaxiGround => &mut self.taxi_ground,
        }
    }
}

impl fmt::Display for CauseBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = DelayCause::ALL
            .iter()
            .map(|&c| format!("{}: {} ({:.1}%)", c, self.count(c), self.share(c) * 100.0))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

// ============================================================================
// Hourly profile
// ============================================================================

/// Activity within one clock hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour: u32,
    pub flights: usize,
    /// Records with status `DLA`
    pub delayed: usize,
    /// Mean of the exported `ATD-RAM` column. Derived taxi times are left
    /// out; `None` when no record of the hour carries the column.
    pub mean_atd_ram_minutes: Option<f64>,
}

/// 24 hourly buckets keyed on a time basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyProfile {
    pub basis: TimeBasis,
    pub buckets: Vec<HourlyBucket>,
}

impl HourlyProfile {
    /// Bucket records by the hour of their basis timestamp. Records whose
    /// basis did not resolve are left out.
    pub fn build<'a, I>(records: I, basis: TimeBasis) -> Self
    where
        I: IntoIterator<Item = &'a FlightRecord>,
    {
        let mut flights = [0usize; HOURS_PER_DAY];
        let mut delayed = [0usize; HOURS_PER_DAY];
        let mut atd_ram: Vec<Vec<f64>> = vec![Vec::new(); HOURS_PER_DAY];

        for record in records {
            let Some(ts) = basis.timestamp(record) else {
                continue;
            };
            let h = ts.hour() as usize;
            flights[h] += 1;
            if record.status() == FlightStatus::Dla {
                delayed[h] += 1;
            }
            if record.metrics.taxi_source == TaxiSource::Precomputed {
                atd_ram[h].push(record.metrics.taxi_time_minutes);
            }
        }

        let buckets = (0..HOURS_PER_DAY)
            .map(|h| HourlyBucket {
                hour: h as u32,
                flights: flights[h],
                delayed: delayed[h],
                mean_atd_ram_minutes: (!atd_ram[h].is_empty()).then(|| atd_ram[h].iter().mean()),
            })
            .collect();

        Self { basis, buckets }
    }

    /// Buckets with at least one flight.
    pub fn active(&self) -> impl Iterator<Item = &HourlyBucket> {
        self.buckets.iter().filter(|b| b.flights > 0)
    }

    pub fn busiest_hour(&self) -> Option<&HourlyBucket> {
        self.active().max_by_key(|b| (b.flights, std::cmp::Reverse(b.hour)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        DelayMetrics, FlightRow, MeasuredFlight, Resolved, ResolvedTimes,
    };
    use crate::types::Classification;

    fn record(
        scheduled: Option<NaiveDateTime>,
        ramp_out: Option<NaiveDateTime>,
        status: FlightStatus,
        taxi: Option<f64>,
        cause: DelayCause,
    ) -> FlightRecord {
        let row = FlightRow {
            flight_id: "KE001".into(),
            stand_id: "101".into(),
            destination: "NRT".into(),
            status,
            schedule_date_raw: None,
            schedule_date: scheduled.map(|ts| ts.date()),
            scheduled_time_raw: None,
            ramp_out_time_raw: None,
            actual_departure_time_raw: None,
            precomputed_taxi_minutes: taxi,
        };
        let times = ResolvedTimes {
            scheduled_ts: scheduled.into(),
            ramp_out_ts: ramp_out.into(),
            actual_departure_ts: Resolved::Unparseable,
        };
        let metrics = DelayMetrics {
            taxi_time_minutes: taxi.unwrap_or(0.0),
            taxi_source: if taxi.is_some() { TaxiSource::Precomputed } else { TaxiSource::Unavailable },
            ..DelayMetrics::default()
        };
        FlightRecord::new(
            MeasuredFlight { row, times, metrics },
            Classification { cause, taxi_limit: None },
        )
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_select_day_and_hour() {
        let records = vec![
            record(Some(at(10, 8, 5)), None, FlightStatus::Dep, None, DelayCause::Normal),
            record(Some(at(10, 8, 55)), None, FlightStatus::Dep, None, DelayCause::Normal),
            record(Some(at(10, 9, 0)), None, FlightStatus::Dep, None, DelayCause::Normal),
            record(Some(at(11, 8, 0)), None, FlightStatus::Dep, None, DelayCause::Normal),
            record(None, None, FlightStatus::Dep, None, DelayCause::Normal),
        ];
        let d = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(select_day(&records, d, TimeBasis::Scheduled).len(), 3);
        assert_eq!(select_hour(&records, d, 8, TimeBasis::Scheduled).len(), 2);
        // Ramp-out never resolved
        assert!(select_day(&records, d, TimeBasis::RampOut).is_empty());
    }

    #[test]
    fn test_basis_changes_day() {
        // Scheduled 23:50, pushed back after midnight
        let records = vec![record(
            Some(at(10, 23, 50)),
            Some(at(11, 0, 15)),
            FlightStatus::Dla,
            None,
            DelayCause::RampGate,
        )];
        let d10 = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let d11 = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        assert_eq!(select_day(&records, d10, TimeBasis::Scheduled).len(), 1);
        assert_eq!(select_day(&records, d11, TimeBasis::RampOut).len(), 1);
        assert_eq!(select_hour(&records, d11, 0, TimeBasis::RampOut).len(), 1);
    }

    #[test]
    fn test_date_range() {
        let records = vec![
            record(Some(at(12, 1, 0)), None, FlightStatus::Dep, None, DelayCause::Normal),
            record(None, None, FlightStatus::Dep, None, DelayCause::Normal),
            record(Some(at(3, 1, 0)), None, FlightStatus::Dep, None, DelayCause::Normal),
        ];
        let (lo, hi) = date_range(&records).unwrap();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2025, 1, 12).unwrap());
        assert!(date_range(&[]).is_none());
    }

    #[test]
    fn test_cause_breakdown() {
        let records = vec![
            record(None, None, FlightStatus::Dep, None, DelayCause::Normal),
            record(None, None, FlightStatus::Dep, None, DelayCause::TaxiGround),
            record(None, None, FlightStatus::Dep, None, DelayCause::TaxiGround),
            record(None, None, FlightStatus::Dep, None, DelayCause::RampGate),
        ];
        let b = CauseBreakdown::from_records(&records);
        assert_eq!(b.total(), 4);
        assert_eq!(b.count(DelayCause::TaxiGround), 2);
        assert!((b.share(DelayCause::TaxiGround) - 0.5).abs() < 1e-12);
        assert_eq!(CauseBreakdown::default().share(DelayCause::Normal), 0.0);
    }

    #[test]
    fn test_hourly_profile() {
        let mut derived = record(Some(at(10, 9, 0)), None, FlightStatus::Dep, Some(45.0), DelayCause::Normal);
        derived.metrics.taxi_source = TaxiSource::Derived;
        let records = vec![
            record(Some(at(10, 7, 0)), None, FlightStatus::Dla, Some(20.0), DelayCause::Normal),
            record(Some(at(10, 7, 30)), None, FlightStatus::Dep, Some(30.0), DelayCause::Normal),
            record(Some(at(10, 7, 45)), None, FlightStatus::Dep, None, DelayCause::Normal),
            derived,
        ];
        let profile = HourlyProfile::build(&records, TimeBasis::Scheduled);
        assert_eq!(profile.buckets.len(), 24);

        let seven = &profile.buckets[7];
        assert_eq!(seven.flights, 3);
        assert_eq!(seven.delayed, 1);
        assert!((seven.mean_atd_ram_minutes.unwrap() - 25.0).abs() < 1e-9);

        // Only a derived taxi time at 09:00, no ATD-RAM
        assert_eq!(profile.buckets[9].flights, 1);
        assert!(profile.buckets[9].mean_atd_ram_minutes.is_none());
        assert!(profile.buckets[8].mean_atd_ram_minutes.is_none());

        assert_eq!(profile.active().count(), 2);
        assert_eq!(profile.busiest_hour().unwrap().hour, 7);
    }

    #[test]
    fn test_basis_parsing() {
        assert_eq!("ramp_out".parse::<TimeBasis>(), Ok(TimeBasis::RampOut));
        assert_eq!("Actual-Departure".parse::<TimeBasis>(), Ok(TimeBasis::ActualDeparture));
        assert!("gate".parse::<TimeBasis>().is_err());
    }
}
