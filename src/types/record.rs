//! Per-flight records as they move through the pipeline stages
//!
//! - `FlightRow`: typed view of one raw row (no derived values)
//! - `MeasuredFlight`: row + resolved timestamps + delay metrics
//! - `FlightRecord`: measured flight + assigned delay cause (pipeline output)

use super::raw::{columns, RawRow};
use super::{DelayCause, FlightStatus, Resolved, YearMonth};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// ============================================================================
// Parsed input
// ============================================================================

/// One scheduled movement as read from the export, before any derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRow {
    pub flight_id: String,
    pub stand_id: String,
    pub destination: String,
    pub status: FlightStatus,
    /// Raw `Date` token (`YYMMDD`)
    pub schedule_date_raw: Option<String>,
    /// Calendar date parsed from `schedule_date_raw`
    pub schedule_date: Option<NaiveDate>,
    pub scheduled_time_raw: Option<String>,
    pub ramp_out_time_raw: Option<String>,
    pub actual_departure_time_raw: Option<String>,
    /// `ATD-RAM` column, when present and numeric
    pub precomputed_taxi_minutes: Option<f64>,
}

impl FlightRow {
    pub fn from_raw(raw: &RawRow) -> Self {
        let owned = |col: &str| raw.text(col).map(Cow::into_owned);
        let schedule_date_raw = owned(columns::DATE);
        let schedule_date = schedule_date_raw
            .as_deref()
            .and_then(|d| crate::time_resolver::parse_schedule_date(d).ok());

        Self {
            flight_id: raw.text_or_empty(columns::FLIGHT),
            stand_id: raw.text_or_empty(columns::STAND),
            destination: raw.text_or_empty(columns::DESTINATION),
            status: FlightStatus::from_code(raw.text(columns::STATUS).as_deref()),
            schedule_date_raw,
            schedule_date,
            scheduled_time_raw: owned(columns::STD),
            ramp_out_time_raw: owned(columns::RAM),
            actual_departure_time_raw: owned(columns::ATD),
            precomputed_taxi_minutes: raw.number(columns::TAXI_MINUTES),
        }
    }
}

impl From<&RawRow> for FlightRow {
    fn from(raw: &RawRow) -> Self {
        Self::from_raw(raw)
    }
}

// ============================================================================
// Derived timestamps & metrics
// ============================================================================

/// Absolute timestamps reconstructed from the clock-face columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTimes {
    pub scheduled_ts: Resolved<NaiveDateTime>,
    pub ramp_out_ts: Resolved<NaiveDateTime>,
    pub actual_departure_ts: Resolved<NaiveDateTime>,
}

/// Where the taxi time of a record came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxiSource {
    /// `ATD-RAM` column
    Precomputed,
    /// Actual departure minus ramp-out
    Derived,
    #[default]
    Unavailable,
}

/// Delay metrics in minutes. Missing inputs degrade to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayMetrics {
    /// Ramp-out minus scheduled departure (signed)
    pub ramp_delay_minutes: f64,
    /// Ramp-out to actual departure
    pub taxi_time_minutes: f64,
    /// Actual departure minus scheduled departure
    pub total_delay_minutes: f64,
    pub taxi_source: TaxiSource,
}

/// A flight with timestamps resolved and metrics derived, awaiting
/// classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredFlight {
    pub row: FlightRow,
    pub times: ResolvedTimes,
    pub metrics: DelayMetrics,
}

impl MeasuredFlight {
    /// Baseline month of the flight, keyed on the scheduled departure.
    pub fn month(&self) -> Option<YearMonth> {
        self.times.scheduled_ts.as_ref().map(YearMonth::of)
    }
}

// ============================================================================
// Classification output
// ============================================================================

/// Where a taxi-time limit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitSource {
    /// Mean + 1σ of the flight's month
    Monthly,
    /// Fixed fallback limit
    Default,
}

/// Taxi-time limit applied (or shown) for a flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxiLimit {
    pub minutes: f64,
    pub source: LimitSource,
}

/// Result of classifying one flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub cause: DelayCause,
    /// Present for policies that consult the monthly baseline
    pub taxi_limit: Option<TaxiLimit>,
}

/// Fully enriched flight record, the pipeline's output unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    #[serde(flatten)]
    pub row: FlightRow,
    #[serde(flatten)]
    pub times: ResolvedTimes,
    #[serde(flatten)]
    pub metrics: DelayMetrics,
    pub delay_cause: DelayCause,
    pub taxi_limit: Option<TaxiLimit>,
}

impl FlightRecord {
    pub fn new(measured: MeasuredFlight, classification: Classification) -> Self {
        Self {
            row: measured.row,
            times: measured.times,
            metrics: measured.metrics,
            delay_cause: classification.cause,
            taxi_limit: classification.taxi_limit,
        }
    }

    pub fn flight_id(&self) -> &str {
        &self.row.flight_id
    }

    pub fn stand_id(&self) -> &str {
        &self.row.stand_id
    }

    pub fn status(&self) -> FlightStatus {
        self.row.status
    }

    pub fn scheduled_ts(&self) -> Option<NaiveDateTime> {
        self.times.scheduled_ts.value()
    }
}
