//! Ramp Delay: departure delay attribution from ramp-operations exports
//!
//! Reconstructs absolute event times from clock-face export columns,
//! derives ramp/taxi/total delay, and attributes each departure's delay to
//! the gate or the taxiway.
//!
//! ## Architecture
//!
//! - **Time Resolver**: `YYMMDD` + `HH:MM` tokens to timestamps with midnight rollover
//! - **Metrics**: ramp delay, taxi time, total delay in minutes
//! - **Baseline**: per-month taxi-time mean + 1σ limits
//! - **Classifier**: three pluggable delay-cause policies
//! - **Pipeline**: measure → aggregate → classify over one batch
//!
//! Adapters around the core: `ingest` (CSV files), `stands` (apron map
//! join), `report` (day/hour views) and `weather` (hourly observations
//! next to departures).

pub mod config;
pub mod types;
pub mod time_resolver;
pub mod metrics;
pub mod baseline;
pub mod classifier;
pub mod pipeline;
pub mod report;
pub mod stands;
pub mod ingest;
pub mod weather;

// Re-export pipeline configuration
pub use config::{ConfigError, PipelineConfig};

// Re-export commonly used types
pub use types::{
    Classification, ClassifierThresholds, DelayCause, DelayMetrics, FlightRecord, FlightRow,
    FlightStatus, LimitSource, MeasuredFlight, RawRow, RawValue, Resolved, ResolvedTimes,
    TaxiLimit, TaxiSource, YearMonth,
};

// Re-export core stages
pub use baseline::{BaselineError, MonthlyBaseline, MonthlyTaxiStats, StatsAggregator};
pub use classifier::{ClassificationPolicy, DelayClassifier};
pub use pipeline::{BatchOutput, BatchSummary, Pipeline};
pub use time_resolver::{RolloverWindow, TimeParseError};

// Re-export adapters
pub use ingest::IngestError;
pub use report::{CauseBreakdown, HourlyProfile, TimeBasis};
pub use stands::{join_stands, PlacedFlight, StandLookup, StandTable, StandZone};
pub use weather::{DayConditions, HourlyConditions, HourlyWeather, WeatherObservation};
