//! Monthly Taxi Baselines - per-month taxi-time statistics
//!
//! The statistical classification policies compare a flight's taxi time
//! against the typical taxi time of its calendar month: mean + 1σ over all
//! flights of that month with a positive taxi time.
//!
//! ## Architecture
//!
//! - `MonthAccumulator`: collects qualifying taxi samples for one month
//! - `MonthlyTaxiStats`: finalized mean/σ/limit for one month
//! - `StatsAggregator`: one full pass over a batch → `MonthlyBaseline`
//! - `MonthlyBaseline`: read-only lookup table used during classification
//!
//! ## Lifecycle
//!
//! The baseline is rebuilt once per batch and is never updated afterwards.
//! Aggregation must finish before any flight is classified.
//!
//! ## Fallback
//!
//! A month with fewer than `min_samples` qualifying flights (or absent from
//! the table) has no σ limit; classification then uses the fixed default
//! limit (30 min).

use crate::types::{delay_thresholds, LimitSource, MeasuredFlight, TaxiLimit, YearMonth};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

// ============================================================================
// Configuration Constants (defaults, overridden by ramp_delay.toml)
// ============================================================================

/// Default taxi limit when a month has no usable σ baseline (minutes)
pub const DEFAULT_TAXI_LIMIT_MINUTES: f64 = delay_thresholds::DEFAULT_TAXI_LIMIT;

/// Minimum qualifying samples for a sample standard deviation
pub const MIN_SAMPLES_FOR_SIGMA: usize = 2;

// ============================================================================
// Config-aware accessors (read from ramp_delay.toml when available)
// ============================================================================

fn cfg_default_taxi_limit() -> f64 {
    if crate::config::is_initialized() {
        crate::config::get().statistics.default_taxi_limit_minutes
    } else {
        DEFAULT_TAXI_LIMIT_MINUTES
    }
}

fn cfg_min_samples() -> usize {
    if crate::config::is_initialized() {
        crate::config::get().statistics.min_samples
    } else {
        MIN_SAMPLES_FOR_SIGMA
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BaselineError {
    #[error("No taxi baseline for month {0}")]
    MonthNotFound(YearMonth),

    #[error("Insufficient taxi samples for month {0}: have {1}, need {2}")]
    InsufficientSamples(YearMonth, usize, usize),
}

// ============================================================================
// Month Accumulator
// ============================================================================

/// Collects qualifying taxi-time samples for one calendar month.
#[derive(Debug, Clone)]
pub struct MonthAccumulator {
    pub month: YearMonth,
    samples: Vec<f64>,
}

impl MonthAccumulator {
    pub fn new(month: YearMonth) -> Self {
        Self {
            month,
            samples: Vec::new(),
        }
    }

    /// Add a taxi time. Only finite, strictly positive values qualify.
    ///
    /// Returns whether the sample was kept.
    pub fn add_sample(&mut self, taxi_minutes: f64) -> bool {
        if !taxi_minutes.is_finite() || taxi_minutes <= 0.0 {
            return false;
        }
        self.samples.push(taxi_minutes);
        true
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Finalize into month statistics. σ and the σ limit are only defined
    /// with at least `min_samples` samples.
    pub fn finalize(self, min_samples: usize) -> MonthlyTaxiStats {
        let sample_count = self.samples.len();
        let min_samples = min_samples.max(MIN_SAMPLES_FOR_SIGMA);

        let mean_minutes = self.samples.iter().mean();
        let std_minutes = if sample_count >= min_samples {
            Some(self.samples.iter().std_dev()).filter(|s| s.is_finite())
        } else {
            None
        };
        let sigma1_limit = std_minutes.map(|std| mean_minutes + std);

        let min_minutes = self.samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max_minutes = self.samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let median_minutes = Data::new(self.samples).median();

        MonthlyTaxiStats {
            month: self.month,
            sample_count,
            mean_minutes,
            std_minutes,
            sigma1_limit,
            median_minutes,
            min_minutes,
            max_minutes,
        }
    }
}

// ============================================================================
// Monthly Statistics
// ============================================================================

/// Taxi-time statistics of one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTaxiStats {
    pub month: YearMonth,
    /// Flights with a positive taxi time
    pub sample_count: usize,
    pub mean_minutes: f64,
    /// Sample standard deviation; `None` below the minimum sample count
    pub std_minutes: Option<f64>,
    /// `mean + std`; `None` whenever `std_minutes` is
    pub sigma1_limit: Option<f64>,
    pub median_minutes: f64,
    pub min_minutes: f64,
    pub max_minutes: f64,
}

// ============================================================================
// Baseline Table
// ============================================================================

/// Read-only month → statistics table for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBaseline {
    months: BTreeMap<YearMonth, MonthlyTaxiStats>,
    default_taxi_limit: f64,
    min_samples: usize,
}

impl Default for MonthlyBaseline {
    fn default() -> Self {
        Self::empty(cfg_default_taxi_limit())
    }
}

impl MonthlyBaseline {
    /// A table with no months: every lookup falls back to `default_taxi_limit`.
    pub fn empty(default_taxi_limit: f64) -> Self {
        Self {
            months: BTreeMap::new(),
            default_taxi_limit,
            min_samples: MIN_SAMPLES_FOR_SIGMA,
        }
    }

    pub fn get(&self, month: YearMonth) -> Option<&MonthlyTaxiStats> {
        self.months.get(&month)
    }

    /// Months in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = &MonthlyTaxiStats> {
        self.months.values()
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn default_taxi_limit(&self) -> f64 {
        self.default_taxi_limit
    }

    /// The month's mean + 1σ limit, or why there is none.
    pub fn sigma1_limit(&self, month: YearMonth) -> Result<f64, BaselineError> {
        let stats = self.get(month).ok_or(BaselineError::MonthNotFound(month))?;
        stats.sigma1_limit.ok_or(BaselineError::InsufficientSamples(
            month,
            stats.sample_count,
            self.min_samples,
        ))
    }

    /// Taxi limit for a flight's month, falling back to the default limit
    /// when the month is unknown or has no σ.
    pub fn taxi_limit(&self, month: Option<YearMonth>) -> TaxiLimit {
        let monthly = month.map(|m| self.sigma1_limit(m));
        match monthly {
            Some(Ok(minutes)) => TaxiLimit {
                minutes,
                source: LimitSource::Monthly,
            },
            Some(Err(e)) => {
                debug!(reason = %e, "Using default taxi limit");
                self.default_limit()
            }
            None => self.default_limit(),
        }
    }

    fn default_limit(&self) -> TaxiLimit {
        TaxiLimit {
            minutes: self.default_taxi_limit,
            source: LimitSource::Default,
        }
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Builds the monthly baseline from a full batch of measured flights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsAggregator {
    pub min_samples: usize,
    pub default_taxi_limit: f64,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self {
            min_samples: cfg_min_samples(),
            default_taxi_limit: cfg_default_taxi_limit(),
        }
    }
}

impl StatsAggregator {
    pub fn new(min_samples: usize, default_taxi_limit: f64) -> Self {
        Self {
            min_samples,
            default_taxi_limit,
        }
    }

    /// Group flights by the month of their scheduled departure and compute
    /// taxi statistics over flights with a positive taxi time. Flights
    /// without a scheduled timestamp are ignored.
    pub fn aggregate<'a, I>(&self, flights: I) -> MonthlyBaseline
    where
        I: IntoIterator<Item = &'a MeasuredFlight>,
    {
        let mut accumulators: BTreeMap<YearMonth, MonthAccumulator> = BTreeMap::new();
        let mut skipped_no_anchor = 0usize;

        for flight in flights {
            let Some(month) = flight.month() else {
                skipped_no_anchor += 1;
                continue;
            };
            let taxi = flight.metrics.taxi_time_minutes;
            if taxi.is_finite() && taxi > 0.0 {
                accumulators
                    .entry(month)
                    .or_insert_with(|| MonthAccumulator::new(month))
                    .add_sample(taxi);
            }
        }

        let months: BTreeMap<YearMonth, MonthlyTaxiStats> = accumulators
            .into_iter()
            .map(|(month, acc)| {
                let stats = acc.finalize(self.min_samples);
                debug!(
                    month = %month,
                    samples = stats.sample_count,
                    mean = stats.mean_minutes,
                    std = ?stats.std_minutes,
                    limit = ?stats.sigma1_limit,
                    "Monthly taxi baseline"
                );
                (month, stats)
            })
            .collect();

        info!(
            months = months.len(),
            skipped_no_anchor,
            "Taxi baselines computed"
        );

        MonthlyBaseline {
            months,
            default_taxi_limit: self.default_taxi_limit,
            min_samples: self.min_samples.max(MIN_SAMPLES_FOR_SIGMA),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::measure;
    use crate::time_resolver::{resolve_times, RolloverWindow};
    use crate::types::{columns, FlightRow, RawRow};

    fn flight(date: &str, taxi: f64) -> MeasuredFlight {
        let raw = RawRow::new()
            .with(columns::DATE, date)
            .with(columns::STD, "12:00")
            .with(columns::TAXI_MINUTES, taxi);
        let row = FlightRow::from_raw(&raw);
        let times = resolve_times(&row, RolloverWindow::default());
        measure(row, times)
    }

    #[test]
    fn test_sample_mean_and_std() {
        let mut acc = MonthAccumulator::new(YearMonth::new(2025, 1));
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            assert!(acc.add_sample(v));
        }
        let stats = acc.finalize(MIN_SAMPLES_FOR_SIGMA);

        assert!((stats.mean_minutes - 5.0).abs() < 1e-9);
        // Sample variance = 32 / 7
        let std = stats.std_minutes.unwrap();
        assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-9);
        assert!((stats.sigma1_limit.unwrap() - (5.0 + std)).abs() < 1e-9);
        assert!((stats.median_minutes - 4.5).abs() < 1e-9);
        assert_eq!(stats.min_minutes, 2.0);
        assert_eq!(stats.max_minutes, 9.0);
    }

    #[test]
    fn test_non_positive_samples_rejected() {
        let mut acc = MonthAccumulator::new(YearMonth::new(2025, 1));
        assert!(!acc.add_sample(0.0));
        assert!(!acc.add_sample(-3.0));
        assert!(!acc.add_sample(f64::NAN));
        assert_eq!(acc.count(), 0);
    }

    #[test]
    fn test_single_sample_has_no_sigma() {
        let mut acc = MonthAccumulator::new(YearMonth::new(2025, 2));
        acc.add_sample(18.0);
        let stats = acc.finalize(MIN_SAMPLES_FOR_SIGMA);
        assert_eq!(stats.sample_count, 1);
        assert_eq!(stats.std_minutes, None);
        assert_eq!(stats.sigma1_limit, None);
    }

    #[test]
    fn test_aggregate_groups_by_month() {
        let flights = vec![
            flight("250105", 20.0),
            flight("250120", 30.0),
            flight("250203", 25.0),
            flight("250204", 0.0),
            flight("bad", 50.0),
        ];
        let baseline = StatsAggregator::new(2, 30.0).aggregate(&flights);

        assert_eq!(baseline.len(), 2);
        let jan = baseline.get(YearMonth::new(2025, 1)).unwrap();
        assert_eq!(jan.sample_count, 2);
        assert!((jan.mean_minutes - 25.0).abs() < 1e-9);

        let feb = baseline.get(YearMonth::new(2025, 2)).unwrap();
        assert_eq!(feb.sample_count, 1);
        assert_eq!(feb.sigma1_limit, None);

        let months: Vec<YearMonth> = baseline.iter().map(|s| s.month).collect();
        assert_eq!(months, vec![YearMonth::new(2025, 1), YearMonth::new(2025, 2)]);
    }

    #[test]
    fn test_taxi_limit_fallbacks() {
        let flights = vec![flight("250105", 20.0), flight("250120", 30.0), flight("250203", 25.0)];
        let baseline = StatsAggregator::new(2, 30.0).aggregate(&flights);

        let jan = baseline.taxi_limit(Some(YearMonth::new(2025, 1)));
        assert_eq!(jan.source, LimitSource::Monthly);
        assert!(jan.minutes > 25.0);

        let feb = baseline.taxi_limit(Some(YearMonth::new(2025, 2)));
        assert_eq!(feb.source, LimitSource::Default);
        assert_eq!(feb.minutes, 30.0);
        assert!(matches!(
            baseline.sigma1_limit(YearMonth::new(2025, 2)),
            Err(BaselineError::InsufficientSamples(_, 1, 2))
        ));

        let mar = baseline.taxi_limit(Some(YearMonth::new(2025, 3)));
        assert_eq!(mar.source, LimitSource::Default);
        assert!(matches!(
            baseline.sigma1_limit(YearMonth::new(2025, 3)),
            Err(BaselineError::MonthNotFound(_))
        ));

        assert_eq!(baseline.taxi_limit(None).source, LimitSource::Default);
    }

    #[test]
    fn test_min_samples_raises_bar() {
        let flights = vec![flight("250105", 20.0), flight("250120", 30.0)];
        let baseline = StatsAggregator::new(5, 30.0).aggregate(&flights);
        let jan = baseline.get(YearMonth::new(2025, 1)).unwrap();
        assert_eq!(jan.sigma1_limit, None);
    }

    #[test]
    fn test_baseline_serializes_with_month_keys() {
        let flights = vec![flight("250105", 20.0), flight("250120", 30.0)];
        let baseline = StatsAggregator::new(2, 30.0).aggregate(&flights);
        let json = serde_json::to_string(&baseline).unwrap();
        assert!(json.contains("\"2025-01\""));
    }
}
