//! Pipeline Coordinator - runs one batch of raw rows to classified records
//!
//! Phase 1 is embarrassingly parallel and runs on the rayon pool when
//! enabled; `par_iter().collect()` keeps input order. Phase 2 is a single
//! reduction that must complete before phase 3 reads the baseline.

use crate::baseline::{MonthlyBaseline, StatsAggregator};
use crate::classifier::{ClassificationPolicy, DelayClassifier};
use crate::config::PipelineConfig;
use crate::metrics;
use crate::report::CauseBreakdown;
use crate::time_resolver::{resolve_times, RolloverWindow};
use crate::types::{FlightRecord, FlightRow, MeasuredFlight, RawRow, TaxiSource};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Phase 1 for a single row: typed view, resolved timestamps, metrics.
pub fn measure_row(raw: &RawRow, window: RolloverWindow) -> MeasuredFlight {
    let row = FlightRow::from_raw(raw);
    let times = resolve_times(&row, window);
    metrics::measure(row, times)
}

/// Batch runner holding the per-batch settings.
#[derive(Debug, Clone)]
pub struct Pipeline {
    window: RolloverWindow,
    aggregator: StatsAggregator,
    classifier: DelayClassifier,
    parallel: bool,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            window: config.rollover,
            aggregator: config.aggregator(),
            classifier: config.classifier(),
            parallel: config.pipeline.parallel,
        }
    }

    /// Pipeline built from the global config (defaults if never initialized).
    pub fn from_global() -> Self {
        Self::new(crate::config::get())
    }

    /// Same settings, different classification policy.
    pub fn with_policy(mut self, policy: ClassificationPolicy) -> Self {
        self.classifier.policy = policy;
        self
    }

    pub fn policy(&self) -> ClassificationPolicy {
        self.classifier.policy
    }

    /// Phase 1 over a whole batch.
    pub fn measure_rows(&self, rows: &[RawRow]) -> Vec<MeasuredFlight> {
        let window = self.window;
        if self.parallel {
            rows.par_iter().map(|raw| measure_row(raw, window)).collect()
        } else {
            rows.iter().map(|raw| measure_row(raw, window)).collect()
        }
    }

    /// Run all three phases over one batch.
    pub fn run(&self, rows: &[RawRow]) -> BatchOutput {
        let start = Instant::now();

        // PHASE 1
        let measured = self.measure_rows(rows);
        debug!(rows = measured.len(), parallel = self.parallel, "Rows measured");

        // PHASE 2 (barrier)
        let baseline = self.aggregator.aggregate(&measured);

        // PHASE 3
        let records: Vec<FlightRecord> = measured
            .into_iter()
            .map(|flight| {
                let classification = self.classifier.classify_flight(&flight, &baseline);
                FlightRecord::new(flight, classification)
            })
            .collect();

        let summary = BatchSummary::from_records(&records);
        info!(
            total = summary.total,
            unparseable_schedule = summary.unparseable_schedule,
            unparseable_ramp_out = summary.unparseable_ramp_out,
            unparseable_actual_departure = summary.unparseable_actual_departure,
            precomputed_taxi = summary.precomputed_taxi,
            derived_taxi = summary.derived_taxi,
            policy = %self.classifier.policy,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch classified"
        );

        BatchOutput {
            records,
            baseline,
            summary,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_global()
    }
}

/// Everything one batch produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One record per input row, input order
    pub records: Vec<FlightRecord>,
    pub baseline: MonthlyBaseline,
    pub summary: BatchSummary,
}

/// Data-quality and outcome counters for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    /// Rows without a usable `Date`/`STD` anchor
    pub unparseable_schedule: usize,
    /// Anchored rows whose `RAM` is missing or malformed
    pub unparseable_ramp_out: usize,
    /// Anchored rows whose `ATD` is missing or malformed
    pub unparseable_actual_departure: usize,
    /// Taxi time taken from `ATD-RAM`
    pub precomputed_taxi: usize,
    /// Taxi time derived from `ATD - RAM` timestamps
    pub derived_taxi: usize,
    pub cause_counts: CauseBreakdown,
}

impl BatchSummary {
    pub fn from_records(records: &[FlightRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            if record.times.scheduled_ts.is_value() {
                summary.unparseable_ramp_out += usize::from(!record.times.ramp_out_ts.is_value());
                summary.unparseable_actual_departure +=
                    usize::from(!record.times.actual_departure_ts.is_value());
            } else {
                summary.unparseable_schedule += 1;
            }
            match record.metrics.taxi_source {
                TaxiSource::Precomputed => summary.precomputed_taxi += 1,
                TaxiSource::Derived => summary.derived_taxi += 1,
                TaxiSource::Unavailable => {}
            }
            summary.cause_counts.add(record.delay_cause);
        }

        summary
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Batch: {} rows ({} unanchored, {} without RAM, {} without ATD), taxi {} precomputed / {} derived; {}",
            self.total,
            self.unparseable_schedule,
            self.unparseable_ramp_out,
            self.unparseable_actual_departure,
            self.precomputed_taxi,
            self.derived_taxi,
            self.cause_counts
        )
    }
}
