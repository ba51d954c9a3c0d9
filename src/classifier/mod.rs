//! Delay Classifier - assigns each departure a dominant delay cause
//!
//! Three interchangeable policies share one entry point:
//!
//! | Policy              | Primary signal          | Consults baseline |
//! |---------------------|-------------------------|-------------------|
//! | `DualThreshold`     | ramp delay + taxi time  | no                |
//! | `TotalDelayPrimary` | total delay             | limit reported    |
//! | `SigmaGated`        | total delay + taxi σ    | limit gates       |
//!
//! `TotalDelayPrimary` reports the month's taxi limit but resolves every
//! flight past the Normal/RampGate checks to `TaxiGround`. `SigmaGated`
//! uses that same limit as a hard gate between `TaxiGround` and `RampGate`.
//!
//! Classification is pure: the same metrics and baseline always give the
//! same cause, independent of any other flight.

use crate::baseline::MonthlyBaseline;
use crate::types::{
    Classification, ClassifierThresholds, DelayCause, DelayMetrics, MeasuredFlight, TaxiLimit,
    YearMonth,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Policy selection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// Fixed ramp/taxi thresholds
    #[default]
    DualThreshold,
    /// Total delay first; past ramp checks always taxi
    TotalDelayPrimary,
    /// Total delay first; taxi σ limit decides taxi vs ramp
    SigmaGated,
}

impl ClassificationPolicy {
    pub const ALL: [ClassificationPolicy; 3] = [
        ClassificationPolicy::DualThreshold,
        ClassificationPolicy::TotalDelayPrimary,
        ClassificationPolicy::SigmaGated,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClassificationPolicy::DualThreshold => "dual_threshold",
            ClassificationPolicy::TotalDelayPrimary => "total_delay_primary",
            ClassificationPolicy::SigmaGated => "sigma_gated",
        }
    }

    /// Whether the policy reads the monthly taxi baseline.
    pub fn uses_baseline(self) -> bool {
        !matches!(self, ClassificationPolicy::DualThreshold)
    }
}

impl fmt::Display for ClassificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClassificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|p| p.name()).collect();
                format!("unknown policy '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

// ============================================================================
// Policy functions
// ============================================================================

/// Dual-threshold policy.
///
/// Short ramp delay and short taxi → Normal. Long ramp delay with moderate
/// taxi → RampGate. Congested taxi → whichever of ramp delay or taxi time in
/// excess of unavoidable ground movement is larger. Anything else → RampGate.
pub fn dual_threshold(ramp_delay: f64, taxi_time: f64, t: &ClassifierThresholds) -> DelayCause {
    if ramp_delay < t.ramp_normal_max_minutes && taxi_time < t.taxi_normal_max_minutes {
        DelayCause::Normal
    } else if ramp_delay >= t.ramp_gate_min_minutes && taxi_time < t.taxi_congested_minutes {
        DelayCause::RampGate
    } else if taxi_time >= t.taxi_congested_minutes {
        if ramp_delay > taxi_time - t.unavoidable_taxi_minutes {
            DelayCause::RampGate
        } else {
            DelayCause::TaxiGround
        }
    } else {
        DelayCause::RampGate
    }
}

/// Total-delay-primary policy. `_limit` is accepted for symmetry with
/// [`sigma_gated`]; it does not influence the outcome.
pub fn total_delay_primary(
    ramp_delay: f64,
    total_delay: f64,
    _limit: f64,
    t: &ClassifierThresholds,
) -> DelayCause {
    if total_delay <= t.total_delay_normal_max_minutes {
        DelayCause::Normal
    } else if ramp_delay >= t.ramp_gate_min_minutes {
        DelayCause::RampGate
    } else {
        DelayCause::TaxiGround
    }
}

/// Sigma-gated policy: like [`total_delay_primary`], but a taxi time at or
/// below the month's limit attributes the delay to the gate.
pub fn sigma_gated(
    ramp_delay: f64,
    taxi_time: f64,
    total_delay: f64,
    limit: f64,
    t: &ClassifierThresholds,
) -> DelayCause {
    if total_delay <= t.total_delay_normal_max_minutes {
        DelayCause::Normal
    } else if ramp_delay >= t.ramp_gate_min_minutes {
        DelayCause::RampGate
    } else if taxi_time > limit {
        DelayCause::TaxiGround
    } else {
        DelayCause::RampGate
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// A configured policy plus its thresholds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DelayClassifier {
    pub policy: ClassificationPolicy,
    pub thresholds: ClassifierThresholds,
}

impl DelayClassifier {
    pub fn new(policy: ClassificationPolicy, thresholds: ClassifierThresholds) -> Self {
        Self { policy, thresholds }
    }

    /// Classify one set of metrics. `month` selects the baseline row for the
    /// statistical policies; `None` falls back to the default limit.
    pub fn classify(
        &self,
        metrics: &DelayMetrics,
        month: Option<YearMonth>,
        baseline: &MonthlyBaseline,
    ) -> Classification {
        let DelayMetrics {
            ramp_delay_minutes: ramp,
            taxi_time_minutes: taxi,
            total_delay_minutes: total,
            ..
        } = *metrics;
        let t = &self.thresholds;

        match self.policy {
            ClassificationPolicy::DualThreshold => Classification {
                cause: dual_threshold(ramp, taxi, t),
                taxi_limit: None,
            },
            ClassificationPolicy::TotalDelayPrimary => {
                let limit = baseline.taxi_limit(month);
                Classification {
                    cause: total_delay_primary(ramp, total, limit.minutes, t),
                    taxi_limit: Some(limit),
                }
            }
            ClassificationPolicy::SigmaGated => {
                let limit: TaxiLimit = baseline.taxi_limit(month);
                Classification {
                    cause: sigma_gated(ramp, taxi, total, limit.minutes, t),
                    taxi_limit: Some(limit),
                }
            }
        }
    }

    pub fn classify_flight(&self, flight: &MeasuredFlight, baseline: &MonthlyBaseline) -> Classification {
        self.classify(&flight.metrics, flight.month(), baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::StatsAggregator;
    use crate::types::{LimitSource, TaxiSource};

    fn metrics(ramp: f64, taxi: f64, total: f64) -> DelayMetrics {
        DelayMetrics {
            ramp_delay_minutes: ramp,
            taxi_time_minutes: taxi,
            total_delay_minutes: total,
            taxi_source: TaxiSource::Precomputed,
        }
    }

    #[test]
    fn test_dual_threshold_scenarios() {
        let t = ClassifierThresholds::default();
        assert_eq!(dual_threshold(10.0, 20.0, &t), DelayCause::Normal);
        assert_eq!(dual_threshold(20.0, 10.0, &t), DelayCause::RampGate);
        assert_eq!(dual_threshold(5.0, 35.0, &t), DelayCause::TaxiGround);
        // Both long: ramp 20 > 35 - 20
        assert_eq!(dual_threshold(20.0, 35.0, &t), DelayCause::RampGate);
        // Tie goes to taxi: 15 > 15 is false
        assert_eq!(dual_threshold(15.0, 35.0, &t), DelayCause::TaxiGround);
        // Short ramp, taxi in [25, 30): fallback
        assert_eq!(dual_threshold(5.0, 27.0, &t), DelayCause::RampGate);
    }

    #[test]
    fn test_dual_threshold_boundaries() {
        let t = ClassifierThresholds::default();
        assert_eq!(dual_threshold(14.99, 24.99, &t), DelayCause::Normal);
        assert_eq!(dual_threshold(15.0, 0.0, &t), DelayCause::RampGate);
        assert_eq!(dual_threshold(0.0, 30.0, &t), DelayCause::TaxiGround);
        assert_eq!(dual_threshold(-30.0, 0.0, &t), DelayCause::Normal);
    }

    #[test]
    fn test_total_delay_primary_ignores_limit() {
        let t = ClassifierThresholds::default();
        assert_eq!(total_delay_primary(40.0, 15.0, 30.0, &t), DelayCause::Normal);
        assert_eq!(total_delay_primary(15.0, 16.0, 30.0, &t), DelayCause::RampGate);
        // Taxi time well under any limit still resolves to taxi.
        assert_eq!(total_delay_primary(5.0, 25.0, 1000.0, &t), DelayCause::TaxiGround);
        assert_eq!(total_delay_primary(5.0, 25.0, 0.0, &t), DelayCause::TaxiGround);
    }

    #[test]
    fn test_sigma_gated() {
        let t = ClassifierThresholds::default();
        assert_eq!(sigma_gated(5.0, 10.0, 10.0, 30.0, &t), DelayCause::Normal);
        assert_eq!(sigma_gated(20.0, 40.0, 60.0, 30.0, &t), DelayCause::RampGate);
        assert_eq!(sigma_gated(5.0, 35.0, 40.0, 30.0, &t), DelayCause::TaxiGround);
        assert_eq!(sigma_gated(5.0, 30.0, 40.0, 30.0, &t), DelayCause::RampGate);
    }

    #[test]
    fn test_classifier_attaches_limit() {
        let baseline = StatsAggregator::new(2, 30.0).aggregate(std::iter::empty());
        let m = metrics(5.0, 20.0, 25.0);

        let dual = DelayClassifier::new(ClassificationPolicy::DualThreshold, Default::default());
        let c = dual.classify(&m, None, &baseline);
        assert_eq!(c.cause, DelayCause::Normal);
        assert!(c.taxi_limit.is_none());

        let literal = DelayClassifier::new(ClassificationPolicy::TotalDelayPrimary, Default::default());
        let c = literal.classify(&m, Some(YearMonth::new(2025, 1)), &baseline);
        assert_eq!(c.cause, DelayCause::TaxiGround);
        let limit = c.taxi_limit.unwrap();
        assert_eq!(limit.minutes, 30.0);
        assert_eq!(limit.source, LimitSource::Default);

        let gated = DelayClassifier::new(ClassificationPolicy::SigmaGated, Default::default());
        let c = gated.classify(&m, Some(YearMonth::new(2025, 1)), &baseline);
        assert_eq!(c.cause, DelayCause::RampGate);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let baseline = MonthlyBaseline::empty(30.0);
        for policy in ClassificationPolicy::ALL {
            let classifier = DelayClassifier::new(policy, Default::default());
            for m in [metrics(10.0, 20.0, 30.0), metrics(20.0, 45.0, 65.0), metrics(0.0, 0.0, 0.0)] {
                let first = classifier.classify(&m, None, &baseline);
                let second = classifier.classify(&m, None, &baseline);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "sigma-gated".parse::<ClassificationPolicy>(),
            Ok(ClassificationPolicy::SigmaGated)
        );
        assert_eq!(
            "Total_Delay_Primary".parse::<ClassificationPolicy>(),
            Ok(ClassificationPolicy::TotalDelayPrimary)
        );
        assert!("sigma".parse::<ClassificationPolicy>().is_err());
        assert_eq!(ClassificationPolicy::default().to_string(), "dual_threshold");
    }
}
