//! Delay classification thresholds

use serde::{Deserialize, Serialize};

/// Fixed thresholds used by the classification policies (minutes).
pub mod delay_thresholds {
    // === Dual-threshold policy ===
    /// Ramp delay below this (with a short taxi) is on time
    pub const RAMP_NORMAL_MAX: f64 = 15.0;
    /// Taxi time below this (with a short ramp delay) is on time
    pub const TAXI_NORMAL_MAX: f64 = 25.0;
    /// Ramp delay at or above this points at the gate
    pub const RAMP_GATE_MIN: f64 = 15.0;
    /// Taxi time at or above this is ground congestion
    pub const TAXI_CONGESTED: f64 = 30.0;
    /// Ground movement every departure spends regardless of congestion
    pub const UNAVOIDABLE_TAXI: f64 = 20.0;

    // === Total-delay policies ===
    /// Total delay at or below this is on time
    pub const TOTAL_DELAY_NORMAL_MAX: f64 = 15.0;

    // === Statistical fallback ===
    /// Taxi limit used when a month has no usable baseline
    pub const DEFAULT_TAXI_LIMIT: f64 = 30.0;
}

/// Operator-tunable classification thresholds, defaulting to
/// [`delay_thresholds`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    #[serde(default = "default_ramp_normal_max")]
    pub ramp_normal_max_minutes: f64,

    #[serde(default = "default_taxi_normal_max")]
    pub taxi_normal_max_minutes: f64,

    #[serde(default = "default_ramp_gate_min")]
    pub ramp_gate_min_minutes: f64,

    #[serde(default = "default_taxi_congested")]
    pub taxi_congested_minutes: f64,

    /// Subtracted from taxi time before comparing against ramp delay when
    /// both are long.
    #[serde(default = "default_unavoidable_taxi")]
    pub unavoidable_taxi_minutes: f64,

    #[serde(default = "default_total_delay_normal_max")]
    pub total_delay_normal_max_minutes: f64,
}

fn default_ramp_normal_max() -> f64 {
    delay_thresholds::RAMP_NORMAL_MAX
}
fn default_taxi_normal_max() -> f64 {
    delay_thresholds::TAXI_NORMAL_MAX
}
fn default_ramp_gate_min() -> f64 {
    delay_thresholds::RAMP_GATE_MIN
}
fn default_taxi_congested() -> f64 {
    delay_thresholds::TAXI_CONGESTED
}
fn default_unavoidable_taxi() -> f64 {
    delay_thresholds::UNAVOIDABLE_TAXI
}
fn default_total_delay_normal_max() -> f64 {
    delay_thresholds::TOTAL_DELAY_NORMAL_MAX
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            ramp_normal_max_minutes: default_ramp_normal_max(),
            taxi_normal_max_minutes: default_taxi_normal_max(),
            ramp_gate_min_minutes: default_ramp_gate_min(),
            taxi_congested_minutes: default_taxi_congested(),
            unavoidable_taxi_minutes: default_unavoidable_taxi(),
            total_delay_normal_max_minutes: default_total_delay_normal_max(),
        }
    }
}

impl ClassifierThresholds {
    /// Name/value pairs, used by config validation.
    pub fn named_values(&self) -> [(&'static str, f64); 6] {
        [
            ("ramp_normal_max_minutes", self.ramp_normal_max_minutes),
            ("taxi_normal_max_minutes", self.taxi_normal_max_minutes),
            ("ramp_gate_min_minutes", self.ramp_gate_min_minutes),
            ("taxi_congested_minutes", self.taxi_congested_minutes),
            ("unavoidable_taxi_minutes", self.unavoidable_taxi_minutes),
            ("total_delay_normal_max_minutes", self.total_delay_normal_max_minutes),
        ]
    }
}
