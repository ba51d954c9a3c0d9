//! Pipeline configuration loaded from TOML
//!
//! Every section is optional; a missing section or key falls back to the
//! built-in default, so an empty file is a valid config.

use super::defaults;
use crate::baseline::{StatsAggregator, DEFAULT_TAXI_LIMIT_MINUTES, MIN_SAMPLES_FOR_SIGMA};
use crate::classifier::{ClassificationPolicy, DelayClassifier};
use crate::time_resolver::RolloverWindow;
use crate::types::ClassifierThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Top-level Config
// ============================================================================

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Airport the exports come from
    #[serde(default)]
    pub airport: AirportInfo,

    /// Policy selection and thresholds
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Monthly baseline settings
    #[serde(default)]
    pub statistics: StatisticsConfig,

    /// Midnight rollover hour bounds
    #[serde(default)]
    pub rollover: RolloverWindow,

    /// Execution settings
    #[serde(default)]
    pub pipeline: ExecutionConfig,
}

impl PipelineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$RAMP_DELAY_CONFIG` environment variable
    /// 2. `./ramp_delay.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), airport = %config.airport.icao, "Loaded config from RAMP_DELAY_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from RAMP_DELAY_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "RAMP_DELAY_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(airport = %config.airport.icao, "Loaded config from ./ramp_delay.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./ramp_delay.toml, using defaults");
                }
            }
        }

        info!("No ramp_delay.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys are logged, not
    /// rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// Rules:
    /// - thresholds must be finite and non-negative
    /// - the default taxi limit must be positive
    /// - `min_samples` must be at least 2
    /// - rollover hours must lie in 0-23 with early < late
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!(field = %w.field, "{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Classifier built from the `[classification]` section.
    pub fn classifier(&self) -> DelayClassifier {
        DelayClassifier::new(
            self.classification.policy,
            self.classification.thresholds.clone(),
        )
    }

    /// Aggregator built from the `[statistics]` section.
    pub fn aggregator(&self) -> StatsAggregator {
        StatsAggregator::new(
            self.statistics.min_samples,
            self.statistics.default_taxi_limit_minutes,
        )
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Airport Info
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportInfo {
    #[serde(default = "default_airport_name")]
    pub name: String,
    #[serde(default = "default_airport_icao")]
    pub icao: String,
}

fn default_airport_name() -> String {
    defaults::DEFAULT_AIRPORT_NAME.to_string()
}
fn default_airport_icao() -> String {
    defaults::DEFAULT_AIRPORT_ICAO.to_string()
}

impl Default for AirportInfo {
    fn default() -> Self {
        Self {
            name: default_airport_name(),
            icao: default_airport_icao(),
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassificationConfig {
    #[serde(default)]
    pub policy: ClassificationPolicy,
    #[serde(default)]
    pub thresholds: ClassifierThresholds,
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Taxi limit used when a month has no usable σ limit
    #[serde(default = "default_taxi_limit")]
    pub default_taxi_limit_minutes: f64,
    /// Samples a month needs before its σ limit is trusted
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

fn default_taxi_limit() -> f64 {
    DEFAULT_TAXI_LIMIT_MINUTES
}
fn default_min_samples() -> usize {
    MIN_SAMPLES_FOR_SIGMA
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            default_taxi_limit_minutes: DEFAULT_TAXI_LIMIT_MINUTES,
            min_samples: MIN_SAMPLES_FOR_SIGMA,
        }
    }
}

// ============================================================================
// Execution
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Resolve and measure rows on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.airport.icao, "RKSI");
        assert!(config.pipeline.parallel);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [classification]
            policy = "sigma_gated"

            [classification.thresholds]
            taxi_congested_minutes = 28.0

            [rollover]
            early_hour_limit = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.classification.policy, ClassificationPolicy::SigmaGated);
        assert_eq!(config.classification.thresholds.taxi_congested_minutes, 28.0);
        assert_eq!(config.classification.thresholds.ramp_gate_min_minutes, 15.0);
        assert_eq!(config.rollover.early_hour_limit, 3);
        assert_eq!(config.rollover.late_hour_limit, 20);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = PipelineConfig::default();
        config.statistics.min_samples = 5;
        let text = config.to_toml().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_min_samples() {
        let err = PipelineConfig::from_toml_str("[statistics]\nmin_samples = 1\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.contains("min_samples")));
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = PipelineConfig::from_toml_str("[classification]\npolicy = \"fastest\"\n");
        assert!(matches!(err, Err(ConfigError::Parse(_, _))));
    }

    #[test]
    fn test_helpers_carry_settings() {
        let mut config = PipelineConfig::default();
        config.classification.policy = ClassificationPolicy::TotalDelayPrimary;
        config.statistics.default_taxi_limit_minutes = 25.0;
        assert_eq!(config.classifier().policy, ClassificationPolicy::TotalDelayPrimary);
        assert_eq!(config.aggregator().default_taxi_limit, 25.0);
    }
}
