//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `PipelineConfig`.
///
/// Maintained by hand to match the struct hierarchy in pipeline_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [airport]
        "airport",
        "airport.name",
        "airport.icao",
        // [classification]
        "classification",
        "classification.policy",
        // [classification.thresholds]
        "classification.thresholds",
        "classification.thresholds.ramp_normal_max_minutes",
        "classification.thresholds.taxi_normal_max_minutes",
        "classification.thresholds.ramp_gate_min_minutes",
        "classification.thresholds.taxi_congested_minutes",
        "classification.thresholds.unavoidable_taxi_minutes",
        "classification.thresholds.total_delay_normal_max_minutes",
        // [statistics]
        "statistics",
        "statistics.default_taxi_limit_minutes",
        "statistics.min_samples",
        // [rollover]
        "rollover",
        "rollover.early_hour_limit",
        "rollover.late_hour_limit",
        // [pipeline]
        "pipeline",
        "pipeline.parallel",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed `PipelineConfig`.
///
/// Returns (errors, warnings). Errors are values the pipeline cannot work
/// with; warnings are legal but unusual.
pub fn validate_ranges(config: &super::PipelineConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (name, value) in config.classification.thresholds.named_values() {
        if !value.is_finite() {
            errors.push(format!("classification.thresholds.{name} must be finite (got {value})"));
        } else if value < 0.0 {
            errors.push(format!("classification.thresholds.{name} = {value:.1} cannot be negative"));
        } else if value > 240.0 {
            warnings.push(ValidationWarning {
                field: format!("classification.thresholds.{name}"),
                message: format!("{name} = {value:.1} min is unusually large (> 4 h)"),
                suggestion: None,
            });
        }
    }

    let t = &config.classification.thresholds;
    if t.unavoidable_taxi_minutes > t.taxi_congested_minutes {
        warnings.push(ValidationWarning {
            field: "classification.thresholds.unavoidable_taxi_minutes".to_string(),
            message: format!(
                "unavoidable_taxi_minutes ({:.1}) exceeds taxi_congested_minutes ({:.1}); \
                 congested flights will always be attributed to the gate",
                t.unavoidable_taxi_minutes, t.taxi_congested_minutes
            ),
            suggestion: None,
        });
    }

    let s = &config.statistics;
    if !s.default_taxi_limit_minutes.is_finite() || s.default_taxi_limit_minutes <= 0.0 {
        errors.push(format!(
            "statistics.default_taxi_limit_minutes = {} must be a positive number",
            s.default_taxi_limit_minutes
        ));
    }
    if s.min_samples < 2 {
        errors.push(format!(
            "statistics.min_samples = {} must be >= 2 (standard deviation needs two samples)",
            s.min_samples
        ));
    }

    let r = &config.rollover;
    if r.early_hour_limit > 23 || r.late_hour_limit > 23 {
        errors.push(format!(
            "rollover hours must be within 0-23 (early={}, late={})",
            r.early_hour_limit, r.late_hour_limit
        ));
    }
    if r.early_hour_limit >= r.late_hour_limit {
        errors.push(format!(
            "rollover.early_hour_limit ({}) must be < late_hour_limit ({})",
            r.early_hour_limit, r.late_hour_limit
        ));
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
