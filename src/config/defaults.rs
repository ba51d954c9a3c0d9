//! System-wide default constants.
//!
//! Centralises names and numbers shared by the config loader and the
//! command-line adapter. Classification thresholds live in
//! `types::thresholds::delay_thresholds`.

// ============================================================================
// Config Discovery
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "RAMP_DELAY_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "ramp_delay.toml";

// ============================================================================
// Airport
// ============================================================================

pub const DEFAULT_AIRPORT_NAME: &str = "Incheon International";

pub const DEFAULT_AIRPORT_ICAO: &str = "RKSI";

// ============================================================================
// Logging
// ============================================================================

/// `EnvFilter` directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// Reporting
// ============================================================================

/// Hour buckets in a daily profile.
pub const HOURS_PER_DAY: usize = 24;
