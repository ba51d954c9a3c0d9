//! Pipeline Configuration Module
//!
//! Classification thresholds, the active policy, baseline settings and the
//! midnight rollover window, loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `RAMP_DELAY_CONFIG` environment variable (path to TOML file)
//! 2. `ramp_delay.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(PipelineConfig::load());
//!
//! // Anywhere in the codebase:
//! let limit = config::get().statistics.default_taxi_limit_minutes;
//! ```
//!
//! Library code never requires `init()`: components take their settings
//! explicitly and only consult the global for defaults.

mod pipeline_config;
pub mod defaults;
pub mod validation;

pub use pipeline_config::*;

use std::sync::OnceLock;

/// Global pipeline configuration, initialized once at startup.
static PIPELINE_CONFIG: OnceLock<PipelineConfig> = OnceLock::new();

/// Built-in defaults served by `get()` until `init()` runs.
static DEFAULT_CONFIG: OnceLock<PipelineConfig> = OnceLock::new();

/// Initialize the global pipeline configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: PipelineConfig) {
    if PIPELINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global pipeline configuration.
///
/// Falls back to built-in defaults when `init()` has not been called. The
/// fallback is never stored as the global, so a later `init()` still takes
/// effect.
pub fn get() -> &'static PipelineConfig {
    PIPELINE_CONFIG
        .get()
        .unwrap_or_else(|| DEFAULT_CONFIG.get_or_init(PipelineConfig::default))
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    PIPELINE_CONFIG.get().is_some()
}
