//! Shared data structures for ramp-operations delay analysis
//!
//! This module defines the types that flow through the delay pipeline:
//! - Raw input: `RawRow` / `RawValue` (column name → cell)
//! - Stage 1: `FlightRow` → `MeasuredFlight` (resolved timestamps + metrics)
//! - Stage 3: `FlightRecord` (classified output)

mod raw;
mod flight;
mod record;
mod thresholds;

pub use raw::*;
pub use flight::*;
pub use record::*;
pub use thresholds::*;
