//! Batch Pipeline Module
//!
//! ## 3-Phase Batch Architecture
//!
//! ```text
//! PHASE 1: Parse + resolve + measure   (per row, parallel on rayon)
//! PHASE 2: Monthly taxi baseline       (full reduction, barrier)
//! PHASE 3: Classify                    (per row, reads baseline)
//! ```
//!
//! CRITICAL GUARANTEE: one output record per input row, in input order.
//! A malformed row degrades to unresolved timestamps and zero metrics; it
//! is still classified and emitted.

mod coordinator;

pub use coordinator::{measure_row, BatchOutput, BatchSummary, Pipeline};
