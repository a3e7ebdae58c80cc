//! Estimate aggregation.
//!
//! Turns raw per-ticket estimates into risk-adjusted upper bounds and
//! per-objective point and sprint ranges.

pub mod engine;
pub mod error;

pub use engine::*;
pub use error::EstimateError;
