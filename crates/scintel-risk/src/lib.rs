//! Risk classification rules.
//!
//! Every rule is a pure function of the run's facts, a [`RiskThresholds`]
//! value and the run's reference time. Nothing here performs I/O or keeps
//! state between calls, so the same inputs always yield the same scores.

pub mod rules;
pub mod thresholds;


pub use thresholds::RiskThresholds;
