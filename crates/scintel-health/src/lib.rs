//! Per-source circuit breakers and the per-run outcome tally.
//!
//! [`breaker`] holds the persisted breaker state machine; [`tracker`] wraps
//! it for one run and records every connector outcome into
//! [`HarvestStats`](scintel_common::types::HarvestStats).

pub mod breaker;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use breaker::{Admission, BreakerPolicy, BreakerRecord, BreakerRegistry};
pub use tracker::{AlertSummary, HealthTracker};
