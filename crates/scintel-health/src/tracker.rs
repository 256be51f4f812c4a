use crate::breaker::{Admission, BreakerPolicy, BreakerRegistry};
use chrono::{DateTime, Utc};
use scintel_common::feeds::{FeedOutcome, RawFeedResult, SourceKind};
use scintel_common::types::{BreakerState, HarvestStats, HealthStatus, PillarKind, PillarStatus};
use std::collections::BTreeMap;

/// Sources whose failure is alert-worthy on its own.
pub const CRITICAL_SOURCES: [SourceKind; 3] =
    [SourceKind::CisaKev, SourceKind::SecEdgar, SourceKind::EcbFx];

/// Error count at which a run is alert-worthy regardless of source.
pub const ALERT_ERROR_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct AlertSummary {
    pub should_alert: bool,
    pub total_errors: usize,
    pub failed_critical_sources: Vec<String>,
}

/// Health bookkeeping for a single run.
///
/// Owns the breaker registry loaded at run start and the run's
/// [`HarvestStats`]; both are handed back by [`HealthTracker::finish`].
#[derive(Debug)]
pub struct HealthTracker {
    policy: BreakerPolicy,
    breakers: BreakerRegistry,
    stats: HarvestStats,
}

impl HealthTracker {
    pub fn new(
        breakers: BreakerRegistry,
        policy: BreakerPolicy,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            policy,
            breakers,
            stats: HarvestStats::new(started_at),
        }
    }

    pub fn admit(&mut self, source: SourceKind, now: DateTime<Utc>) -> Admission {
        let before = self.breakers.state(source);
        let admission = self.breakers.admit(source, &self.policy, now);
        match admission {
            Admission::Call => {}
            Admission::Trial => tracing::info!(
                source = %source,
                from = %before,
                "Circuit half-open, allowing one trial fetch"
            ),
            Admission::Skip => {
                tracing::warn!(source = %source, "Circuit open, skipping source")
            }
        }
        admission
    }

    /// Record one connector outcome: exactly one stats entry, plus the
    /// breaker update.
    pub fn record(&mut self, result: &RawFeedResult) {
        let source = result.source;
        let name = source.as_str();
        let at = result.fetched_at;

        match &result.outcome {
            FeedOutcome::Success => self.stats.record_success(name, at),
            FeedOutcome::Empty => {
                self.stats
                    .record_warning(name, "source returned no records", at)
            }
            FeedOutcome::Error { class, message } => {
                self.stats
                    .record_error(name, &format!("{class}: {message}"), at)
            }
            FeedOutcome::Skipped => {
                self.stats
                    .record_warning(name, "circuit breaker open, source skipped", at)
            }
        }

        let before = self.breakers.state(source);
        self.breakers
            .record(source, &result.outcome, &self.policy, result.fetched_at);
        let after = self.breakers.state(source);

        if before != after {
            let failures = self
                .breakers
                .get(source)
                .map(|r| r.consecutive_failures)
                .unwrap_or(0);
            match after {
                BreakerState::Open => tracing::warn!(
                    source = %source,
                    from = %before,
                    failures,
                    "Circuit opened"
                ),
                _ => tracing::info!(
                    source = %source,
                    from = %before,
                    to = %after,
                    "Circuit state changed"
                ),
            }
        }
    }

    pub fn overall_state(&self) -> BreakerState {
        self.breakers.overall_state()
    }

    pub fn stats(&self) -> &HarvestStats {
        &self.stats
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Errors are alert-worthy at [`ALERT_ERROR_THRESHOLD`] or when any
    /// critical source failed.
    pub fn alert_summary(&self) -> AlertSummary {
        let mut failed_critical_sources: Vec<String> = self
            .stats
            .errors
            .iter()
            .filter(|e| CRITICAL_SOURCES.iter().any(|s| s.as_str() == e.source))
            .map(|e| e.source.clone())
            .collect();
        failed_critical_sources.dedup();

        AlertSummary {
            should_alert: self.stats.total_errors >= ALERT_ERROR_THRESHOLD
                || !failed_critical_sources.is_empty(),
            total_errors: self.stats.total_errors,
            failed_critical_sources,
        }
    }

    pub fn health_status(&self, pillars: BTreeMap<PillarKind, PillarStatus>) -> HealthStatus {
        HealthStatus {
            pillars,
            sources: self
                .breakers
                .sources
                .iter()
                .map(|(source, record)| (source.as_str().to_string(), record.to_health()))
                .collect(),
            errors_count: self.stats.total_errors,
            warnings_count: self.stats.total_warnings,
            circuit_breaker_state: self.overall_state(),
        }
    }

    /// Close the run's stats and release the registry for persistence.
    pub fn finish(mut self, finished_at: DateTime<Utc>) -> (HarvestStats, BreakerRegistry) {
        self.stats.finish(finished_at);
        (self.stats, self.breakers)
    }
}
