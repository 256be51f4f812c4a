use crate::assembler;
use crate::config::Config;
use crate::connectors::{self, ConnectorPlan};
use crate::context::RunContext;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scintel_common::feeds::{FailureClass, RawFeedResult, SourceKind};
use scintel_common::types::{HarvestStats, Snapshot};
use scintel_health::{Admission, AlertSummary, HealthTracker};
use scintel_sources::{SourceCollector, SourceConnector};
use scintel_storage::{BreakerStore, SnapshotStore, SnapshotWriter, WriteOutcome};
use std::sync::Arc;
use std::time::Instant;

/// What a run left behind.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: WriteOutcome,
    pub alert: AlertSummary,
    pub stats: HarvestStats,
}

pub struct Harvester {
    config: Config,
}

impl Harvester {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// One harvest against the live feeds.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let plan = connectors::build(&self.config);
        self.run_with(plan, now).await
    }

    /// One harvest with the given connectors.
    ///
    /// Only persistence failures are returned as errors; every feed failure
    /// ends up in the snapshot and the stats instead.
    pub async fn run_with(&self, plan: ConnectorPlan, now: DateTime<Utc>) -> Result<RunReport> {
        let started = Instant::now();
        let snapshot_store = SnapshotStore::new(self.config.snapshot_path());
        let breaker_store = BreakerStore::new(self.config.breaker_path());

        let previous = load_previous(&snapshot_store);
        let tracker = HealthTracker::new(breaker_store.load(), self.config.breaker.clone(), now);
        let mut ctx = RunContext::new(&self.config, now, previous, tracker);

        tracing::info!(
            version = ctx.next_version(),
            sources = plan.sources().len(),
            "Harvest started"
        );

        let results = self.fetch(&mut ctx, plan).await;
        for result in &results {
            ctx.tracker.record(result);
        }

        let mut snapshot = assembler::assemble(&ctx, &results);
        let alert = ctx.tracker.alert_summary();
        let RunContext {
            previous, tracker, ..
        } = ctx;

        let elapsed = chrono::Duration::from_std(started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        let (stats, breakers) = tracker.finish(now + elapsed);
        snapshot.harvest_stats = Some(stats.clone());
        log_pillars(&snapshot);

        let writer = SnapshotWriter::new(snapshot_store);
        let written = writer.write(snapshot, previous.as_ref());
        // Breaker state is saved even when publishing failed.
        let saved = breaker_store.save(&breakers).with_context(|| {
            format!("Failed to save breaker state to {}", breaker_store.path().display())
        });
        let outcome = written.with_context(|| {
            format!("Failed to publish snapshot to {}", writer.store().path().display())
        })?;
        saved?;

        if alert.should_alert {
            tracing::warn!(
                errors = alert.total_errors,
                critical_sources = ?alert.failed_critical_sources,
                "Harvest needs attention"
            );
        }
        tracing::info!(
            outcome = %outcome,
            successes = stats.total_successes,
            warnings = stats.total_warnings,
            errors = stats.total_errors,
            duration_secs = stats.duration_seconds,
            "Harvest finished"
        );

        Ok(RunReport {
            outcome,
            alert,
            stats,
        })
    }

    /// Ask the breakers which sources may be called, fetch those, and
    /// synthesize results for the rest. One result per planned source.
    async fn fetch(&self, ctx: &mut RunContext<'_>, plan: ConnectorPlan) -> Vec<RawFeedResult> {
        let now = ctx.now;
        let mut results = Vec::new();
        let mut to_call: Vec<Arc<dyn SourceConnector>> = Vec::new();

        for connector in plan.connectors {
            let source = connector.source();
            match ctx.tracker.admit(source, now) {
                Admission::Skip => results.push(RawFeedResult::skipped(source, now)),
                Admission::Call | Admission::Trial => to_call.push(connector),
            }
        }
        for (source, reason) in plan.misconfigured {
            results.push(misconfigured(ctx, source, reason));
        }

        let collector = SourceCollector::new(
            self.config.http.concurrency,
            self.config.http.connector_deadline(),
        );
        results.extend(collector.collect_all(to_call, &ctx.fetch_context()).await);
        results.sort_by_key(|r| r.source);
        results
    }
}

fn misconfigured(ctx: &mut RunContext<'_>, source: SourceKind, reason: String) -> RawFeedResult {
    match ctx.tracker.admit(source, ctx.now) {
        Admission::Skip => RawFeedResult::skipped(source, ctx.now),
        _ => RawFeedResult::error(source, FailureClass::Permanent, reason, 0, ctx.now),
    }
}

/// An unreadable snapshot is treated as absent; the next publish replaces
/// it and the backup keeps the unreadable copy.
fn load_previous(store: &SnapshotStore) -> Option<Snapshot> {
    match store.load() {
        Ok(previous) => previous,
        Err(e) => {
            tracing::error!(error = %e, "Ignoring unreadable previous snapshot");
            None
        }
    }
}

fn log_pillars(snapshot: &Snapshot) {
    tracing::info!(
        status = %snapshot.status,
        macro_status = %snapshot.macro_pillar.status,
        macro_rag = %snapshot.macro_pillar.rag_score,
        peers_status = %snapshot.peers.status,
        peers_rag = %snapshot.peers.rag_score,
        suppliers_status = %snapshot.suppliers.status,
        suppliers_rag = %snapshot.suppliers.rag_score,
        "Snapshot assembled"
    );
}
