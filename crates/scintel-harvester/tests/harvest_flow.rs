use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use scintel_common::feeds::*;
use scintel_common::types::{BreakerState, PillarStatus, SnapshotStatus};
use scintel_harvester::{Config, ConnectorPlan, Harvester};
use scintel_sources::{FetchContext, SourceConnector};
use scintel_storage::{BreakerStore, SnapshotStore, WriteOutcome};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 10, 6, 0, 0).unwrap()
}

fn date(at: DateTime<Utc>, days_back: i64) -> Option<NaiveDate> {
    Some((at - Duration::days(days_back)).date_naive())
}

struct MockConnector {
    source: SourceKind,
    fail: bool,
    calls: Arc<AtomicU32>,
}

impl MockConnector {
    fn new(source: SourceKind, fail: bool, calls: Arc<AtomicU32>) -> Self {
        Self {
            source,
            fail,
            calls,
        }
    }

    fn records(&self, now: DateTime<Utc>) -> FeedRecords {
        match self.source {
            SourceKind::CisaKev => FeedRecords::Vulnerabilities(vec![Vulnerability {
                cve_id: "CVE-2024-0001".into(),
                vendor_project: "Acme".into(),
                product: "Router".into(),
                vulnerability_name: "Acme Router Command Injection".into(),
                date_added: date(now, 30),
                known_ransomware: false,
            }]),
            SourceKind::EcbFx => FeedRecords::FxRates(vec![
                FxObservation {
                    date: date(now, 2),
                    rate: Some(1.0800),
                },
                FxObservation {
                    date: date(now, 1),
                    rate: Some(1.0805),
                },
            ]),
            SourceKind::SecEdgar => FeedRecords::Filings(vec![CompanyFilings {
                cik: "0001413329".into(),
                company: "Philip Morris Int.".into(),
                filings: vec![],
                fetch_error: None,
            }]),
            SourceKind::OfacSanctions => FeedRecords::Sanctions(vec![SanctionEntry {
                name: "UNRELATED TRADING LLC".into(),
                entity_type: "entity".into(),
                programs: "SDGT".into(),
            }]),
            SourceKind::FdaRecalls => FeedRecords::Recalls(vec![RecallNotice {
                recalling_firm: "Fresh Farms Inc".into(),
                reason: "Undeclared milk".into(),
                classification: "Class II".into(),
                report_date: date(now, 3),
            }]),
            SourceKind::MarketQuotes => FeedRecords::Quotes(vec![MarketQuote {
                ticker: "JBL".into(),
                last_close: Some(99.0),
                previous_close: Some(100.0),
            }]),
        }
    }
}

#[async_trait]
impl SourceConnector for MockConnector {
    fn source(&self) -> SourceKind {
        self.source
    }

    async fn fetch(&self, ctx: &FetchContext) -> RawFeedResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            RawFeedResult::error(self.source, FailureClass::Transient, "HTTP 503: busy", 2, ctx.now)
        } else {
            RawFeedResult::success(self.source, self.records(ctx.now), 1, ctx.now)
        }
    }
}

struct Fixture {
    _dir: TempDir,
    harvester: Harvester,
    calls: Arc<AtomicU32>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: dir.path().to_string_lossy().into_owned(),
            ..Config::default()
        };
        Self {
            _dir: dir,
            harvester: Harvester::new(config),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Every source, failing where `failing` says so.
    fn plan(&self, failing: impl Fn(SourceKind) -> bool) -> ConnectorPlan {
        ConnectorPlan::from_connectors(
            SourceKind::ALL
                .into_iter()
                .map(|s| {
                    Arc::new(MockConnector::new(s, failing(s), Arc::clone(&self.calls)))
                        as Arc<dyn SourceConnector>
                })
                .collect(),
        )
    }

    async fn run(&self, failing: impl Fn(SourceKind) -> bool, at: DateTime<Utc>) -> WriteOutcome {
        self.harvester
            .run_with(self.plan(failing), at)
            .await
            .unwrap()
            .outcome
    }

    fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::new(self.harvester.config().snapshot_path())
    }

    fn breaker_store(&self) -> BreakerStore {
        BreakerStore::new(self.harvester.config().breaker_path())
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

fn all_ok(_: SourceKind) -> bool {
    false
}

fn all_fail(_: SourceKind) -> bool {
    true
}

#[tokio::test]
async fn healthy_run_publishes_first_version() {
    let fx = Fixture::new();
    let outcome = fx.run(all_ok, t0()).await;
    assert_eq!(
        outcome,
        WriteOutcome::Published {
            version: 1,
            status: SnapshotStatus::Healthy
        }
    );
    assert_eq!(fx.calls(), SourceKind::ALL.len() as u32);

    let snapshot = fx.snapshot_store().load().unwrap().unwrap();
    let stats = snapshot.harvest_stats.as_ref().unwrap();
    assert_eq!(stats.outcome_count(), SourceKind::ALL.len());
    assert_eq!(stats.total_successes, SourceKind::ALL.len());
    assert_eq!(snapshot.supplier_watchlist.len(), 24);
    assert!(snapshot.content_hash.is_some());
}

#[tokio::test]
async fn total_failure_keeps_snapshot_byte_identical() {
    let fx = Fixture::new();
    fx.run(all_ok, t0()).await;
    let before = std::fs::read(fx.snapshot_store().path()).unwrap();

    let outcome = fx.run(all_fail, t0() + Duration::hours(4)).await;
    assert_eq!(outcome, WriteOutcome::PreservedPrevious { version: 1 });
    assert_eq!(std::fs::read(fx.snapshot_store().path()).unwrap(), before);
}

#[tokio::test]
async fn two_failed_runs_still_report_last_good_update() {
    let fx = Fixture::new();
    fx.run(all_ok, t0()).await;

    fx.run(all_fail, t0() + Duration::hours(4)).await;
    fx.run(all_fail, t0() + Duration::hours(8)).await;

    let snapshot = fx.snapshot_store().load().unwrap().unwrap();
    assert_eq!(snapshot.last_updated, t0());
    assert_eq!(snapshot.version, 1);
}

#[tokio::test]
async fn version_never_decreases_across_mixed_runs() {
    let fx = Fixture::new();
    let mut last = 0;
    let plans: [fn(SourceKind) -> bool; 5] = [
        all_ok,
        |s| s == SourceKind::SecEdgar,
        all_fail,
        |s| s != SourceKind::EcbFx,
        all_ok,
    ];
    for (i, failing) in plans.into_iter().enumerate() {
        fx.run(failing, t0() + Duration::hours(4 * i as i64)).await;
        let version = fx.snapshot_store().load().unwrap().unwrap().version;
        assert!(version >= last, "version went from {last} to {version}");
        last = version;
    }
    assert_eq!(last, 4);
}

#[tokio::test]
async fn failed_pillar_is_served_from_previous_snapshot() {
    let fx = Fixture::new();
    fx.run(all_ok, t0()).await;

    let outcome = fx
        .run(|s| s == SourceKind::SecEdgar, t0() + Duration::hours(4))
        .await;
    assert_eq!(
        outcome,
        WriteOutcome::Published {
            version: 2,
            status: SnapshotStatus::Fallback
        }
    );

    let snapshot = fx.snapshot_store().load().unwrap().unwrap();
    assert_eq!(snapshot.peers.status, PillarStatus::Fallback);
    assert_eq!(snapshot.peers.carried_from_version, Some(1));
    assert_eq!(snapshot.peers.last_fetched, t0());
    assert!(snapshot.peers.data.is_some());
    assert_eq!(snapshot.macro_pillar.status, PillarStatus::Success);

    let backup = std::fs::read_to_string(fx.snapshot_store().backup_path()).unwrap();
    assert!(backup.contains("\"version\": 1"));
}

#[tokio::test]
async fn breaker_opens_after_three_failures_and_skips_source() {
    let fx = Fixture::new();
    let ecb_fails = |s: SourceKind| s == SourceKind::EcbFx;

    for hour in 0..3 {
        fx.run(ecb_fails, t0() + Duration::hours(hour)).await;
    }
    let breakers = fx.breaker_store().load();
    assert_eq!(breakers.state(SourceKind::EcbFx), BreakerState::Open);
    assert_eq!(breakers.state(SourceKind::CisaKev), BreakerState::Closed);

    let before = fx.calls();
    fx.run(all_ok, t0() + Duration::hours(3)).await;
    // Every source but the open one was called.
    assert_eq!(fx.calls() - before, SourceKind::ALL.len() as u32 - 1);

    let snapshot = fx.snapshot_store().load().unwrap().unwrap();
    assert_eq!(snapshot.macro_pillar.status, PillarStatus::Skipped);
    let health = snapshot.health.as_ref().unwrap();
    assert_eq!(health.circuit_breaker_state, BreakerState::Open);
    assert_eq!(health.sources["ecb_fx"].consecutive_failures, 3);

    // After the cool-down one trial is allowed and closes the breaker.
    fx.run(all_ok, t0() + Duration::hours(2) + Duration::hours(6)).await;
    assert_eq!(fx.breaker_store().load().state(SourceKind::EcbFx), BreakerState::Closed);
}

#[tokio::test]
async fn misconfigured_source_is_reported_not_fatal() {
    let fx = Fixture::new();
    let mut plan = fx.plan(all_ok);
    plan.connectors.retain(|c| c.source() != SourceKind::SecEdgar);
    plan.misconfigured
        .push((SourceKind::SecEdgar, "configuration error: invalid CIK".into()));

    let report = fx.harvester.run_with(plan, t0()).await.unwrap();
    assert!(report.alert.should_alert);
    assert_eq!(report.alert.failed_critical_sources, vec!["sec_edgar".to_string()]);
    assert_eq!(report.stats.total_errors, 1);
    assert!(matches!(report.outcome, WriteOutcome::Published { .. }));
}
