use crate::breaker::{Admission, BreakerPolicy, BreakerRegistry};
use crate::tracker::HealthTracker;
use chrono::{DateTime, Duration, TimeZone, Utc};
use scintel_common::feeds::{
    FailureClass, FeedOutcome, FeedRecords, FxObservation, RawFeedResult, SourceKind,
};
use scintel_common::types::{BreakerState, PillarKind, PillarStatus};
use std::collections::BTreeMap;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 10, 0, 0, 0).unwrap()
}

fn error(source: SourceKind, at: DateTime<Utc>) -> RawFeedResult {
    RawFeedResult::error(source, FailureClass::Transient, "HTTP 503: busy", 2, at)
}

fn success(source: SourceKind, at: DateTime<Utc>) -> RawFeedResult {
    let records = FeedRecords::FxRates(vec![FxObservation {
        date: Some(at.date_naive()),
        rate: Some(1.08),
    }]);
    let result = RawFeedResult::success(source, records, 1, at);
    assert_eq!(result.outcome, FeedOutcome::Success);
    result
}

fn tracker_at(at: DateTime<Utc>) -> HealthTracker {
    HealthTracker::new(BreakerRegistry::default(), BreakerPolicy::default(), at)
}

/// Simulate one run of one source through a fresh tracker.
fn run_once(
    registry: BreakerRegistry,
    source: SourceKind,
    at: DateTime<Utc>,
    fails: bool,
) -> (Admission, BreakerRegistry) {
    let mut tracker = HealthTracker::new(registry, BreakerPolicy::default(), at);
    let admission = tracker.admit(source, at);
    let result = match (admission, fails) {
        (Admission::Skip, _) => RawFeedResult::skipped(source, at),
        (_, true) => error(source, at),
        (_, false) => success(source, at),
    };
    tracker.record(&result);
    let (_, registry) = tracker.finish(at);
    (admission, registry)
}

#[test]
fn breaker_opens_after_three_consecutive_failures() {
    let src = SourceKind::SecEdgar;
    let mut registry = BreakerRegistry::default();
    for hour in 0..2 {
        let (admission, next) = run_once(registry, src, t0() + Duration::hours(hour), true);
        assert_eq!(admission, Admission::Call);
        registry = next;
        assert_eq!(registry.state(src), BreakerState::Closed);
    }
    let (_, registry) = run_once(registry, src, t0() + Duration::hours(2), true);
    assert_eq!(registry.state(src), BreakerState::Open);
    assert_eq!(registry.get(src).unwrap().consecutive_failures, 3);

    // Within the cool-down the source is skipped and the record is untouched.
    let (admission, registry) = run_once(registry, src, t0() + Duration::hours(3), false);
    assert_eq!(admission, Admission::Skip);
    assert_eq!(registry.state(src), BreakerState::Open);
}

#[test]
fn success_resets_failure_count() {
    let src = SourceKind::EcbFx;
    let (_, registry) = run_once(BreakerRegistry::default(), src, t0(), true);
    let (_, registry) = run_once(registry, src, t0() + Duration::hours(1), true);
    let (_, registry) = run_once(registry, src, t0() + Duration::hours(2), false);
    assert_eq!(registry.get(src).unwrap().consecutive_failures, 0);
    let (_, registry) = run_once(registry, src, t0() + Duration::hours(3), true);
    assert_eq!(registry.state(src), BreakerState::Closed);
}

#[test]
fn half_open_trial_success_closes_breaker() {
    let src = SourceKind::CisaKev;
    let policy = BreakerPolicy::default();
    let mut registry = BreakerRegistry::default();
    for hour in 0..3 {
        let (_, next) = run_once(registry, src, t0() + Duration::hours(hour), true);
        registry = next;
    }
    let opened = t0() + Duration::hours(2);

    let after_cooldown = opened + Duration::seconds(policy.cooldown_secs as i64);
    let (admission, registry) = run_once(registry, src, after_cooldown, false);
    assert_eq!(admission, Admission::Trial);
    assert_eq!(registry.state(src), BreakerState::Closed);
    assert_eq!(registry.get(src).unwrap().consecutive_failures, 0);
}

#[test]
fn half_open_trial_failure_reopens_with_fresh_cooldown() {
    let src = SourceKind::CisaKev;
    let policy = BreakerPolicy::default();
    let cooldown = Duration::seconds(policy.cooldown_secs as i64);
    let mut registry = BreakerRegistry::default();
    for hour in 0..3 {
        let (_, next) = run_once(registry, src, t0() + Duration::hours(hour), true);
        registry = next;
    }
    let opened = t0() + Duration::hours(2);

    let trial_at = opened + cooldown + Duration::minutes(5);
    let (admission, registry) = run_once(registry, src, trial_at, true);
    assert_eq!(admission, Admission::Trial);
    assert_eq!(registry.state(src), BreakerState::Open);
    assert_eq!(registry.get(src).unwrap().opened_at, Some(trial_at));

    // The old cool-down would have elapsed; the fresh one has not.
    let before_cooldown = trial_at + cooldown - Duration::minutes(1);
    let (admission, registry) = run_once(registry, src, before_cooldown, false);
    assert_eq!(admission, Admission::Skip);
    let (admission, _) = run_once(registry, src, trial_at + cooldown, false);
    assert_eq!(admission, Admission::Trial);
}

#[test]
fn half_open_admits_exactly_one_trial_per_run() {
    let src = SourceKind::FdaRecalls;
    let policy = BreakerPolicy::default();
    let mut registry = BreakerRegistry::default();
    for hour in 0..3 {
        let (_, next) = run_once(registry, src, t0() + Duration::hours(hour), true);
        registry = next;
    }
    let later = t0() + Duration::days(2);
    assert_eq!(registry.admit(src, &policy, later), Admission::Trial);
    assert_eq!(registry.state(src), BreakerState::HalfOpen);
    assert_eq!(registry.overall_state(), BreakerState::HalfOpen);
}

#[test]
fn empty_result_is_not_a_failure() {
    let src = SourceKind::OfacSanctions;
    let mut tracker = tracker_at(t0());
    for _ in 0..5 {
        tracker.admit(src, t0());
        tracker.record(&RawFeedResult::success(src, FeedRecords::Sanctions(vec![]), 1, t0()));
    }
    assert_eq!(tracker.overall_state(), BreakerState::Closed);
    assert_eq!(tracker.stats().total_warnings, 5);
    assert_eq!(tracker.stats().total_errors, 0);
}

#[test]
fn every_outcome_appends_exactly_one_stat_record() {
    let mut tracker = tracker_at(t0());
    tracker.record(&success(SourceKind::CisaKev, t0()));
    tracker.record(&error(SourceKind::EcbFx, t0()));
    let empty =
        RawFeedResult::success(SourceKind::FdaRecalls, FeedRecords::Recalls(vec![]), 1, t0());
    assert_eq!(empty.outcome, FeedOutcome::Empty);
    tracker.record(&empty);
    tracker.record(&RawFeedResult::skipped(SourceKind::SecEdgar, t0()));

    let stats = tracker.stats();
    assert_eq!(stats.outcome_count(), 4);
    assert_eq!(stats.total_successes, 1);
    assert_eq!(stats.total_errors, 1);
    assert_eq!(stats.total_warnings, 2);
    assert!(stats.errors[0].message.contains("HTTP 503"));
}

#[test]
fn alert_summary_flags_critical_sources_and_error_volume() {
    let mut tracker = tracker_at(t0());
    tracker.record(&error(SourceKind::FdaRecalls, t0()));
    tracker.record(&error(SourceKind::MarketQuotes, t0()));
    assert!(!tracker.alert_summary().should_alert);

    tracker.record(&error(SourceKind::OfacSanctions, t0()));
    let summary = tracker.alert_summary();
    assert!(summary.should_alert);
    assert!(summary.failed_critical_sources.is_empty());

    let mut tracker = tracker_at(t0());
    tracker.record(&error(SourceKind::EcbFx, t0()));
    let summary = tracker.alert_summary();
    assert!(summary.should_alert);
    assert_eq!(summary.failed_critical_sources, vec!["ecb_fx".to_string()]);
}

#[test]
fn health_status_reports_worst_breaker_state() {
    let mut registry = BreakerRegistry::default();
    let policy = BreakerPolicy::default();
    for _ in 0..3 {
        registry.record(
            SourceKind::MarketQuotes,
            &error(SourceKind::MarketQuotes, t0()).outcome,
            &policy,
            t0(),
        );
    }
    let ok = success(SourceKind::CisaKev, t0());
    registry.record(SourceKind::CisaKev, &ok.outcome, &policy, t0());

    let tracker = HealthTracker::new(registry, policy, t0());
    let pillars: BTreeMap<_, _> = [
        (PillarKind::Macro, PillarStatus::Success),
        (PillarKind::Peers, PillarStatus::Partial),
        (PillarKind::Suppliers, PillarStatus::Success),
    ]
    .into_iter()
    .collect();
    let health = tracker.health_status(pillars);

    assert_eq!(health.circuit_breaker_state, BreakerState::Open);
    assert_eq!(health.sources["market_quotes"].state, BreakerState::Open);
    assert_eq!(health.sources["market_quotes"].consecutive_failures, 3);
    assert_eq!(health.sources["cisa_kev"].state, BreakerState::Closed);
}

#[test]
fn registry_round_trips_through_json() {
    let mut registry = BreakerRegistry::default();
    registry.record(
        SourceKind::SecEdgar,
        &error(SourceKind::SecEdgar, t0()).outcome,
        &BreakerPolicy::default(),
        t0(),
    );
    let json = serde_json::to_string(&registry).unwrap();
    assert!(json.contains("\"sec_edgar\""));
    let back: BreakerRegistry = serde_json::from_str(&json).unwrap();
    assert_eq!(back, registry);
}
