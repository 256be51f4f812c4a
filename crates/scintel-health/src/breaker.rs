use chrono::{DateTime, Duration, Utc};
use scintel_common::feeds::{FeedOutcome, SourceKind};
use scintel_common::text::truncate_chars;
use scintel_common::types::{BreakerState, SourceHealth, MAX_STAT_MESSAGE_CHARS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerPolicy {
    /// Consecutive failures that open a closed breaker.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Time an open breaker waits before allowing a trial call.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_secs() -> u64 {
    6 * 60 * 60
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

// One year; longer cool-downs are clamped.
const MAX_COOLDOWN_SECS: u64 = 365 * 24 * 60 * 60;

impl BreakerPolicy {
    fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs.min(MAX_COOLDOWN_SECS) as i64)
    }
}

/// Whether a source may be called this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Call,
    /// Single trial call of a half-open breaker.
    Trial,
    Skip,
}

impl Admission {
    pub fn allows_call(self) -> bool {
        !matches!(self, Admission::Skip)
    }
}

/// Persisted breaker state of one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakerRecord {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl BreakerRecord {
    /// Decide admission. An open breaker whose cool-down has elapsed moves to
    /// half-open here and grants the trial.
    pub fn admit(&mut self, policy: &BreakerPolicy, now: DateTime<Utc>) -> Admission {
        match self.state {
            BreakerState::Closed => Admission::Call,
            BreakerState::HalfOpen => Admission::Trial,
            BreakerState::Open => {
                let cooled = self
                    .opened_at
                    .map_or(true, |opened| now >= opened + policy.cooldown());
                if cooled {
                    self.state = BreakerState::HalfOpen;
                    Admission::Trial
                } else {
                    Admission::Skip
                }
            }
        }
    }

    /// Apply a connector outcome. Skipped outcomes leave the record as is.
    pub fn record(&mut self, outcome: &FeedOutcome, policy: &BreakerPolicy, now: DateTime<Utc>) {
        match outcome {
            FeedOutcome::Success | FeedOutcome::Empty => {
                self.state = BreakerState::Closed;
                self.consecutive_failures = 0;
                self.opened_at = None;
                self.last_success_at = Some(now);
                self.last_error = None;
            }
            FeedOutcome::Error { message, .. } => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.last_failure_at = Some(now);
                self.last_error = Some(truncate_chars(message, MAX_STAT_MESSAGE_CHARS));
                let trip = match self.state {
                    BreakerState::HalfOpen | BreakerState::Open => true,
                    BreakerState::Closed => {
                        self.consecutive_failures >= policy.failure_threshold.max(1)
                    }
                };
                if trip {
                    self.state = BreakerState::Open;
                    self.opened_at = Some(now);
                }
            }
            FeedOutcome::Skipped => return,
        }
        self.last_outcome = Some(outcome.label().to_string());
    }

    pub fn to_health(&self) -> SourceHealth {
        SourceHealth {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            last_outcome: self.last_outcome.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Breaker records of every source, persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakerRegistry {
    #[serde(default)]
    pub sources: BTreeMap<SourceKind, BreakerRecord>,
}

impl BreakerRegistry {
    pub fn get(&self, source: SourceKind) -> Option<&BreakerRecord> {
        self.sources.get(&source)
    }

    pub fn state(&self, source: SourceKind) -> BreakerState {
        self.get(source).map(|r| r.state).unwrap_or_default()
    }

    pub fn admit(
        &mut self,
        source: SourceKind,
        policy: &BreakerPolicy,
        now: DateTime<Utc>,
    ) -> Admission {
        self.sources.entry(source).or_default().admit(policy, now)
    }

    pub fn record(
        &mut self,
        source: SourceKind,
        outcome: &FeedOutcome,
        policy: &BreakerPolicy,
        now: DateTime<Utc>,
    ) {
        self.sources
            .entry(source)
            .or_default()
            .record(outcome, policy, now);
    }

    /// Worst state across sources: open, then half-open, then closed.
    pub fn overall_state(&self) -> BreakerState {
        self.sources
            .values()
            .map(|r| r.state)
            .max()
            .unwrap_or_default()
    }
}
