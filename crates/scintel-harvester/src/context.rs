use crate::config::Config;
use chrono::{DateTime, Utc};
use scintel_common::types::Snapshot;
use scintel_health::HealthTracker;
use scintel_risk::RiskThresholds;
use scintel_sources::FetchContext;

/// Everything one run reads and accumulates, passed explicitly from stage
/// to stage.
#[derive(Debug)]
pub struct RunContext<'a> {
    pub config: &'a Config,
    /// Reference time for every rule and timestamp of the run.
    pub now: DateTime<Utc>,
    /// The snapshot currently on disk, if any.
    pub previous: Option<Snapshot>,
    pub tracker: HealthTracker,
}

impl<'a> RunContext<'a> {
    pub fn new(
        config: &'a Config,
        now: DateTime<Utc>,
        previous: Option<Snapshot>,
        tracker: HealthTracker,
    ) -> Self {
        Self {
            config,
            now,
            previous,
            tracker,
        }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.config.thresholds
    }

    pub fn fetch_context(&self) -> FetchContext {
        FetchContext::new(self.now)
    }

    pub fn next_version(&self) -> u64 {
        self.previous.as_ref().map_or(1, |p| p.version + 1)
    }

    /// Last published FX rate, used as the reference when the window holds a
    /// single observation.
    pub fn previous_fx_rate(&self) -> Option<f64> {
        self.previous
            .as_ref()?
            .macro_pillar
            .data
            .as_ref()?
            .current_rate
    }
}
