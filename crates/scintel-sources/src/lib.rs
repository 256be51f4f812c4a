pub mod collector;
pub mod ecb;
pub mod edgar;
pub mod error;
pub mod http;
pub mod kev;
pub mod market;
pub mod recalls;
pub mod sanctions;

use chrono::{DateTime, Utc};
use scintel_common::feeds::{FeedRecords, RawFeedResult, SourceKind};

pub use collector::SourceCollector;
pub use http::{Attempted, FeedClient, HttpSettings};

/// Per-run inputs handed to every connector.
#[derive(Debug, Clone)]
pub struct FetchContext {
    /// Reference time of the run; stamped on every result.
    pub now: DateTime<Utc>,
}

impl FetchContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

/// A single external feed.
///
/// Implementations must not panic or propagate errors: every failure is
/// folded into the returned [`RawFeedResult`].
#[async_trait::async_trait]
pub trait SourceConnector: Send + Sync {
    fn source(&self) -> SourceKind;

    async fn fetch(&self, ctx: &FetchContext) -> RawFeedResult;
}

/// Fold a connector's attempted fetch into its explicit result value.
pub(crate) fn into_feed_result(
    source: SourceKind,
    attempted: Attempted<FeedRecords>,
    now: DateTime<Utc>,
) -> RawFeedResult {
    match attempted.result {
        Ok(records) => {
            tracing::info!(
                source = %source,
                records = records.len(),
                attempts = attempted.attempts,
                "Feed fetched"
            );
            RawFeedResult::success(source, records, attempted.attempts, now)
        }
        Err(e) => {
            tracing::warn!(
                source = %source,
                class = %e.class(),
                attempts = attempted.attempts,
                error = %e,
                "Feed fetch failed"
            );
            RawFeedResult::error(source, e.class(), e.to_string(), attempted.attempts, now)
        }
    }
}
