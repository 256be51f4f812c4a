use crate::{FetchContext, SourceConnector};
use scintel_common::feeds::{FailureClass, RawFeedResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Runs connectors concurrently with a bounded number of in-flight fetches.
///
/// Every connector yields exactly one result, in input order. A connector
/// that overruns its deadline or panics is reported as a transient error.
pub struct SourceCollector {
    concurrency: usize,
    deadline: Duration,
}

impl SourceCollector {
    pub fn new(concurrency: usize, deadline: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            deadline,
        }
    }

    pub async fn collect_all(
        &self,
        connectors: Vec<Arc<dyn SourceConnector>>,
        ctx: &FetchContext,
    ) -> Vec<RawFeedResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::with_capacity(connectors.len());

        for connector in connectors {
            let sem = Arc::clone(&semaphore);
            let ctx = ctx.clone();
            let deadline = self.deadline;
            let source = connector.source();

            let task = tokio::spawn(async move {
                let _permit = match sem.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return RawFeedResult::error(
                            source,
                            FailureClass::Transient,
                            "collector shut down",
                            0,
                            ctx.now,
                        )
                    }
                };

                match timeout(deadline, connector.fetch(&ctx)).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(
                            source = %source,
                            deadline_secs = deadline.as_secs(),
                            "Connector exceeded its deadline"
                        );
                        RawFeedResult::error(
                            source,
                            FailureClass::Transient,
                            format!("deadline of {deadline:?} exceeded"),
                            1,
                            ctx.now,
                        )
                    }
                }
            });

            tasks.push((source, task));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (source, task) in tasks {
            match task.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(source = %source, error = %e, "Connector task panicked");
                    results.push(RawFeedResult::error(
                        source,
                        FailureClass::Transient,
                        format!("connector task failed: {e}"),
                        0,
                        ctx.now,
                    ));
                }
            }
        }

        results
    }
}
