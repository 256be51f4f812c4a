use crate::error::{Result, SourceError};
use reqwest::Client;
use scintel_common::feeds::SourceKind;
use scintel_common::text::truncate_chars;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pause before the single retry of a transient failure.
    pub retry_delay: Duration,
}

/// A fetch result together with the number of requests it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

impl<T> Attempted<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> Result<U>) -> Attempted<U> {
        Attempted {
            result: self.result.and_then(f),
            attempts: self.attempts,
        }
    }
}

/// Run `op`, retrying exactly once after `delay` when the first failure is
/// transient. Permanent and malformed failures are returned immediately.
pub async fn with_retry<T, F, Fut>(label: &str, delay: Duration, mut op: F) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match op().await {
        Err(e) if e.is_transient() => {
            tracing::warn!(
                source = label,
                error = %e,
                delay_ms = delay.as_millis() as u64,
                "Transient failure, retrying once"
            );
            tokio::time::sleep(delay).await;
            Attempted {
                result: op().await,
                attempts: 2,
            }
        }
        other => Attempted {
            result: other,
            attempts: 1,
        },
    }
}

/// Shared HTTP client for all connectors.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    retry_delay: Duration,
    /// Extra headers sent with every request of one source.
    source_headers: BTreeMap<SourceKind, Vec<(String, String)>>,
}

impl FeedClient {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| SourceError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry_delay: settings.retry_delay,
            source_headers: BTreeMap::new(),
        })
    }

    pub fn with_source_headers(
        mut self,
        source: SourceKind,
        headers: Vec<(String, String)>,
    ) -> Self {
        if !headers.is_empty() {
            self.source_headers.insert(source, headers);
        }
        self
    }

    /// GET `url` as text with the connector retry policy applied.
    pub async fn get_text(
        &self,
        source: SourceKind,
        url: &str,
        query: &[(&str, String)],
        headers: &[(String, String)],
    ) -> Attempted<String> {
        let mut all_headers = self.source_headers.get(&source).cloned().unwrap_or_default();
        all_headers.extend(headers.iter().cloned());
        with_retry(source.as_str(), self.retry_delay, || {
            self.get_once(url, query, &all_headers)
        })
        .await
    }

    async fn get_once(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(String, String)],
    ) -> Result<String> {
        let mut request = self.client.get(url).query(query);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn should_retry_transient_failure_once() {
        let calls = AtomicU32::new(0);
        let attempted: Attempted<u32> = with_retry("test", Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(SourceError::Timeout("slow".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(attempted.attempts, 2);
        assert_eq!(attempted.result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_give_up_after_second_transient_failure() {
        let calls = AtomicU32::new(0);
        let attempted: Attempted<()> = with_retry("test", Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(SourceError::HttpStatus {
                    status: 502,
                    body: String::new(),
                })
            }
        })
        .await;

        assert_eq!(attempted.attempts, 2);
        assert!(attempted.result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_not_retry_client_errors_or_bad_payloads() {
        for err in [
            SourceError::HttpStatus {
                status: 403,
                body: "denied".into(),
            },
            SourceError::Malformed("not json".into()),
        ] {
            let calls = AtomicU32::new(0);
            let mut err = Some(err);
            let attempted: Attempted<()> = with_retry("test", Duration::from_millis(1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                let e = err.take();
                async move { Err(e.unwrap_or(SourceError::Malformed("again".into()))) }
            })
            .await;

            assert_eq!(attempted.attempts, 1);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }
}
