//! Daily closes per ticker from a chart endpoint.

use crate::error::{Result, SourceError};
use crate::http::{Attempted, FeedClient};
use crate::{FetchContext, SourceConnector};
use scintel_common::feeds::{FeedRecords, MarketQuote, RawFeedResult, SourceKind};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Extract the last two usable daily closes for `ticker`.
pub fn parse_chart(ticker: &str, body: &str) -> Result<MarketQuote> {
    let response: ChartResponse = serde_json::from_str(body)?;
    let result = response
        .chart
        .result
        .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)))
        .ok_or_else(|| SourceError::Malformed(format!("no chart result for {ticker}")))?;

    let mut closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|series| series.close)
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter(|c| c.is_finite());

    let last_close = closes.next_back();
    let previous_close = closes.next_back();

    Ok(MarketQuote {
        ticker: ticker.to_string(),
        last_close,
        previous_close,
    })
}

/// Time the ticker loop may spend before it stops and reports the quotes it
/// already has. Kept below the collector's per-connector deadline.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(150);

pub struct MarketConnector {
    client: FeedClient,
    base_url: String,
    tickers: Vec<String>,
    budget: Duration,
}

impl MarketConnector {
    pub fn new(client: FeedClient, base_url: impl Into<String>, tickers: Vec<String>) -> Self {
        let mut tickers: Vec<String> = tickers
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        tickers.sort();
        tickers.dedup();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tickers,
            budget: DEFAULT_BUDGET,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }
}

/// Quotes gathered within one budget.
#[derive(Debug, Default)]
struct Gathered {
    quotes: Vec<MarketQuote>,
    attempts: u32,
    last_error: Option<SourceError>,
    /// Tickers not fetched because the budget ran out.
    unfetched: usize,
}

/// Fetch tickers one by one until they are done or `budget` is spent.
async fn gather_quotes<F, Fut>(tickers: &[String], budget: Duration, mut fetch: F) -> Gathered
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Attempted<MarketQuote>>,
{
    let deadline = Instant::now() + budget;
    let mut gathered = Gathered::default();

    for (i, ticker) in tickers.iter().enumerate() {
        match timeout_at(deadline, fetch(ticker.clone())).await {
            Ok(attempted) => {
                gathered.attempts += attempted.attempts;
                match attempted.result {
                    Ok(quote) => gathered.quotes.push(quote),
                    Err(e) => {
                        tracing::debug!(ticker = %ticker, error = %e, "Quote unavailable");
                        gathered.last_error = Some(e);
                    }
                }
            }
            Err(_) => {
                gathered.attempts += 1;
                gathered.unfetched = tickers.len() - i;
                gathered.last_error = Some(SourceError::Timeout(format!(
                    "quote budget of {budget:?} spent at {ticker}"
                )));
                break;
            }
        }
    }
    gathered
}

#[async_trait::async_trait]
impl SourceConnector for MarketConnector {
    fn source(&self) -> SourceKind {
        SourceKind::MarketQuotes
    }

    async fn fetch(&self, ctx: &FetchContext) -> RawFeedResult {
        let query = [
            ("range", "5d".to_string()),
            ("interval", "1d".to_string()),
        ];
        let client = &self.client;
        let base_url = &self.base_url;
        let query = &query;

        let gathered = gather_quotes(&self.tickers, self.budget, |ticker| async move {
            let url = format!("{base_url}/{ticker}");
            client
                .get_text(SourceKind::MarketQuotes, &url, query, &[])
                .await
                .map(|body| parse_chart(&ticker, &body))
        })
        .await;

        if gathered.unfetched > 0 {
            tracing::warn!(
                source = %self.source(),
                quotes = gathered.quotes.len(),
                unfetched = gathered.unfetched,
                "Quote budget spent, keeping quotes fetched so far"
            );
        }

        match gathered.last_error {
            Some(e) if gathered.quotes.is_empty() => {
                tracing::warn!(source = %self.source(), error = %e, "Every quote request failed");
                RawFeedResult::error(
                    self.source(),
                    e.class(),
                    format!("no quote for any of {} tickers; last: {e}", self.tickers.len()),
                    gathered.attempts,
                    ctx.now,
                )
            }
            _ => {
                tracing::info!(
                    source = %self.source(),
                    quotes = gathered.quotes.len(),
                    "Feed fetched"
                );
                RawFeedResult::success(
                    self.source(),
                    FeedRecords::Quotes(gathered.quotes),
                    gathered.attempts,
                    ctx.now,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_last_two_closes_skipping_gaps() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"JBL"},
            "indicators":{"quote":[{"close":[120.0, 118.5, null, 100.0, 95.0, null]}]}}],
            "error":null}}"#;
        let quote = parse_chart("JBL", body).unwrap();
        assert_eq!(quote.last_close, Some(95.0));
        assert_eq!(quote.previous_close, Some(100.0));
        let change = quote.daily_change_pct().unwrap();
        assert!((change + 5.0).abs() < 1e-9);
    }

    #[test]
    fn should_report_no_signal_with_single_close() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{"close":[null, 10.0]}]}}]}}"#;
        let quote = parse_chart("X", body).unwrap();
        assert_eq!(quote.previous_close, None);
        assert_eq!(quote.daily_change_pct(), None);
    }

    #[test]
    fn should_reject_missing_chart_result() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#;
        assert!(matches!(
            parse_chart("NOPE", body).unwrap_err(),
            SourceError::Malformed(_)
        ));
    }

    fn quote(ticker: &str) -> MarketQuote {
        MarketQuote {
            ticker: ticker.to_string(),
            last_close: Some(99.0),
            previous_close: Some(100.0),
        }
    }

    #[tokio::test]
    async fn should_keep_quotes_fetched_before_budget_runs_out() {
        let tickers: Vec<String> = ["AAA", "BBB", "SLOW", "ZZZ"].map(String::from).to_vec();
        let gathered = gather_quotes(&tickers, Duration::from_millis(200), |ticker| async move {
            if ticker == "SLOW" {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Attempted {
                result: Ok(quote(&ticker)),
                attempts: 1,
            }
        })
        .await;

        let fetched: Vec<_> = gathered.quotes.iter().map(|q| q.ticker.as_str()).collect();
        assert_eq!(fetched, vec!["AAA", "BBB"]);
        assert_eq!(gathered.unfetched, 2);
        assert!(matches!(gathered.last_error, Some(SourceError::Timeout(_))));
    }

    #[tokio::test]
    async fn should_fetch_every_ticker_within_budget() {
        let tickers: Vec<String> = ["AAA", "BBB"].map(String::from).to_vec();
        let gathered = gather_quotes(&tickers, Duration::from_secs(5), |ticker| async move {
            if ticker == "BBB" {
                return Attempted {
                    result: Err(SourceError::HttpStatus {
                        status: 404,
                        body: "not found".into(),
                    }),
                    attempts: 1,
                };
            }
            Attempted {
                result: Ok(quote(&ticker)),
                attempts: 1,
            }
        })
        .await;

        assert_eq!(gathered.quotes.len(), 1);
        assert_eq!(gathered.attempts, 2);
        assert_eq!(gathered.unfetched, 0);
    }
}
