//! openFDA enforcement reports (product recalls).

use crate::error::{Result, SourceError};
use crate::http::{Attempted, FeedClient};
use crate::{into_feed_result, FetchContext, SourceConnector};
use chrono::NaiveDate;
use scintel_common::feeds::{FeedRecords, RawFeedResult, RecallNotice, SourceKind};
use serde::Deserialize;

pub const DEFAULT_URL: &str = "https://api.fda.gov/food/enforcement.json";
pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct EnforcementResponse {
    results: Vec<RawRecall>,
}

#[derive(Debug, Deserialize)]
struct RawRecall {
    #[serde(default)]
    recalling_firm: Option<String>,
    #[serde(default)]
    reason_for_recall: Option<String>,
    #[serde(default)]
    classification: Option<String>,
    #[serde(default)]
    report_date: Option<String>,
}

pub fn parse_enforcement(body: &str) -> Result<Vec<RecallNotice>> {
    let response: EnforcementResponse = serde_json::from_str(body)?;

    let notices = response
        .results
        .into_iter()
        .filter_map(|raw| {
            let recalling_firm = raw.recalling_firm.filter(|f| !f.trim().is_empty())?;
            Some(RecallNotice {
                recalling_firm,
                reason: raw.reason_for_recall.unwrap_or_default(),
                classification: raw.classification.unwrap_or_default(),
                report_date: raw
                    .report_date
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y%m%d").ok()),
            })
        })
        .collect();

    Ok(notices)
}

/// openFDA answers a search without matches with 404.
fn not_found_is_empty(attempted: Attempted<String>) -> Attempted<Vec<RecallNotice>> {
    match attempted.result {
        Err(SourceError::HttpStatus { status: 404, .. }) => Attempted {
            result: Ok(Vec::new()),
            attempts: attempted.attempts,
        },
        result => Attempted {
            result: result.and_then(|body| parse_enforcement(&body)),
            attempts: attempted.attempts,
        },
    }
}

pub struct RecallsConnector {
    client: FeedClient,
    url: String,
    api_key: Option<String>,
    limit: u32,
}

impl RecallsConnector {
    pub fn new(
        client: FeedClient,
        url: impl Into<String>,
        api_key: Option<String>,
        limit: u32,
    ) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(SourceError::Config("fda_recalls url is empty".to_string()));
        }
        Ok(Self {
            client,
            url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            limit: limit.clamp(1, 1000),
        })
    }
}

#[async_trait::async_trait]
impl SourceConnector for RecallsConnector {
    fn source(&self) -> SourceKind {
        SourceKind::FdaRecalls
    }

    async fn fetch(&self, ctx: &FetchContext) -> RawFeedResult {
        let mut query = vec![
            ("sort", "report_date:desc".to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }

        let attempted = self
            .client
            .get_text(self.source(), &self.url, &query, &[])
            .await;
        let attempted =
            not_found_is_empty(attempted).map(|notices| Ok(FeedRecords::Recalls(notices)));
        into_feed_result(self.source(), attempted, ctx.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_enforcement_results() {
        let body = r#"{
            "meta": {"results": {"skip": 0, "limit": 2, "total": 2}},
            "results": [
                {
                    "recalling_firm": "Acme Foods",
                    "reason_for_recall": "Undeclared allergen",
                    "classification": "Class II",
                    "report_date": "20241002"
                },
                {
                    "reason_for_recall": "No firm given"
                }
            ]
        }"#;
        let notices = parse_enforcement(body).unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].recalling_firm, "Acme Foods");
        assert_eq!(notices[0].report_date, NaiveDate::from_ymd_opt(2024, 10, 2));
    }

    #[test]
    fn should_treat_not_found_as_empty() {
        let attempted = Attempted {
            result: Err(SourceError::HttpStatus {
                status: 404,
                body: r#"{"error":{"code":"NOT_FOUND"}}"#.into(),
            }),
            attempts: 1,
        };
        let notices = not_found_is_empty(attempted).result.unwrap();
        assert!(notices.is_empty());
    }

    #[test]
    fn should_keep_other_client_errors() {
        let attempted = Attempted {
            result: Err(SourceError::HttpStatus {
                status: 403,
                body: "API_KEY_INVALID".into(),
            }),
            attempts: 1,
        };
        assert!(not_found_is_empty(attempted).result.is_err());
    }
}
