//! SEC EDGAR submissions (8-K family filings per company).

use crate::error::{Result, SourceError};
use crate::http::FeedClient;
use crate::{FetchContext, SourceConnector};
use chrono::NaiveDate;
use scintel_common::feeds::{
    CompanyFilings, FailureClass, FeedRecords, Filing, RawFeedResult, SourceKind,
};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://data.sec.gov/submissions";
pub const DEFAULT_MAX_FILINGS: usize = 20;

/// A company whose filings are tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgarCompany {
    pub name: String,
    pub cik: String,
}

#[derive(Debug, Deserialize)]
struct Submissions {
    filings: SubmissionFilings,
}

#[derive(Debug, Deserialize)]
struct SubmissionFilings {
    recent: RecentFilings,
}

/// EDGAR stores recent filings as parallel column arrays.
#[derive(Debug, Deserialize)]
struct RecentFilings {
    form: Vec<String>,
    #[serde(rename = "filingDate", default)]
    filing_date: Vec<String>,
    #[serde(default)]
    items: Vec<String>,
    #[serde(rename = "accessionNumber", default)]
    accession_number: Vec<String>,
}

/// Zero-padded ten digit CIK as used in submission file names.
pub fn normalize_cik(cik: &str) -> Option<String> {
    let digits: String = cik.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() || digits.len() > 10 {
        return None;
    }
    Some(format!("{digits:0>10}"))
}

/// Split an EDGAR items field into bare item codes.
///
/// # Examples
///
/// ```
/// use scintel_sources::edgar::normalize_items;
///
/// assert_eq!(normalize_items("Item 1.03, 9.01"), vec!["1.03", "9.01"]);
/// ```
pub fn normalize_items(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .filter_map(|item| {
            let item = item.trim();
            let code = match item.get(..4) {
                Some(prefix) if prefix.eq_ignore_ascii_case("item") => item[4..].trim(),
                _ => item,
            };
            (!code.is_empty()).then(|| code.to_string())
        })
        .collect()
}

fn is_current_report(form: &str) -> bool {
    form.trim().to_ascii_uppercase().starts_with("8-K")
}

/// Decode a submissions document, keeping the newest `max_filings` 8-K
/// family filings.
pub fn parse_submissions(body: &str, max_filings: usize) -> Result<Vec<Filing>> {
    let submissions: Submissions = serde_json::from_str(body)?;
    let recent = submissions.filings.recent;

    let filings = recent
        .form
        .iter()
        .enumerate()
        .filter(|(_, form)| is_current_report(form))
        .take(max_filings)
        .map(|(idx, form)| Filing {
            form: form.trim().to_string(),
            filing_date: recent
                .filing_date
                .get(idx)
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
            accession_number: recent.accession_number.get(idx).cloned().unwrap_or_default(),
            items: recent
                .items
                .get(idx)
                .map(|items| normalize_items(items))
                .unwrap_or_default(),
        })
        .collect();

    Ok(filings)
}

pub struct EdgarConnector {
    client: FeedClient,
    base_url: String,
    companies: Vec<EdgarCompany>,
    max_filings: usize,
}

impl EdgarConnector {
    pub fn new(
        client: FeedClient,
        base_url: impl Into<String>,
        companies: Vec<EdgarCompany>,
        max_filings: usize,
    ) -> Result<Self> {
        let mut normalized = Vec::with_capacity(companies.len());
        for company in companies {
            let cik = normalize_cik(&company.cik).ok_or_else(|| {
                SourceError::Config(format!("invalid CIK for {}: {}", company.name, company.cik))
            })?;
            normalized.push(EdgarCompany {
                name: company.name,
                cik,
            });
        }

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            companies: normalized,
            max_filings,
        })
    }

    fn submissions_url(&self, cik: &str) -> String {
        format!("{}/CIK{}.json", self.base_url, cik)
    }
}

#[async_trait::async_trait]
impl SourceConnector for EdgarConnector {
    fn source(&self) -> SourceKind {
        SourceKind::SecEdgar
    }

    async fn fetch(&self, ctx: &FetchContext) -> RawFeedResult {
        let mut attempts = 0;
        let mut last_error: Option<SourceError> = None;
        let mut reports = Vec::with_capacity(self.companies.len());

        for company in &self.companies {
            let url = self.submissions_url(&company.cik);
            let attempted = self
                .client
                .get_text(self.source(), &url, &[], &[])
                .await
                .map(|body| parse_submissions(&body, self.max_filings));
            attempts += attempted.attempts;

            match attempted.result {
                Ok(filings) => reports.push(CompanyFilings {
                    cik: company.cik.clone(),
                    company: company.name.clone(),
                    filings,
                    fetch_error: None,
                }),
                Err(e) => {
                    tracing::warn!(
                        company = %company.name,
                        cik = %company.cik,
                        error = %e,
                        "Failed to fetch EDGAR submissions"
                    );
                    reports.push(CompanyFilings {
                        cik: company.cik.clone(),
                        company: company.name.clone(),
                        filings: Vec::new(),
                        fetch_error: Some(e.to_string()),
                    });
                    last_error = Some(e);
                }
            }
        }

        let all_failed = reports.iter().all(|r| r.fetch_error.is_some());
        match last_error {
            Some(e) if all_failed => {
                let class: FailureClass = e.class();
                tracing::warn!(source = %self.source(), error = %e, "Every EDGAR request failed");
                RawFeedResult::error(
                    self.source(),
                    class,
                    format!("all {} company requests failed; last: {e}", reports.len()),
                    attempts,
                    ctx.now,
                )
            }
            _ => {
                let filings: usize = reports.iter().map(|r| r.filings.len()).sum();
                tracing::info!(
                    source = %self.source(),
                    companies = reports.len(),
                    filings,
                    "Feed fetched"
                );
                // A company without recent 8-Ks is a quiet company, not an empty feed.
                RawFeedResult::success(
                    self.source(),
                    FeedRecords::Filings(reports),
                    attempts,
                    ctx.now,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "cik": "1413329",
        "name": "Philip Morris International Inc.",
        "filings": {
            "recent": {
                "accessionNumber": ["0001-24-01", "0001-24-02", "0001-24-03", "0001-24-04"],
                "filingDate": ["2024-10-01", "2024-09-20", "2024-09-15", "bad"],
                "form": ["8-K", "10-Q", "8-K/A", "8-K"],
                "items": ["Item 1.03,9.01", "", "5.02", ""]
            },
            "files": []
        }
    }"#;

    #[test]
    fn should_keep_only_current_reports_with_normalized_items() {
        let filings = parse_submissions(SAMPLE, 20).unwrap();
        assert_eq!(filings.len(), 3);
        assert_eq!(filings[0].items, vec!["1.03", "9.01"]);
        assert_eq!(filings[0].filing_date, NaiveDate::from_ymd_opt(2024, 10, 1));
        assert_eq!(filings[1].form, "8-K/A");
        assert_eq!(filings[1].items, vec!["5.02"]);
        assert_eq!(filings[2].filing_date, None);
        assert!(filings[2].items.is_empty());
    }

    #[test]
    fn should_cap_filings_per_company() {
        let filings = parse_submissions(SAMPLE, 1).unwrap();
        assert_eq!(filings.len(), 1);
        assert_eq!(filings[0].accession_number, "0001-24-01");
    }

    #[test]
    fn should_pad_cik_to_ten_digits() {
        assert_eq!(normalize_cik("1413329").as_deref(), Some("0001413329"));
        assert_eq!(normalize_cik("0001413329").as_deref(), Some("0001413329"));
        assert_eq!(normalize_cik("n/a"), None);
    }

    #[test]
    fn should_normalize_item_prefixes() {
        assert_eq!(normalize_items("ITEM 4.02"), vec!["4.02"]);
        assert_eq!(normalize_items("Item 5.02; Item 9.01"), vec!["5.02", "9.01"]);
        assert!(normalize_items("").is_empty());
    }
}
