//! Normalized feed records.
//!
//! Connectors validate raw payloads into these closed types before anything
//! reaches the scorer or the assembler. Optional upstream fields are
//! `Option`s so that schema drift degrades to "no signal" instead of a
//! failed fetch.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Every external feed the harvester knows about.
///
/// # Examples
///
/// ```
/// use scintel_common::feeds::SourceKind;
///
/// let kind: SourceKind = "cisa_kev".parse().unwrap();
/// assert_eq!(kind, SourceKind::CisaKev);
/// assert_eq!(SourceKind::FdaRecalls.to_string(), "fda_recalls");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    CisaKev,
    EcbFx,
    SecEdgar,
    OfacSanctions,
    FdaRecalls,
    MarketQuotes,
}

impl SourceKind {
    pub const ALL: [SourceKind; 6] = [
        SourceKind::CisaKev,
        SourceKind::EcbFx,
        SourceKind::SecEdgar,
        SourceKind::OfacSanctions,
        SourceKind::FdaRecalls,
        SourceKind::MarketQuotes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::CisaKev => "cisa_kev",
            SourceKind::EcbFx => "ecb_fx",
            SourceKind::SecEdgar => "sec_edgar",
            SourceKind::OfacSanctions => "ofac_sanctions",
            SourceKind::FdaRecalls => "fda_recalls",
            SourceKind::MarketQuotes => "market_quotes",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown source: {s}"))
    }
}

/// Why a fetch failed; decides retry and is reported in stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Timeout, connection failure or 5xx.
    Transient,
    /// 4xx or rejected credentials.
    Permanent,
    /// The payload could not be parsed.
    Malformed,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureClass::Transient => write!(f, "transient"),
            FailureClass::Permanent => write!(f, "permanent"),
            FailureClass::Malformed => write!(f, "malformed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    Success,
    /// Reachable, but nothing to report.
    Empty,
    Error {
        class: FailureClass,
        message: String,
    },
    /// Not called: the source's circuit breaker is open.
    Skipped,
}

impl FeedOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, FeedOutcome::Error { .. })
    }

    /// The source answered with something parseable, even if empty.
    pub fn is_reachable(&self) -> bool {
        matches!(self, FeedOutcome::Success | FeedOutcome::Empty)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeedOutcome::Success => "success",
            FeedOutcome::Empty => "empty",
            FeedOutcome::Error { .. } => "error",
            FeedOutcome::Skipped => "skipped",
        }
    }
}

/// What one connector call produced. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeedResult {
    pub source: SourceKind,
    pub outcome: FeedOutcome,
    pub records: FeedRecords,
    pub attempts: u32,
    pub fetched_at: DateTime<Utc>,
}

impl RawFeedResult {
    pub fn success(
        source: SourceKind,
        records: FeedRecords,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let outcome = if records.is_empty() {
            FeedOutcome::Empty
        } else {
            FeedOutcome::Success
        };
        Self {
            source,
            outcome,
            records,
            attempts,
            fetched_at: now,
        }
    }

    pub fn error(
        source: SourceKind,
        class: FailureClass,
        message: impl Into<String>,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            outcome: FeedOutcome::Error {
                class,
                message: message.into(),
            },
            records: FeedRecords::None,
            attempts,
            fetched_at: now,
        }
    }

    pub fn skipped(source: SourceKind, now: DateTime<Utc>) -> Self {
        Self {
            source,
            outcome: FeedOutcome::Skipped,
            records: FeedRecords::None,
            attempts: 0,
            fetched_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    #[serde(rename = "cveID")]
    pub cve_id: String,
    #[serde(rename = "vendorProject", default)]
    pub vendor_project: String,
    #[serde(default)]
    pub product: String,
    #[serde(rename = "vulnerabilityName", default)]
    pub vulnerability_name: String,
    #[serde(rename = "dateAdded", default)]
    pub date_added: Option<NaiveDate>,
    #[serde(rename = "knownRansomwareCampaignUse", default)]
    pub known_ransomware: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FxObservation {
    pub date: Option<NaiveDate>,
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filing {
    pub form: String,
    pub filing_date: Option<NaiveDate>,
    pub accession_number: String,
    /// Normalized item codes, e.g. `"1.03"`.
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyFilings {
    pub cik: String,
    /// Watchlist name of the company, not the registrant name.
    pub company: String,
    pub filings: Vec<Filing>,
    pub fetch_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SanctionEntry {
    pub name: String,
    pub entity_type: String,
    pub programs: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecallNotice {
    pub recalling_firm: String,
    pub reason: String,
    pub classification: String,
    pub report_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketQuote {
    pub ticker: String,
    pub last_close: Option<f64>,
    pub previous_close: Option<f64>,
}

impl MarketQuote {
    /// Percentage change between the last two closes, when both are usable.
    pub fn daily_change_pct(&self) -> Option<f64> {
        let last = self.last_close.filter(|v| v.is_finite())?;
        let previous = self.previous_close.filter(|v| v.is_finite() && *v != 0.0)?;
        Some((last - previous) / previous * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedRecords {
    None,
    Vulnerabilities(Vec<Vulnerability>),
    FxRates(Vec<FxObservation>),
    Filings(Vec<CompanyFilings>),
    Sanctions(Vec<SanctionEntry>),
    Recalls(Vec<RecallNotice>),
    Quotes(Vec<MarketQuote>),
}

impl FeedRecords {
    pub fn len(&self) -> usize {
        match self {
            FeedRecords::None => 0,
            FeedRecords::Vulnerabilities(v) => v.len(),
            FeedRecords::FxRates(v) => v.len(),
            FeedRecords::Filings(v) => v.len(),
            FeedRecords::Sanctions(v) => v.len(),
            FeedRecords::Recalls(v) => v.len(),
            FeedRecords::Quotes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_ignore_missing_or_zero_closes_in_daily_change() {
        let quote = MarketQuote {
            ticker: "JBL".into(),
            last_close: Some(99.0),
            previous_close: Some(100.0),
        };
        let change = quote.daily_change_pct().unwrap();
        assert!((change + 1.0).abs() < 1e-9);

        let missing = MarketQuote {
            previous_close: None,
            ..quote.clone()
        };
        assert_eq!(missing.daily_change_pct(), None);

        let zero = MarketQuote {
            previous_close: Some(0.0),
            ..quote.clone()
        };
        assert_eq!(zero.daily_change_pct(), None);

        let nan = MarketQuote {
            last_close: Some(f64::NAN),
            ..quote
        };
        assert_eq!(nan.daily_change_pct(), None);
    }

    #[test]
    fn should_report_empty_outcome_for_empty_records() {
        let now = Utc::now();
        let result = RawFeedResult::success(
            SourceKind::OfacSanctions,
            FeedRecords::Sanctions(vec![]),
            1,
            now,
        );
        assert_eq!(result.outcome, FeedOutcome::Empty);
        assert!(result.outcome.is_reachable());
        assert!(!result.outcome.is_error());
    }
}
