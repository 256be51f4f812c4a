use crate::RiskThresholds;
use chrono::{DateTime, Duration, Utc};
use scintel_common::feeds::{CompanyFilings, Filing};
use scintel_common::types::{FilingSignal, RagScore};

/// Bankruptcy or receivership.
pub const ITEM_BANKRUPTCY: &str = "1.03";
/// Non-reliance on previously issued financial statements.
pub const ITEM_NON_RELIANCE: &str = "4.02";
/// Departure or appointment of directors and officers.
pub const ITEM_OFFICER_CHANGE: &str = "5.02";

pub fn filing_severity(filing: &Filing) -> RagScore {
    let has = |code: &str| filing.items.iter().any(|item| item == code);
    if has(ITEM_BANKRUPTCY) || has(ITEM_NON_RELIANCE) {
        RagScore::Red
    } else if has(ITEM_OFFICER_CHANGE) {
        RagScore::Amber
    } else {
        RagScore::Green
    }
}

/// Whether a fetched filing takes part in scoring. Distress items always
/// count; everything else must be dated inside the lookback window.
fn in_scope(filing: &Filing, thresholds: &RiskThresholds, now: DateTime<Utc>) -> bool {
    if filing_severity(filing) == RagScore::Red {
        return true;
    }
    let cutoff = (now - Duration::days(thresholds.filing_lookback_days)).date_naive();
    filing.filing_date.is_some_and(|d| d >= cutoff)
}

/// Filing rule applied to one company.
pub fn company_rag(
    company: &CompanyFilings,
    thresholds: &RiskThresholds,
    now: DateTime<Utc>,
) -> RagScore {
    company
        .filings
        .iter()
        .filter(|f| in_scope(f, thresholds, now))
        .map(filing_severity)
        .fold(RagScore::Green, RagScore::worst)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilingAssessment {
    pub rag: RagScore,
    pub red_signals: usize,
    pub amber_signals: usize,
    /// Every RED filing fetched, plus AMBER filings inside the lookback
    /// window.
    pub flagged: Vec<FilingSignal>,
}

/// RED if any fetched filing carries item 1.03 or 4.02, whatever its date.
/// AMBER if an in-window filing carries 5.02, GREEN otherwise. Undated
/// filings only count when they are RED.
pub fn assess_filings(
    companies: &[CompanyFilings],
    thresholds: &RiskThresholds,
    now: DateTime<Utc>,
) -> FilingAssessment {
    let mut flagged = Vec::new();
    for company in companies {
        for filing in company.filings.iter().filter(|f| in_scope(f, thresholds, now)) {
            let severity = filing_severity(filing);
            if severity >= RagScore::Amber {
                flagged.push(FilingSignal {
                    company: company.company.clone(),
                    form: filing.form.clone(),
                    filing_date: filing.filing_date,
                    items: filing.items.clone(),
                    severity,
                });
            }
        }
    }

    let red_signals = flagged.iter().filter(|s| s.severity == RagScore::Red).count();
    let amber_signals = flagged.len() - red_signals;
    let rag = if red_signals > 0 {
        RagScore::Red
    } else if amber_signals > 0 {
        RagScore::Amber
    } else {
        RagScore::Green
    };

    FilingAssessment {
        rag,
        red_signals,
        amber_signals,
        flagged,
    }
}

/// One-line digest of a peer's filing situation for display.
pub fn peer_summary(
    company: Option<&CompanyFilings>,
    thresholds: &RiskThresholds,
    now: DateTime<Utc>,
) -> String {
    let Some(company) = company else {
        return "Neutral: Not tracked on SEC EDGAR. Monitoring market and regulatory sources."
            .to_string();
    };
    if let Some(err) = &company.fetch_error {
        let err: String = err.chars().take(50).collect();
        return format!(
            "Neutral: Data fetch error encountered ({err}). Monitoring via alternative sources."
        );
    }

    let window: Vec<&Filing> = company
        .filings
        .iter()
        .filter(|f| in_scope(f, thresholds, now))
        .collect();
    let has_item = |code: &str| window.iter().any(|f| f.items.iter().any(|i| i == code));
    let red = window
        .iter()
        .filter(|f| filing_severity(f) == RagScore::Red)
        .count();
    let amber = window
        .iter()
        .filter(|f| filing_severity(f) == RagScore::Amber)
        .count();

    if red > 0 {
        if has_item(ITEM_BANKRUPTCY) {
            return "CRITICAL: Bankruptcy filing detected (Item 1.03). \
                    Immediate attention required."
                .to_string();
        }
        return "CRITICAL: Non-reliance on financial statements (Item 4.02). \
                Material accounting issues identified."
            .to_string();
    }
    if amber > 0 {
        return format!(
            "WARNING: {amber} warning signal(s) detected. \
             Recent director departures or management changes noted."
        );
    }

    match window.first() {
        None => "Neutral: No material filings in the lookback window. Standard operational status."
            .to_string(),
        Some(latest) if latest.items.iter().any(|i| i == "2.02") => {
            "Neutral: Earnings results reported. No material risks identified.".to_string()
        }
        Some(latest) if latest.items.iter().any(|i| i == "7.01") => {
            "Neutral: Regulation FD disclosure filed. Routine operational update.".to_string()
        }
        Some(latest) if latest.items.iter().any(|i| i == "1.01") => {
            "Neutral: Material definitive agreement entered. Standard business activity."
                .to_string()
        }
        Some(_) => format!(
            "Neutral: {} recent filing(s) processed. No material risks identified.",
            window.len()
        ),
    }
}
