use crate::RiskThresholds;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use scintel_common::feeds::Vulnerability;
use scintel_common::types::RagScore;

/// Result of the catalog-wide cyber rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CyberAssessment {
    pub rag: RagScore,
    pub total_vulnerabilities: usize,
    /// Added within the recent window, newest first.
    pub recent: Vec<Vulnerability>,
    /// Ransomware-flagged and added within the critical window.
    pub critical_count: usize,
}

/// A catalog date counts from midnight UTC of that day.
fn added_since(date: Option<NaiveDate>, cutoff: DateTime<Utc>) -> bool {
    date.and_then(|d| d.and_hms_opt(0, 0, 0))
        .is_some_and(|start| start.and_utc() >= cutoff)
}

pub fn is_recent(vuln: &Vulnerability, thresholds: &RiskThresholds, now: DateTime<Utc>) -> bool {
    added_since(
        vuln.date_added,
        now - Duration::days(thresholds.cyber_recent_window_days),
    )
}

pub fn is_critical(vuln: &Vulnerability, thresholds: &RiskThresholds, now: DateTime<Utc>) -> bool {
    vuln.known_ransomware
        && added_since(
            vuln.date_added,
            now - Duration::hours(thresholds.cyber_critical_window_hours),
        )
}

/// RED when a ransomware-flagged entry landed inside the critical window,
/// AMBER when anything landed inside the recent window, GREEN otherwise.
/// Entries without a date never qualify.
pub fn assess_cyber(
    vulnerabilities: &[Vulnerability],
    thresholds: &RiskThresholds,
    now: DateTime<Utc>,
) -> CyberAssessment {
    let mut recent: Vec<Vulnerability> = vulnerabilities
        .iter()
        .filter(|v| is_recent(v, thresholds, now))
        .cloned()
        .collect();
    recent.sort_by(|a, b| b.date_added.cmp(&a.date_added));

    let critical_count = recent
        .iter()
        .filter(|v| is_critical(v, thresholds, now))
        .count();

    let rag = if critical_count > 0 {
        RagScore::Red
    } else if !recent.is_empty() {
        RagScore::Amber
    } else {
        RagScore::Green
    };

    CyberAssessment {
        rag,
        total_vulnerabilities: vulnerabilities.len(),
        recent,
        critical_count,
    }
}
