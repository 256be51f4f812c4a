//! Per-entity risk level.
//!
//! Each signal source contributes a candidate level; the worst one wins and
//! names the entity's `last_signal`. A missing signal contributes nothing.

use crate::RiskThresholds;
use scintel_common::feeds::{RecallNotice, SanctionEntry, Vulnerability};
use scintel_common::text::{mentions, truncate_chars};
use scintel_common::types::{EntityRisk, RagScore, RiskLevel, VulnerabilityRef};

pub const CRITICAL_TERMS: [&str; 5] =
    ["investigation", "fraud", "sanction", "bankruptcy", "recall"];
pub const WARNING_TERMS: [&str; 4] = ["delay", "shortage", "drop", "lawsuit"];

pub const NO_SIGNAL: &str = "No significant risk signals detected.";

const MAX_HEADLINE_CHARS: usize = 100;

/// The names an entity is known by: display name first, then aliases.
#[derive(Debug, Clone, Copy)]
pub struct Identifiers<'a> {
    pub name: &'a str,
    pub aliases: &'a [String],
}

impl<'a> Identifiers<'a> {
    pub fn new(name: &'a str, aliases: &'a [String]) -> Self {
        Self { name, aliases }
    }

    fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().map(String::as_str))
    }

    /// Whole-word match of any identifier in `text`.
    pub fn found_in(&self, text: &str) -> bool {
        self.iter().any(|id| mentions(text, id))
    }
}

/// Facts gathered for one entity in the current run.
#[derive(Debug, Clone, Default)]
pub struct EntitySignals {
    pub matching_vulnerabilities: Vec<Vulnerability>,
    pub headlines: Vec<String>,
    pub daily_change_pct: Option<f64>,
    /// Peers only.
    pub filing_rag: Option<RagScore>,
}

pub fn matching_vulnerabilities(
    ids: Identifiers<'_>,
    recent: &[Vulnerability],
) -> Vec<Vulnerability> {
    recent
        .iter()
        .filter(|v| {
            ids.found_in(&v.vendor_project)
                || ids.found_in(&v.product)
                || ids.found_in(&v.vulnerability_name)
        })
        .cloned()
        .collect()
}

/// Recall notices and sanctions listings that name the entity, as headlines.
pub fn headlines_for(
    ids: Identifiers<'_>,
    recalls: &[RecallNotice],
    sanctions: &[SanctionEntry],
) -> Vec<String> {
    let recall_lines = recalls
        .iter()
        .filter(|r| ids.found_in(&r.recalling_firm))
        .map(|r| {
            let class = if r.classification.is_empty() {
                String::new()
            } else {
                format!(" ({})", r.classification)
            };
            format!("{} product recall{class}: {}", r.recalling_firm, r.reason)
        });
    let sanction_lines = sanctions
        .iter()
        .filter(|s| ids.found_in(&s.name))
        .map(|s| format!("OFAC sanction listing: {} [{}]", s.name, s.programs));

    recall_lines.chain(sanction_lines).collect()
}

/// Lexicon level of a headline, if any term occurs in it.
pub fn headline_level(headline: &str) -> Option<RiskLevel> {
    let lower = headline.to_lowercase();
    if CRITICAL_TERMS.iter().any(|t| lower.contains(t)) {
        Some(RiskLevel::Critical)
    } else if WARNING_TERMS.iter().any(|t| lower.contains(t)) {
        Some(RiskLevel::Medium)
    } else {
        None
    }
}

pub fn market_level(
    daily_change_pct: Option<f64>,
    thresholds: &RiskThresholds,
) -> Option<RiskLevel> {
    let change = daily_change_pct.filter(|c| c.is_finite())?;
    if change < -thresholds.market_critical_drop_pct {
        Some(RiskLevel::Critical)
    } else if change < -thresholds.market_warning_drop_pct {
        Some(RiskLevel::Medium)
    } else {
        None
    }
}

fn cyber_level(matches: &[Vulnerability]) -> Option<RiskLevel> {
    match matches {
        [] => None,
        [only] if only.known_ransomware => Some(RiskLevel::High),
        [_] => Some(RiskLevel::Medium),
        _ => Some(RiskLevel::Critical),
    }
}

fn filing_level(rag: Option<RagScore>) -> Option<RiskLevel> {
    match rag? {
        RagScore::Red => Some(RiskLevel::Critical),
        RagScore::Amber => Some(RiskLevel::High),
        _ => None,
    }
}

/// Fold all signals into an [`EntityRisk`]. On equal levels the earlier
/// signal (cyber, news, market, filings) names `last_signal`.
pub fn assess_entity(
    name: &str,
    signals: &EntitySignals,
    thresholds: &RiskThresholds,
) -> EntityRisk {
    let mut candidates: Vec<(RiskLevel, String)> = Vec::new();

    let matches = &signals.matching_vulnerabilities;
    if let Some(level) = cyber_level(matches) {
        let ids: Vec<&str> = matches.iter().take(3).map(|v| v.cve_id.as_str()).collect();
        candidates.push((
            level,
            format!(
                "Cyber risk: {} CISA KEV vulnerability(ies) match {name}. CVE IDs: {}.",
                matches.len(),
                ids.join(", ")
            ),
        ));
    }

    let worst_headline = signals
        .headlines
        .iter()
        .filter_map(|h| headline_level(h).map(|level| (level, h)))
        .fold(None::<(RiskLevel, &String)>, |acc, (level, h)| match acc {
            Some((best, _)) if best >= level => acc,
            _ => Some((level, h)),
        });
    if let Some((level, headline)) = worst_headline {
        let prefix = if level == RiskLevel::Critical {
            "News alert"
        } else {
            "Potential issue"
        };
        candidates.push((
            level,
            format!("{prefix}: {}", truncate_chars(headline, MAX_HEADLINE_CHARS)),
        ));
    }

    let market = market_level(signals.daily_change_pct, thresholds);
    if let (Some(level), Some(change)) = (market, signals.daily_change_pct) {
        let message = if level == RiskLevel::Critical {
            format!("Severe market drop: {change:.2}% on the day.")
        } else {
            format!("Volatility alert: stock down {change:.2}%.")
        };
        candidates.push((level, message));
    }

    if let Some(level) = filing_level(signals.filing_rag) {
        let message = if level == RiskLevel::Critical {
            "SEC filing alert: distress item (1.03/4.02) on file."
        } else {
            "SEC filing warning: director or officer change (5.02) filed recently."
        };
        candidates.push((level, message.to_string()));
    }

    let (risk_level, last_signal) = candidates
        .into_iter()
        .fold(None::<(RiskLevel, String)>, |acc, (level, message)| match acc {
            Some((best, _)) if best >= level => acc,
            _ => Some((level, message)),
        })
        .unwrap_or((RiskLevel::Low, NO_SIGNAL.to_string()));

    EntityRisk {
        risk_level,
        cyber_risk: !matches.is_empty(),
        matching_vulnerabilities: matches
            .iter()
            .take(thresholds.max_matching_vulnerabilities)
            .map(|v| VulnerabilityRef {
                cve_id: v.cve_id.clone(),
                vulnerability_name: v.vulnerability_name.clone(),
                date_added: v.date_added,
            })
            .collect(),
        news_risk: worst_headline.is_some(),
        headlines: signals.headlines.clone(),
        market_risk: market.is_some(),
        daily_change_pct: signals.daily_change_pct,
        filing_signal: signals.filing_rag,
        last_signal,
    }
}
