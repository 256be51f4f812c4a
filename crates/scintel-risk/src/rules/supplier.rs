use crate::RiskThresholds;
use scintel_common::types::{RagScore, RiskLevel};

/// Watchlist rollup: RED when `supplier_red_count` or more suppliers sit at
/// MEDIUM or above, AMBER when at least one does, GREEN otherwise.
pub fn watchlist_rag(levels: &[RiskLevel], thresholds: &RiskThresholds) -> RagScore {
    let elevated = levels.iter().filter(|l| **l >= RiskLevel::Medium).count();
    if elevated >= thresholds.supplier_red_count.max(1) {
        RagScore::Red
    } else if elevated > 0 {
        RagScore::Amber
    } else {
        RagScore::Green
    }
}

pub fn supplier_pillar_rag(cyber: RagScore, watchlist: RagScore) -> RagScore {
    cyber.worst(watchlist)
}
