use serde::{Deserialize, Serialize};

pub const CYBER_CRITICAL_WINDOW_HOURS: i64 = 48;
pub const CYBER_RECENT_WINDOW_DAYS: i64 = 7;
pub const FX_RED_PCT: f64 = 1.5;
pub const FX_GREEN_PCT: f64 = 0.5;
pub const MARKET_CRITICAL_DROP_PCT: f64 = 5.0;
pub const MARKET_WARNING_DROP_PCT: f64 = 2.0;
pub const FILING_LOOKBACK_DAYS: i64 = 30;
pub const SUPPLIER_RED_COUNT: usize = 3;
pub const MAX_RECENT_VULNERABILITIES: usize = 10;
pub const MAX_MATCHING_VULNERABILITIES: usize = 5;

/// Tunable bounds for every rule. Missing config keys fall back to the
/// constants above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// A ransomware-flagged vulnerability added within this many hours is RED.
    #[serde(default = "default_cyber_critical_window_hours")]
    pub cyber_critical_window_hours: i64,
    /// Any vulnerability added within this many days is AMBER.
    #[serde(default = "default_cyber_recent_window_days")]
    pub cyber_recent_window_days: i64,
    #[serde(default = "default_fx_red_pct")]
    pub fx_red_pct: f64,
    #[serde(default = "default_fx_green_pct")]
    pub fx_green_pct: f64,
    /// Daily drops are given as positive percentages.
    #[serde(default = "default_market_critical_drop_pct")]
    pub market_critical_drop_pct: f64,
    #[serde(default = "default_market_warning_drop_pct")]
    pub market_warning_drop_pct: f64,
    #[serde(default = "default_filing_lookback_days")]
    pub filing_lookback_days: i64,
    /// Suppliers at MEDIUM or above that turn the watchlist RED.
    #[serde(default = "default_supplier_red_count")]
    pub supplier_red_count: usize,
    #[serde(default = "default_max_recent_vulnerabilities")]
    pub max_recent_vulnerabilities: usize,
    #[serde(default = "default_max_matching_vulnerabilities")]
    pub max_matching_vulnerabilities: usize,
}

fn default_cyber_critical_window_hours() -> i64 {
    CYBER_CRITICAL_WINDOW_HOURS
}

fn default_cyber_recent_window_days() -> i64 {
    CYBER_RECENT_WINDOW_DAYS
}

fn default_fx_red_pct() -> f64 {
    FX_RED_PCT
}

fn default_fx_green_pct() -> f64 {
    FX_GREEN_PCT
}

fn default_market_critical_drop_pct() -> f64 {
    MARKET_CRITICAL_DROP_PCT
}

fn default_market_warning_drop_pct() -> f64 {
    MARKET_WARNING_DROP_PCT
}

fn default_filing_lookback_days() -> i64 {
    FILING_LOOKBACK_DAYS
}

fn default_supplier_red_count() -> usize {
    SUPPLIER_RED_COUNT
}

fn default_max_recent_vulnerabilities() -> usize {
    MAX_RECENT_VULNERABILITIES
}

fn default_max_matching_vulnerabilities() -> usize {
    MAX_MATCHING_VULNERABILITIES
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            cyber_critical_window_hours: CYBER_CRITICAL_WINDOW_HOURS,
            cyber_recent_window_days: CYBER_RECENT_WINDOW_DAYS,
            fx_red_pct: FX_RED_PCT,
            fx_green_pct: FX_GREEN_PCT,
            market_critical_drop_pct: MARKET_CRITICAL_DROP_PCT,
            market_warning_drop_pct: MARKET_WARNING_DROP_PCT,
            filing_lookback_days: FILING_LOOKBACK_DAYS,
            supplier_red_count: SUPPLIER_RED_COUNT,
            max_recent_vulnerabilities: MAX_RECENT_VULNERABILITIES,
            max_matching_vulnerabilities: MAX_MATCHING_VULNERABILITIES,
        }
    }
}
