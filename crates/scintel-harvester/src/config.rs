use crate::watchlist;
use scintel_common::feeds::SourceKind;
use scintel_common::types::ExposureTier;
use scintel_health::BreakerPolicy;
use scintel_risk::RiskThresholds;
use scintel_sources::{ecb, edgar, kev, market, recalls, sanctions, HttpSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Config file read when none is named on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config/harvester.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    #[serde(default = "default_breaker_file")]
    pub breaker_file: String,
    /// Label of the monitored currency pair in the macro pillar.
    #[serde(default = "default_fx_pair")]
    pub fx_pair: String,

    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub thresholds: RiskThresholds,
    #[serde(default)]
    pub breaker: BreakerPolicy,

    #[serde(default = "watchlist::default_suppliers")]
    pub suppliers: Vec<SupplierConfig>,
    #[serde(default = "watchlist::default_peers")]
    pub peers: Vec<PeerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// SEC EDGAR rejects requests without a contact address in here.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Connectors fetching at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Upper bound for one connector including its retry.
    #[serde(default = "default_connector_deadline_secs")]
    pub connector_deadline_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            concurrency: default_concurrency(),
            connector_deadline_secs: default_connector_deadline_secs(),
        }
    }
}

impl HttpConfig {
    pub fn settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    pub fn connector_deadline(&self) -> Duration {
        Duration::from_secs(self.connector_deadline_secs.max(1))
    }

    /// Time a multi-request connector may spend before returning what it
    /// has; five sixths of the connector deadline.
    pub fn partial_budget(&self) -> Duration {
        self.connector_deadline() * 5 / 6
    }
}

/// Settings shared by every feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Endpoint override; the connector's built-in URL otherwise.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            headers: BTreeMap::new(),
        }
    }
}

impl SourceConfig {
    pub fn url_or(&self, default: &str) -> String {
        self.url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(default)
            .to_string()
    }

    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub cisa_kev: SourceConfig,
    #[serde(default)]
    pub ecb_fx: SourceConfig,
    #[serde(default)]
    pub sec_edgar: SourceConfig,
    #[serde(default)]
    pub ofac_sanctions: SourceConfig,
    #[serde(default)]
    pub fda_recalls: SourceConfig,
    #[serde(default)]
    pub market_quotes: SourceConfig,

    #[serde(default)]
    pub ecb: EcbOptions,
    #[serde(default)]
    pub edgar: EdgarOptions,
    #[serde(default)]
    pub fda: FdaOptions,
}

impl SourcesConfig {
    pub fn get(&self, source: SourceKind) -> &SourceConfig {
        match source {
            SourceKind::CisaKev => &self.cisa_kev,
            SourceKind::EcbFx => &self.ecb_fx,
            SourceKind::SecEdgar => &self.sec_edgar,
            SourceKind::OfacSanctions => &self.ofac_sanctions,
            SourceKind::FdaRecalls => &self.fda_recalls,
            SourceKind::MarketQuotes => &self.market_quotes,
        }
    }

    pub fn default_url(source: SourceKind) -> &'static str {
        match source {
            SourceKind::CisaKev => kev::DEFAULT_URL,
            SourceKind::EcbFx => ecb::DEFAULT_URL,
            SourceKind::SecEdgar => edgar::DEFAULT_BASE_URL,
            SourceKind::OfacSanctions => sanctions::DEFAULT_URL,
            SourceKind::FdaRecalls => recalls::DEFAULT_URL,
            SourceKind::MarketQuotes => market::DEFAULT_BASE_URL,
        }
    }

    pub fn enabled(&self) -> Vec<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|s| self.get(*s).enabled)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcbOptions {
    #[serde(default = "default_ecb_observations")]
    pub observations: u32,
}

impl Default for EcbOptions {
    fn default() -> Self {
        Self {
            observations: default_ecb_observations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgarOptions {
    #[serde(default = "default_edgar_max_filings")]
    pub max_filings: usize,
}

impl Default for EdgarOptions {
    fn default() -> Self {
        Self {
            max_filings: default_edgar_max_filings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FdaOptions {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_fda_limit")]
    pub limit: u32,
}

impl Default for FdaOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            limit: default_fda_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierConfig {
    pub name: String,
    pub category: String,
    /// Derived from the category when omitted.
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub exposure: ExposureTier,
    #[serde(default)]
    pub stock_ticker: Option<String>,
    /// Other names the supplier appears under in feeds.
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    #[serde(default)]
    pub ticker: Option<String>,
    pub region: String,
    /// Companies without a CIK are not looked up on EDGAR.
    #[serde(default)]
    pub cik: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_snapshot_file() -> String {
    "snapshot.json".to_string()
}

fn default_breaker_file() -> String {
    "breakers.json".to_string()
}

fn default_fx_pair() -> String {
    "EUR/USD".to_string()
}

fn default_user_agent() -> String {
    format!(
        "scintel-harvester/{} (supply-chain-intel@example.com)",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_concurrency() -> usize {
    5
}

fn default_connector_deadline_secs() -> u64 {
    180
}

fn default_true() -> bool {
    true
}

fn default_ecb_observations() -> u32 {
    ecb::DEFAULT_OBSERVATIONS
}

fn default_edgar_max_filings() -> usize {
    edgar::DEFAULT_MAX_FILINGS
}

fn default_fda_limit() -> u32 {
    recalls::DEFAULT_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_file: default_snapshot_file(),
            breaker_file: default_breaker_file(),
            fx_pair: default_fx_pair(),
            http: HttpConfig::default(),
            sources: SourcesConfig::default(),
            thresholds: RiskThresholds::default(),
            breaker: BreakerPolicy::default(),
            suppliers: watchlist::default_suppliers(),
            peers: watchlist::default_peers(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `SCINTEL_*` overrides. Unparseable values are ignored with a
    /// warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("SCINTEL_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.data_dir = dir;
        }
        if let Some(raw) = lookup("SCINTEL_FETCH_TIMEOUT") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.http.timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "Ignoring invalid SCINTEL_FETCH_TIMEOUT"),
            }
        }
        if let Some(key) = lookup("SCINTEL_FDA_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.sources.fda.api_key = Some(key);
        }
        if let Some(agent) = lookup("SCINTEL_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            self.http.user_agent = agent;
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.snapshot_file)
    }

    pub fn breaker_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.breaker_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_every_field_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.http.concurrency, 5);
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.thresholds.fx_red_pct, 1.5);
        assert_eq!(config.suppliers.len(), watchlist::default_suppliers().len());
        assert_eq!(config.sources.enabled().len(), SourceKind::ALL.len());
        assert_eq!(config.snapshot_path(), PathBuf::from("data/snapshot.json"));
    }

    #[test]
    fn should_keep_partial_budget_inside_connector_deadline() {
        let http = HttpConfig::default();
        assert_eq!(http.connector_deadline(), Duration::from_secs(180));
        assert_eq!(http.partial_budget(), Duration::from_secs(150));
    }

    #[test]
    fn should_parse_watchlists_and_overrides() {
        let config: Config = toml::from_str(
            r#"
            data_dir = "/var/lib/scintel"

            [http]
            timeout_secs = 10

            [sources.fda_recalls]
            enabled = false

            [sources.sec_edgar.headers]
            "Accept-Encoding" = "gzip"

            [thresholds]
            fx_red_pct = 2.0

            [[suppliers]]
            name = "Acme Foils"
            category = "Printed Packaging"
            exposure = "Critical"
            aliases = ["Acme Packaging"]

            [[peers]]
            name = "Philip Morris Int."
            region = "US"
            cik = "1413329"
            "#,
        )
        .unwrap();

        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.http.retry_delay_secs, 5);
        assert!(!config.sources.fda_recalls.enabled);
        assert!(!config.sources.enabled().contains(&SourceKind::FdaRecalls));
        assert_eq!(
            config.sources.sec_edgar.header_pairs(),
            vec![("Accept-Encoding".to_string(), "gzip".to_string())]
        );
        assert_eq!(config.thresholds.fx_red_pct, 2.0);
        assert_eq!(config.thresholds.fx_green_pct, 0.5);
        assert_eq!(config.suppliers.len(), 1);
        assert_eq!(config.suppliers[0].exposure, ExposureTier::Critical);
        assert_eq!(config.peers[0].cik.as_deref(), Some("1413329"));
    }

    #[test]
    fn should_apply_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "SCINTEL_DATA_DIR" => Some("/tmp/intel".to_string()),
            "SCINTEL_FETCH_TIMEOUT" => Some("not-a-number".to_string()),
            "SCINTEL_FDA_API_KEY" => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.data_dir, "/tmp/intel");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.sources.fda.api_key.as_deref(), Some("secret"));

        config.apply_env(|key| (key == "SCINTEL_FETCH_TIMEOUT").then(|| "12".to_string()));
        assert_eq!(config.http.timeout_secs, 12);
    }

    #[test]
    fn should_fall_back_to_builtin_urls() {
        let mut source = SourceConfig::default();
        assert_eq!(source.url_or(kev::DEFAULT_URL), kev::DEFAULT_URL);
        source.url = Some("http://localhost:9000/kev.json".into());
        assert_eq!(source.url_or(kev::DEFAULT_URL), "http://localhost:9000/kev.json");
    }
}
