use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Traffic-light classification, ordered from least to most severe.
///
/// `Unknown` sorts lowest so that folding with [`RagScore::worst`] never
/// lets a missing signal mask a real one.
///
/// # Examples
///
/// ```
/// use scintel_common::types::RagScore;
///
/// let rag: RagScore = "amber".parse().unwrap();
/// assert_eq!(rag, RagScore::Amber);
/// assert_eq!(rag.to_string(), "AMBER");
/// assert_eq!(RagScore::Green.worst(RagScore::Red), RagScore::Red);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RagScore {
    #[default]
    Unknown,
    Green,
    Amber,
    Red,
}

impl RagScore {
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }
}

impl std::fmt::Display for RagScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RagScore::Unknown => write!(f, "UNKNOWN"),
            RagScore::Green => write!(f, "GREEN"),
            RagScore::Amber => write!(f, "AMBER"),
            RagScore::Red => write!(f, "RED"),
        }
    }
}

impl std::str::FromStr for RagScore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNKNOWN" => Ok(RagScore::Unknown),
            "GREEN" => Ok(RagScore::Green),
            "AMBER" => Ok(RagScore::Amber),
            "RED" => Ok(RagScore::Red),
            _ => Err(format!("unknown rag score: {s}")),
        }
    }
}

/// Outcome of one pillar for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PillarStatus {
    Success,
    Error,
    Partial,
    Skipped,
    Fallback,
}

impl PillarStatus {
    /// Fresh data was fetched this run.
    pub fn is_fresh(self) -> bool {
        matches!(self, PillarStatus::Success | PillarStatus::Partial)
    }

    /// The pillar carries data a consumer can display, fresh or carried over.
    pub fn is_usable(self) -> bool {
        matches!(
            self,
            PillarStatus::Success | PillarStatus::Partial | PillarStatus::Fallback
        )
    }
}

impl std::fmt::Display for PillarStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PillarStatus::Success => write!(f, "success"),
            PillarStatus::Error => write!(f, "error"),
            PillarStatus::Partial => write!(f, "partial"),
            PillarStatus::Skipped => write!(f, "skipped"),
            PillarStatus::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PillarKind {
    Macro,
    Peers,
    Suppliers,
}

impl PillarKind {
    pub const ALL: [PillarKind; 3] = [PillarKind::Macro, PillarKind::Peers, PillarKind::Suppliers];

    pub fn as_str(self) -> &'static str {
        match self {
            PillarKind::Macro => "macro",
            PillarKind::Peers => "peers",
            PillarKind::Suppliers => "suppliers",
        }
    }
}

impl std::fmt::Display for PillarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall rollup of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Healthy,
    Partial,
    Degraded,
    Fallback,
}

impl SnapshotStatus {
    /// Roll pillar statuses up into the document status.
    ///
    /// An `error` pillar at this point has no usable data and makes the
    /// document `degraded`; carried-over data makes it `fallback`; any
    /// `partial` or `skipped` pillar makes it `partial`.
    ///
    /// # Examples
    ///
    /// ```
    /// use scintel_common::types::{PillarStatus, SnapshotStatus};
    ///
    /// let status = SnapshotStatus::from_pillars([
    ///     PillarStatus::Success,
    ///     PillarStatus::Fallback,
    ///     PillarStatus::Skipped,
    /// ]);
    /// assert_eq!(status, SnapshotStatus::Fallback);
    /// ```
    pub fn from_pillars(statuses: impl IntoIterator<Item = PillarStatus>) -> Self {
        let statuses: Vec<PillarStatus> = statuses.into_iter().collect();
        let any = |wanted: &[PillarStatus]| statuses.iter().any(|s| wanted.contains(s));

        if any(&[PillarStatus::Error]) {
            SnapshotStatus::Degraded
        } else if any(&[PillarStatus::Fallback]) {
            SnapshotStatus::Fallback
        } else if any(&[PillarStatus::Partial, PillarStatus::Skipped]) {
            SnapshotStatus::Partial
        } else {
            SnapshotStatus::Healthy
        }
    }
}

impl std::fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotStatus::Healthy => write!(f, "healthy"),
            SnapshotStatus::Partial => write!(f, "partial"),
            SnapshotStatus::Degraded => write!(f, "degraded"),
            SnapshotStatus::Fallback => write!(f, "fallback"),
        }
    }
}

/// Entity-level risk, ordered from lowest to highest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Circuit breaker state of one source. Declaration order is severity order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    #[default]
    Closed,
    HalfOpen,
    Open,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::HalfOpen => write!(f, "half-open"),
            BreakerState::Open => write!(f, "open"),
        }
    }
}

/// How much of the business depends on a supplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExposureTier {
    Critical,
    High,
    #[default]
    Medium,
}

/// Result of one pillar in a snapshot.
///
/// `rag_score` is only meaningful when `status` is `success` or `partial`;
/// for other statuses it is `UNKNOWN` or carried over together with `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarResult<P> {
    pub status: PillarStatus,
    pub rag_score: RagScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<P>,
    pub last_fetched: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Version of the snapshot the payload was carried over from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried_from_version: Option<u64>,
}

impl<P> PillarResult<P> {
    pub fn fresh(status: PillarStatus, rag_score: RagScore, data: P, now: DateTime<Utc>) -> Self {
        Self {
            status,
            rag_score,
            data: Some(data),
            last_fetched: now,
            error: None,
            carried_from_version: None,
        }
    }

    /// A pillar without fresh data (`error` or `skipped`).
    pub fn unavailable(status: PillarStatus, reason: String, now: DateTime<Utc>) -> Self {
        Self {
            status,
            rag_score: RagScore::Unknown,
            data: None,
            last_fetched: now,
            error: Some(reason),
            carried_from_version: None,
        }
    }

    /// True when the payload was carried over from an earlier snapshot.
    pub fn is_carried(&self) -> bool {
        self.carried_from_version.is_some() && self.data.is_some()
    }

    /// Status as seen by the document roll-up: carried data counts as
    /// `fallback` whatever the pillar's own status says.
    pub fn rollup_status(&self) -> PillarStatus {
        if self.is_carried() {
            PillarStatus::Fallback
        } else {
            self.status
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroPayload {
    pub fx_pair: String,
    #[serde(default)]
    pub current_rate: Option<f64>,
    #[serde(default)]
    pub reference_rate: Option<f64>,
    #[serde(default)]
    pub volatility_pct: Option<f64>,
    #[serde(default)]
    pub observation_date: Option<NaiveDate>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingSignal {
    pub company: String,
    pub form: String,
    #[serde(default)]
    pub filing_date: Option<NaiveDate>,
    pub items: Vec<String>,
    pub severity: RagScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeersPayload {
    pub total_peers: usize,
    pub total_red_signals: usize,
    pub total_amber_signals: usize,
    #[serde(default)]
    pub flagged_filings: Vec<FilingSignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppliersPayload {
    pub cyber_rag: RagScore,
    pub total_vulnerabilities: usize,
    pub recent_count: usize,
    pub critical_count: usize,
    #[serde(default)]
    pub recent_vulnerabilities: Vec<crate::feeds::Vulnerability>,
    pub total_suppliers: usize,
    pub suppliers_at_cyber_risk: usize,
    pub suppliers_at_news_risk: usize,
    #[serde(default)]
    pub sanctions_matches: usize,
    #[serde(default)]
    pub recall_matches: usize,
}

/// Static attributes of a watched company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityProfile {
    Supplier {
        category: String,
        segment: String,
        location: String,
        exposure: ExposureTier,
        #[serde(default)]
        stock_ticker: Option<String>,
    },
    Peer {
        #[serde(default)]
        ticker: Option<String>,
        region: String,
        #[serde(default)]
        cik: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityRef {
    #[serde(rename = "cveID")]
    pub cve_id: String,
    #[serde(rename = "vulnerabilityName")]
    pub vulnerability_name: String,
    #[serde(rename = "dateAdded", default)]
    pub date_added: Option<NaiveDate>,
}

/// Risk attributes derived from the current run's facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRisk {
    pub risk_level: RiskLevel,
    pub cyber_risk: bool,
    #[serde(default)]
    pub matching_vulnerabilities: Vec<VulnerabilityRef>,
    pub news_risk: bool,
    #[serde(default)]
    pub headlines: Vec<String>,
    pub market_risk: bool,
    #[serde(default)]
    pub daily_change_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filing_signal: Option<RagScore>,
    pub last_signal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub slug: String,
    pub profile: EntityProfile,
    pub risk: EntityRisk,
    /// Peers only: readable digest of recent filings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub source: String,
    pub message: String,
    pub time: DateTime<Utc>,
}

/// Maximum characters kept from a stats message.
pub const MAX_STAT_MESSAGE_CHARS: usize = 200;

/// Per-run tally of connector outcomes. Append-only within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestStats {
    pub started_at: DateTime<Utc>,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_successes: usize,
    #[serde(default)]
    pub errors: Vec<StatRecord>,
    #[serde(default)]
    pub warnings: Vec<StatRecord>,
    #[serde(default)]
    pub successes: Vec<StatRecord>,
    pub duration_seconds: f64,
}

impl HarvestStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            total_errors: 0,
            total_warnings: 0,
            total_successes: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            successes: Vec::new(),
            duration_seconds: 0.0,
        }
    }

    pub fn record_error(&mut self, source: &str, message: &str, time: DateTime<Utc>) {
        self.errors.push(stat_record(source, message, time));
        self.total_errors = self.errors.len();
    }

    pub fn record_warning(&mut self, source: &str, message: &str, time: DateTime<Utc>) {
        self.warnings.push(stat_record(source, message, time));
        self.total_warnings = self.warnings.len();
    }

    pub fn record_success(&mut self, source: &str, time: DateTime<Utc>) {
        self.successes.push(stat_record(source, "ok", time));
        self.total_successes = self.successes.len();
    }

    pub fn finish(&mut self, finished_at: DateTime<Utc>) {
        let elapsed = finished_at - self.started_at;
        self.duration_seconds = elapsed.num_milliseconds().max(0) as f64 / 1000.0;
    }

    /// Total records appended, one per connector outcome.
    pub fn outcome_count(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.successes.len()
    }
}

fn stat_record(source: &str, message: &str, time: DateTime<Utc>) -> StatRecord {
    StatRecord {
        source: source.to_string(),
        message: crate::text::truncate_chars(message, MAX_STAT_MESSAGE_CHARS),
        time,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHealth {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub pillars: BTreeMap<PillarKind, PillarStatus>,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceHealth>,
    pub errors_count: usize,
    pub warnings_count: usize,
    pub circuit_breaker_state: BreakerState,
}

/// The document handed to the presentation layer.
///
/// Field names are a compatibility contract: new fields must be optional
/// and existing ones must keep their meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u64,
    pub last_updated: DateTime<Utc>,
    pub status: SnapshotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(rename = "macro")]
    pub macro_pillar: PillarResult<MacroPayload>,
    pub peers: PillarResult<PeersPayload>,
    pub suppliers: PillarResult<SuppliersPayload>,
    #[serde(default)]
    pub supplier_watchlist: Vec<Entity>,
    #[serde(default)]
    pub peer_group: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvest_stats: Option<HarvestStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthStatus>,
}

impl Snapshot {
    pub fn pillar_status(&self, kind: PillarKind) -> PillarStatus {
        match kind {
            PillarKind::Macro => self.macro_pillar.status,
            PillarKind::Peers => self.peers.status,
            PillarKind::Suppliers => self.suppliers.status,
        }
    }

    pub fn pillar_statuses(&self) -> [(PillarKind, PillarStatus); 3] {
        PillarKind::ALL.map(|kind| (kind, self.pillar_status(kind)))
    }

    /// True when at least one pillar carries fresh data from this run.
    pub fn has_fresh_pillar(&self) -> bool {
        self.pillar_statuses()
            .iter()
            .any(|(_, status)| status.is_fresh())
    }

    /// Document status; a pillar serving carried-over data counts as
    /// `fallback` even when its own status is `skipped`.
    pub fn rollup_status(&self) -> SnapshotStatus {
        SnapshotStatus::from_pillars([
            self.macro_pillar.rollup_status(),
            self.peers.rollup_status(),
            self.suppliers.rollup_status(),
        ])
    }
}
