//! Builds the run's [`Snapshot`] from connector results.
//!
//! Each pillar takes its status from its sources: the primary source decides
//! between `error`, `skipped` and fresh data, the secondary sources can only
//! downgrade fresh data to `partial`. Entities are scored on every run from
//! whatever facts arrived, even when their pillar failed.

use crate::config::{PeerConfig, SupplierConfig};
use crate::context::RunContext;
use scintel_common::feeds::{
    CompanyFilings, FeedOutcome, FeedRecords, FxObservation, MarketQuote, RawFeedResult,
    RecallNotice, SanctionEntry, SourceKind, Vulnerability,
};
use scintel_common::text::slugify;
use scintel_common::types::{
    Entity, MacroPayload, PeersPayload, PillarResult, PillarStatus, RiskLevel, Snapshot,
    SnapshotStatus, SuppliersPayload,
};
use scintel_risk::rules::cyber::{assess_cyber, CyberAssessment};
use scintel_risk::rules::entity::{
    assess_entity, headlines_for, matching_vulnerabilities, EntitySignals, Identifiers,
};
use scintel_risk::rules::filings::{assess_filings, company_rag, peer_summary};
use scintel_risk::rules::fx::{assess_fx, macro_summary};
use scintel_risk::rules::supplier::{supplier_pillar_rag, watchlist_rag};
use std::collections::BTreeMap;


const MACRO_PRIMARY: SourceKind = SourceKind::EcbFx;
const PEERS_PRIMARY: SourceKind = SourceKind::SecEdgar;
const PEERS_SECONDARY: [SourceKind; 1] = [SourceKind::MarketQuotes];
const SUPPLIERS_PRIMARY: SourceKind = SourceKind::CisaKev;
const SUPPLIERS_SECONDARY: [SourceKind; 2] = [SourceKind::OfacSanctions, SourceKind::FdaRecalls];

/// The run's results, one per source.
pub struct FeedSet<'a> {
    by_source: BTreeMap<SourceKind, &'a RawFeedResult>,
}

impl<'a> FeedSet<'a> {
    pub fn new(results: &'a [RawFeedResult]) -> Self {
        Self {
            by_source: results.iter().map(|r| (r.source, r)).collect(),
        }
    }

    pub fn get(&self, source: SourceKind) -> Option<&'a RawFeedResult> {
        self.by_source.get(&source).copied()
    }

    fn records(&self, source: SourceKind) -> Option<&'a FeedRecords> {
        self.get(source).map(|r| &r.records)
    }

    pub fn vulnerabilities(&self) -> &'a [Vulnerability] {
        match self.records(SourceKind::CisaKev) {
            Some(FeedRecords::Vulnerabilities(v)) => v,
            _ => &[],
        }
    }

    pub fn fx_rates(&self) -> &'a [FxObservation] {
        match self.records(SourceKind::EcbFx) {
            Some(FeedRecords::FxRates(v)) => v,
            _ => &[],
        }
    }

    pub fn filings(&self) -> &'a [CompanyFilings] {
        match self.records(SourceKind::SecEdgar) {
            Some(FeedRecords::Filings(v)) => v,
            _ => &[],
        }
    }

    pub fn sanctions(&self) -> &'a [SanctionEntry] {
        match self.records(SourceKind::OfacSanctions) {
            Some(FeedRecords::Sanctions(v)) => v,
            _ => &[],
        }
    }

    pub fn recalls(&self) -> &'a [RecallNotice] {
        match self.records(SourceKind::FdaRecalls) {
            Some(FeedRecords::Recalls(v)) => v,
            _ => &[],
        }
    }

    pub fn quotes(&self) -> &'a [MarketQuote] {
        match self.records(SourceKind::MarketQuotes) {
            Some(FeedRecords::Quotes(v)) => v,
            _ => &[],
        }
    }

    fn daily_change(&self, ticker: Option<&str>) -> Option<f64> {
        let ticker = ticker?;
        self.quotes()
            .iter()
            .find(|q| q.ticker.eq_ignore_ascii_case(ticker))
            .and_then(MarketQuote::daily_change_pct)
    }
}

/// Status of a pillar from its sources' outcomes, with the reason when no
/// fresh data is available.
pub fn pillar_status(
    feeds: &FeedSet<'_>,
    primary: SourceKind,
    secondaries: &[SourceKind],
) -> (PillarStatus, Option<String>) {
    let Some(result) = feeds.get(primary) else {
        return (PillarStatus::Skipped, Some(format!("{primary} is disabled")));
    };

    match &result.outcome {
        FeedOutcome::Error { message, .. } => {
            (PillarStatus::Error, Some(format!("{primary}: {message}")))
        }
        FeedOutcome::Skipped => (
            PillarStatus::Skipped,
            Some(format!("{primary} skipped: circuit breaker open")),
        ),
        FeedOutcome::Empty => (PillarStatus::Partial, None),
        FeedOutcome::Success => {
            let degraded = secondaries.iter().any(|s| {
                feeds
                    .get(*s)
                    .is_some_and(|r| !matches!(r.outcome, FeedOutcome::Success))
            });
            if degraded {
                (PillarStatus::Partial, None)
            } else {
                (PillarStatus::Success, None)
            }
        }
    }
}

/// Shared per-run facts every entity is scored against.
struct EntityFacts<'a> {
    feeds: &'a FeedSet<'a>,
    cyber: &'a CyberAssessment,
}

impl EntityFacts<'_> {
    fn signals(&self, ids: Identifiers<'_>, ticker: Option<&str>) -> EntitySignals {
        EntitySignals {
            matching_vulnerabilities: matching_vulnerabilities(ids, &self.cyber.recent),
            headlines: headlines_for(ids, self.feeds.recalls(), self.feeds.sanctions()),
            daily_change_pct: self.feeds.daily_change(ticker),
            filing_rag: None,
        }
    }
}

pub fn assemble(ctx: &RunContext<'_>, results: &[RawFeedResult]) -> Snapshot {
    let feeds = FeedSet::new(results);
    let cyber = assess_cyber(feeds.vulnerabilities(), ctx.thresholds(), ctx.now);
    let facts = EntityFacts {
        feeds: &feeds,
        cyber: &cyber,
    };

    let macro_pillar = macro_pillar(ctx, &feeds);
    let (peers, peer_group) = peers_pillar(ctx, &facts);
    let (suppliers, supplier_watchlist) = suppliers_pillar(ctx, &facts);

    let mut snapshot = Snapshot {
        version: ctx.next_version(),
        last_updated: ctx.now,
        status: SnapshotStatus::Healthy,
        content_hash: None,
        macro_pillar,
        peers,
        suppliers,
        supplier_watchlist,
        peer_group,
        harvest_stats: None,
        health: None,
    };
    snapshot.status = snapshot.rollup_status();
    snapshot.health = Some(
        ctx.tracker
            .health_status(snapshot.pillar_statuses().into_iter().collect()),
    );

    for (kind, status) in snapshot.pillar_statuses() {
        tracing::debug!(pillar = %kind, status = %status, "Pillar assembled");
    }
    snapshot
}

fn macro_pillar(ctx: &RunContext<'_>, feeds: &FeedSet<'_>) -> PillarResult<MacroPayload> {
    let (status, reason) = pillar_status(feeds, MACRO_PRIMARY, &[]);
    if !status.is_fresh() {
        return PillarResult::unavailable(status, reason.unwrap_or_default(), ctx.now);
    }

    let fx = assess_fx(feeds.fx_rates(), ctx.previous_fx_rate(), ctx.thresholds());
    let status = if fx.volatility_pct.is_none() {
        PillarStatus::Partial
    } else {
        status
    };
    let pair = &ctx.config.fx_pair;
    let payload = MacroPayload {
        fx_pair: pair.clone(),
        current_rate: fx.current_rate,
        reference_rate: fx.reference_rate,
        volatility_pct: fx.volatility_pct,
        observation_date: fx.observation_date,
        summary: macro_summary(pair, &fx, ctx.thresholds()),
    };
    PillarResult::fresh(status, fx.rag, payload, ctx.now)
}

fn peers_pillar(
    ctx: &RunContext<'_>,
    facts: &EntityFacts<'_>,
) -> (PillarResult<PeersPayload>, Vec<Entity>) {
    let filings = facts.feeds.filings();
    let peer_group = ctx
        .config
        .peers
        .iter()
        .map(|peer| peer_entity(ctx, facts, peer, filings))
        .collect();

    let (mut status, reason) = pillar_status(facts.feeds, PEERS_PRIMARY, &PEERS_SECONDARY);
    if !status.is_fresh() {
        let pillar = PillarResult::unavailable(status, reason.unwrap_or_default(), ctx.now);
        return (pillar, peer_group);
    }
    if filings.iter().any(|c| c.fetch_error.is_some()) {
        status = PillarStatus::Partial;
    }

    let assessment = assess_filings(filings, ctx.thresholds(), ctx.now);
    let payload = PeersPayload {
        total_peers: ctx.config.peers.len(),
        total_red_signals: assessment.red_signals,
        total_amber_signals: assessment.amber_signals,
        flagged_filings: assessment.flagged,
    };
    (
        PillarResult::fresh(status, assessment.rag, payload, ctx.now),
        peer_group,
    )
}

fn peer_entity(
    ctx: &RunContext<'_>,
    facts: &EntityFacts<'_>,
    peer: &PeerConfig,
    filings: &[CompanyFilings],
) -> Entity {
    let ids = Identifiers::new(&peer.name, &peer.aliases);
    let company = filings.iter().find(|c| c.company == peer.name);

    let mut signals = facts.signals(ids, peer.ticker.as_deref());
    signals.filing_rag = company
        .filter(|c| c.fetch_error.is_none())
        .map(|c| company_rag(c, ctx.thresholds(), ctx.now));

    Entity {
        name: peer.name.clone(),
        slug: slugify(&peer.name),
        profile: peer.profile(),
        risk: assess_entity(&peer.name, &signals, ctx.thresholds()),
        summary: Some(peer_summary(company, ctx.thresholds(), ctx.now)),
    }
}

fn suppliers_pillar(
    ctx: &RunContext<'_>,
    facts: &EntityFacts<'_>,
) -> (PillarResult<SuppliersPayload>, Vec<Entity>) {
    let sanctions = facts.feeds.sanctions();
    let recalls = facts.feeds.recalls();
    let mut sanctions_matches = 0;
    let mut recall_matches = 0;

    let watchlist: Vec<Entity> = ctx
        .config
        .suppliers
        .iter()
        .map(|supplier| {
            let ids = Identifiers::new(&supplier.name, &supplier.aliases);
            sanctions_matches += sanctions.iter().filter(|s| ids.found_in(&s.name)).count();
            recall_matches += recalls
                .iter()
                .filter(|r| ids.found_in(&r.recalling_firm))
                .count();
            supplier_entity(ctx, facts, supplier, ids)
        })
        .collect();

    let (status, reason) = pillar_status(facts.feeds, SUPPLIERS_PRIMARY, &SUPPLIERS_SECONDARY);
    if !status.is_fresh() {
        let pillar = PillarResult::unavailable(status, reason.unwrap_or_default(), ctx.now);
        return (pillar, watchlist);
    }

    let levels: Vec<RiskLevel> = watchlist.iter().map(|e| e.risk.risk_level).collect();
    let rag = supplier_pillar_rag(facts.cyber.rag, watchlist_rag(&levels, ctx.thresholds()));
    let cyber = facts.cyber;
    let payload = SuppliersPayload {
        cyber_rag: cyber.rag,
        total_vulnerabilities: cyber.total_vulnerabilities,
        recent_count: cyber.recent.len(),
        critical_count: cyber.critical_count,
        recent_vulnerabilities: cyber
            .recent
            .iter()
            .take(ctx.thresholds().max_recent_vulnerabilities)
            .cloned()
            .collect(),
        total_suppliers: watchlist.len(),
        suppliers_at_cyber_risk: watchlist.iter().filter(|e| e.risk.cyber_risk).count(),
        suppliers_at_news_risk: watchlist.iter().filter(|e| e.risk.news_risk).count(),
        sanctions_matches,
        recall_matches,
    };
    (PillarResult::fresh(status, rag, payload, ctx.now), watchlist)
}

fn supplier_entity(
    ctx: &RunContext<'_>,
    facts: &EntityFacts<'_>,
    supplier: &SupplierConfig,
    ids: Identifiers<'_>,
) -> Entity {
    let signals = facts.signals(ids, supplier.stock_ticker.as_deref());
    Entity {
        name: supplier.name.clone(),
        slug: slugify(&supplier.name),
        profile: supplier.profile(),
        risk: assess_entity(&supplier.name, &signals, ctx.thresholds()),
        summary: None,
    }
}
