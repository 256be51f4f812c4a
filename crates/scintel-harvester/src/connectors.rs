use crate::config::{Config, SourcesConfig};
use crate::watchlist;
use scintel_common::feeds::SourceKind;
use scintel_sources::ecb::EcbConnector;
use scintel_sources::edgar::EdgarConnector;
use scintel_sources::error::Result as SourceResult;
use scintel_sources::kev::KevConnector;
use scintel_sources::market::MarketConnector;
use scintel_sources::recalls::RecallsConnector;
use scintel_sources::sanctions::SanctionsConnector;
use scintel_sources::{FeedClient, SourceConnector};
use std::sync::Arc;

/// Connectors for the enabled sources of one run.
#[derive(Default)]
pub struct ConnectorPlan {
    pub connectors: Vec<Arc<dyn SourceConnector>>,
    /// Enabled sources whose connector could not be built, with the reason.
    pub misconfigured: Vec<(SourceKind, String)>,
}

impl ConnectorPlan {
    pub fn from_connectors(connectors: Vec<Arc<dyn SourceConnector>>) -> Self {
        Self {
            connectors,
            misconfigured: Vec::new(),
        }
    }

    /// Sources this plan yields a result for.
    pub fn sources(&self) -> Vec<SourceKind> {
        let mut sources: Vec<SourceKind> = self
            .connectors
            .iter()
            .map(|c| c.source())
            .chain(self.misconfigured.iter().map(|(s, _)| *s))
            .collect();
        sources.sort();
        sources.dedup();
        sources
    }
}

/// Build one connector per enabled source. A connector that cannot be built
/// is reported in the plan instead of failing the run.
pub fn build(config: &Config) -> ConnectorPlan {
    let enabled = config.sources.enabled();
    let client = match FeedClient::new(&config.http.settings()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            return ConnectorPlan {
                connectors: Vec::new(),
                misconfigured: enabled.into_iter().map(|s| (s, e.to_string())).collect(),
            };
        }
    };

    let mut plan = ConnectorPlan::default();
    for source in enabled {
        match build_one(config, &client, source) {
            Ok(connector) => plan.connectors.push(connector),
            Err(e) => {
                tracing::error!(source = %source, error = %e, "Connector misconfigured");
                plan.misconfigured.push((source, e.to_string()));
            }
        }
    }
    plan
}

fn build_one(
    config: &Config,
    client: &FeedClient,
    source: SourceKind,
) -> SourceResult<Arc<dyn SourceConnector>> {
    let sources = &config.sources;
    let settings = sources.get(source);
    let url = settings.url_or(SourcesConfig::default_url(source));
    let client = client
        .clone()
        .with_source_headers(source, settings.header_pairs());

    let connector: Arc<dyn SourceConnector> = match source {
        SourceKind::CisaKev => Arc::new(KevConnector::new(client, url)?),
        SourceKind::EcbFx => Arc::new(EcbConnector::new(client, url, sources.ecb.observations)?),
        SourceKind::SecEdgar => Arc::new(EdgarConnector::new(
            client,
            url,
            watchlist::edgar_companies(&config.peers),
            sources.edgar.max_filings,
        )?),
        SourceKind::OfacSanctions => Arc::new(SanctionsConnector::new(client, url)?),
        SourceKind::FdaRecalls => Arc::new(RecallsConnector::new(
            client,
            url,
            sources.fda.api_key.clone(),
            sources.fda.limit,
        )?),
        SourceKind::MarketQuotes => Arc::new(
            MarketConnector::new(
                client,
                url,
                watchlist::market_tickers(&config.suppliers, &config.peers),
            )
            .with_budget(config.http.partial_budget()),
        ),
    };
    Ok(connector)
}
