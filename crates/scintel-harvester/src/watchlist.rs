//! Built-in watchlists, used when the config file names none.

use crate::config::{PeerConfig, SupplierConfig};
use scintel_common::types::{EntityProfile, ExposureTier};
use scintel_sources::edgar::EdgarCompany;

const COMBUSTIBLES: &str = "Combustibles";
const NEW_CATEGORIES: &str = "New Categories (Vuse/Glo)";

/// Business segment a supplier category feeds into.
pub fn segment_for(category: &str) -> &'static str {
    match category {
        "EMS" | "Batteries" | "EE Component" | "Modern/Traditional Oral Fleece" | "Mechanical" => {
            NEW_CATEGORIES
        }
        _ => COMBUSTIBLES,
    }
}

fn supplier(
    name: &str,
    category: &str,
    location: &str,
    exposure: ExposureTier,
    ticker: Option<&str>,
) -> SupplierConfig {
    SupplierConfig {
        name: name.to_string(),
        category: category.to_string(),
        segment: None,
        location: Some(location.to_string()),
        exposure,
        stock_ticker: ticker.map(str::to_string),
        aliases: Vec::new(),
    }
}

pub fn default_suppliers() -> Vec<SupplierConfig> {
    use ExposureTier::*;
    let mut list = vec![
        supplier("AMCOR", "Printed Packaging", "USA", Critical, Some("AMCR")),
        supplier("GPI", "Printed Packaging", "USA", High, Some("GPI")),
        supplier("Stora Enso", "Printing Substrates", "Finland", Medium, Some("STERV.HE")),
        supplier("IP Sun", "Printing Substrates", "China", Medium, None),
        supplier("Sappi", "Printing Substrates", "South Africa", Medium, Some("SAP")),
        supplier("Daicel", "Filter Materials", "Japan", Medium, None),
        supplier("Eastman", "Filter Materials", "USA", Medium, Some("EMN")),
        supplier("Cerdia", "Filter Materials", "Germany", Medium, None),
        supplier("Tae Young Filters", "Filter Materials", "South Korea", Medium, None),
        supplier("Fuji", "Capsules", "Japan", Medium, None),
        supplier("SWM (Mativ)", "Fine Papers", "USA", Medium, Some("MATV")),
        supplier("Delfort", "Fine Papers", "Austria", Medium, None),
        supplier("CNT", "Nicotine", "China", Critical, None),
        supplier("ITC", "Nicotine", "India", High, Some("ITC.NS")),
        supplier("Porton", "Nicotine", "China", Medium, None),
        supplier("Tenowo", "Modern/Traditional Oral Fleece", "Germany", Medium, None),
        supplier("Huizhou BYD Electronic", "EMS", "China", Critical, None),
        supplier("Smoore", "EMS", "China", Critical, Some("6969.HK")),
        supplier("EVE Energy", "Batteries", "China", High, Some("300014.SZ")),
        supplier("Texas Instruments", "EE Component", "USA", High, Some("TXN")),
        supplier("Infineon", "EE Component", "Germany", High, Some("IFX.DE")),
        supplier("Weener", "Mechanical", "Netherlands", Medium, None),
        supplier("Rosti", "Mechanical", "Denmark", Medium, None),
        supplier("Jabil", "Mechanical", "USA", Medium, Some("JBL")),
    ];
    // Names as they appear in vendor and registrant fields.
    for (name, aliases) in [
        ("SWM (Mativ)", &["Mativ", "Schweitzer-Mauduit"][..]),
        ("Huizhou BYD Electronic", &["BYD Electronic"][..]),
        ("Smoore", &["Smoore International"][..]),
    ] {
        if let Some(s) = list.iter_mut().find(|s| s.name == name) {
            s.aliases = aliases.iter().map(|a| a.to_string()).collect();
        }
    }
    list
}

fn peer(name: &str, ticker: &str, region: &str, cik: Option<&str>) -> PeerConfig {
    PeerConfig {
        name: name.to_string(),
        ticker: Some(ticker.to_string()),
        region: region.to_string(),
        cik: cik.map(str::to_string),
        aliases: Vec::new(),
    }
}

pub fn default_peers() -> Vec<PeerConfig> {
    vec![
        peer("British American Tobacco", "BTI", "Global/US ADR", None),
        peer("Philip Morris Int.", "PM", "US", Some("0001413329")),
        peer("Imperial Brands", "IMB.L", "UK", None),
        peer("Japan Tobacco", "2914.T", "Japan", None),
    ]
}

impl SupplierConfig {
    pub fn profile(&self) -> EntityProfile {
        EntityProfile::Supplier {
            category: self.category.clone(),
            segment: self
                .segment
                .clone()
                .unwrap_or_else(|| segment_for(&self.category).to_string()),
            location: self.location.clone().unwrap_or_else(|| "Unknown".to_string()),
            exposure: self.exposure,
            stock_ticker: self.stock_ticker.clone(),
        }
    }
}

impl PeerConfig {
    pub fn profile(&self) -> EntityProfile {
        EntityProfile::Peer {
            ticker: self.ticker.clone(),
            region: self.region.clone(),
            cik: self.cik.clone(),
        }
    }
}

/// Peers tracked on EDGAR.
pub fn edgar_companies(peers: &[PeerConfig]) -> Vec<EdgarCompany> {
    peers
        .iter()
        .filter_map(|p| {
            p.cik.as_ref().map(|cik| EdgarCompany {
                name: p.name.clone(),
                cik: cik.clone(),
            })
        })
        .collect()
}

/// Every ticker on either watchlist.
pub fn market_tickers(suppliers: &[SupplierConfig], peers: &[PeerConfig]) -> Vec<String> {
    suppliers
        .iter()
        .filter_map(|s| s.stock_ticker.clone())
        .chain(peers.iter().filter_map(|p| p.ticker.clone()))
        .collect()
}
