//! CISA Known Exploited Vulnerabilities catalog.

use crate::error::{Result, SourceError};
use crate::http::FeedClient;
use crate::{into_feed_result, FetchContext, SourceConnector};
use chrono::NaiveDate;
use scintel_common::feeds::{FeedRecords, RawFeedResult, SourceKind, Vulnerability};
use serde::Deserialize;

pub const DEFAULT_URL: &str =
    "https://www.cisa.gov/sites/default/files/feeds/known_exploited_vulnerabilities.json";

#[derive(Debug, Deserialize)]
struct Catalog {
    vulnerabilities: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "cveID", default)]
    cve_id: Option<String>,
    #[serde(rename = "vendorProject", default)]
    vendor_project: Option<String>,
    #[serde(default)]
    product: Option<String>,
    #[serde(rename = "vulnerabilityName", default)]
    vulnerability_name: Option<String>,
    #[serde(rename = "dateAdded", default)]
    date_added: Option<String>,
    #[serde(rename = "knownRansomwareCampaignUse", default)]
    known_ransomware: Option<serde_json::Value>,
}

fn ransomware_flag(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => {
            s.eq_ignore_ascii_case("known") || s.eq_ignore_ascii_case("true")
        }
        _ => false,
    }
}

/// Decode the catalog. Entries without a CVE id are dropped; entries with an
/// unparseable `dateAdded` are kept without a date.
pub fn parse_catalog(body: &str) -> Result<Vec<Vulnerability>> {
    let catalog: Catalog = serde_json::from_str(body)?;

    let vulnerabilities = catalog
        .vulnerabilities
        .into_iter()
        .filter_map(|entry| {
            let cve_id = entry.cve_id.filter(|id| !id.trim().is_empty())?;
            let date_added = entry
                .date_added
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
            Some(Vulnerability {
                known_ransomware: ransomware_flag(entry.known_ransomware.as_ref()),
                cve_id,
                vendor_project: entry.vendor_project.unwrap_or_default(),
                product: entry.product.unwrap_or_default(),
                vulnerability_name: entry.vulnerability_name.unwrap_or_default(),
                date_added,
            })
        })
        .collect();

    Ok(vulnerabilities)
}

pub struct KevConnector {
    client: FeedClient,
    url: String,
}

impl KevConnector {
    pub fn new(client: FeedClient, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(SourceError::Config("cisa_kev url is empty".to_string()));
        }
        Ok(Self { client, url })
    }
}

#[async_trait::async_trait]
impl SourceConnector for KevConnector {
    fn source(&self) -> SourceKind {
        SourceKind::CisaKev
    }

    async fn fetch(&self, ctx: &FetchContext) -> RawFeedResult {
        let attempted = self
            .client
            .get_text(self.source(), &self.url, &[], &[])
            .await
            .map(|body| parse_catalog(&body).map(FeedRecords::Vulnerabilities));
        into_feed_result(self.source(), attempted, ctx.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "title": "CISA Catalog of Known Exploited Vulnerabilities",
        "catalogVersion": "2024.10.01",
        "count": 4,
        "vulnerabilities": [
            {
                "cveID": "CVE-2024-0001",
                "vendorProject": "Infineon",
                "product": "AURIX",
                "vulnerabilityName": "Infineon AURIX Buffer Overflow",
                "dateAdded": "2024-09-30",
                "knownRansomwareCampaignUse": "Known"
            },
            {
                "cveID": "CVE-2024-0002",
                "vendorProject": "Acme",
                "product": "Router",
                "vulnerabilityName": "Acme Router Command Injection",
                "dateAdded": "not-a-date",
                "knownRansomwareCampaignUse": "Unknown"
            },
            {
                "vendorProject": "NoId",
                "product": "Widget",
                "dateAdded": "2024-09-29"
            },
            {
                "cveID": "CVE-2024-0003",
                "dateAdded": "2024-09-28",
                "knownRansomwareCampaignUse": true,
                "notes": "extra fields are ignored"
            }
        ]
    }"#;

    #[test]
    fn should_parse_catalog_and_tolerate_drift() {
        let vulns = parse_catalog(SAMPLE).unwrap();
        assert_eq!(vulns.len(), 3);

        assert_eq!(vulns[0].cve_id, "CVE-2024-0001");
        assert!(vulns[0].known_ransomware);
        assert_eq!(vulns[0].date_added, NaiveDate::from_ymd_opt(2024, 9, 30));

        assert!(!vulns[1].known_ransomware);
        assert_eq!(vulns[1].date_added, None);

        assert!(vulns[2].known_ransomware);
        assert_eq!(vulns[2].vendor_project, "");
    }

    #[test]
    fn should_reject_payload_without_catalog() {
        let err = parse_catalog(r#"{"message": "maintenance"}"#).unwrap_err();
        assert_eq!(err.class(), scintel_common::feeds::FailureClass::Malformed);

        assert!(parse_catalog("<html>").is_err());
    }
}
