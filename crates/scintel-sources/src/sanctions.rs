//! OFAC Specially Designated Nationals list (CSV, no header row).

use crate::error::{Result, SourceError};
use crate::http::FeedClient;
use crate::{into_feed_result, FetchContext, SourceConnector};
use scintel_common::feeds::{FeedRecords, RawFeedResult, SanctionEntry, SourceKind};

pub const DEFAULT_URL: &str = "https://www.treasury.gov/ofac/downloads/sdn.csv";

// Column positions: ent_num, SDN_Name, SDN_Type, Program, ...
const NAME_COLUMN: usize = 1;
const TYPE_COLUMN: usize = 2;
const PROGRAM_COLUMN: usize = 3;

/// OFAC writes `-0-` for empty cells.
fn cell(record: &csv::StringRecord, idx: usize) -> String {
    match record.get(idx).map(str::trim) {
        Some("-0-") | None => String::new(),
        Some(value) => value.to_string(),
    }
}

pub fn parse_sdn(body: &str) -> Result<Vec<SanctionEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = 0usize;
    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows += 1;
        if record.len() <= PROGRAM_COLUMN {
            continue;
        }
        let name = cell(&record, NAME_COLUMN);
        if name.is_empty() {
            continue;
        }
        entries.push(SanctionEntry {
            name,
            entity_type: cell(&record, TYPE_COLUMN),
            programs: cell(&record, PROGRAM_COLUMN),
        });
    }

    if rows > 0 && entries.is_empty() {
        return Err(SourceError::Malformed(format!(
            "{rows} rows but no SDN entries"
        )));
    }

    Ok(entries)
}

pub struct SanctionsConnector {
    client: FeedClient,
    url: String,
}

impl SanctionsConnector {
    pub fn new(client: FeedClient, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(SourceError::Config("ofac_sanctions url is empty".to_string()));
        }
        Ok(Self { client, url })
    }
}

#[async_trait::async_trait]
impl SourceConnector for SanctionsConnector {
    fn source(&self) -> SourceKind {
        SourceKind::OfacSanctions
    }

    async fn fetch(&self, ctx: &FetchContext) -> RawFeedResult {
        let attempted = self
            .client
            .get_text(self.source(), &self.url, &[], &[])
            .await
            .map(|body| parse_sdn(&body).map(FeedRecords::Sanctions));
        into_feed_result(self.source(), attempted, ctx.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_read_fields_by_position() {
        let body = "\
36,\"AEROCARIBBEAN AIRLINES\",-0- ,\"CUBA\",-0- ,-0- ,-0- ,-0- ,-0- ,-0- ,-0- ,-0-
173,\"ANGLO-CARIBBEAN CO., LTD.\",-0- ,\"CUBA\",-0- ,-0- ,-0- ,-0- ,-0- ,-0- ,-0- ,-0-
306,\"BANCO NACIONAL DE CUBA\",-0- ,\"CUBA\",-0- ,-0- ,-0- ,-0- ,-0- ,-0- ,-0- ,\"a.k.a. 'BNC'.\"
2674,\"ABBAS, Abu\",\"individual\",\"SDGT\",-0- ,-0- ,-0- ,-0- ,-0- ,-0- ,-0- ,-0-
\u{1a}
";
        let entries = parse_sdn(body).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1].name, "ANGLO-CARIBBEAN CO., LTD.");
        assert_eq!(entries[1].entity_type, "");
        assert_eq!(entries[1].programs, "CUBA");
        assert_eq!(entries[3].entity_type, "individual");
    }

    #[test]
    fn should_reject_non_csv_payload() {
        let err = parse_sdn("<html><body>Service unavailable</body></html>\n").unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn should_accept_empty_list() {
        assert!(parse_sdn("").unwrap().is_empty());
    }
}
