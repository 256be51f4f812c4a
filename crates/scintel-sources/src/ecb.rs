//! ECB reference exchange rates (data API, CSV).

use crate::error::{Result, SourceError};
use crate::http::FeedClient;
use crate::{into_feed_result, FetchContext, SourceConnector};
use chrono::NaiveDate;
use scintel_common::feeds::{FeedRecords, FxObservation, RawFeedResult, SourceKind};

pub const DEFAULT_URL: &str = "https://data-api.ecb.europa.eu/service/data/EXR/D.USD.EUR.SP00.A";
pub const DEFAULT_OBSERVATIONS: u32 = 5;

const DATE_COLUMN: &str = "TIME_PERIOD";
const VALUE_COLUMN: &str = "OBS_VALUE";

/// Decode a `format=csvdata` response into observations sorted by date.
///
/// Columns are located by header name so added or reordered columns do not
/// break the parse. Cells that do not parse become `None`.
pub fn parse_csv(body: &str) -> Result<Vec<FxObservation>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SourceError::Malformed(format!("missing {name} column")))
    };
    let date_idx = column(DATE_COLUMN)?;
    let value_idx = column(VALUE_COLUMN)?;

    let mut observations = Vec::new();
    for record in reader.records() {
        let record = record?;
        let date = record
            .get(date_idx)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        let rate = record
            .get(value_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0);
        observations.push(FxObservation { date, rate });
    }

    // Undated rows sort first so they never become the latest observation.
    observations.sort_by_key(|o| o.date);
    Ok(observations)
}

pub struct EcbConnector {
    client: FeedClient,
    url: String,
    observations: u32,
}

impl EcbConnector {
    pub fn new(client: FeedClient, url: impl Into<String>, observations: u32) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(SourceError::Config("ecb_fx url is empty".to_string()));
        }
        Ok(Self {
            client,
            url,
            observations: observations.max(1),
        })
    }
}

#[async_trait::async_trait]
impl SourceConnector for EcbConnector {
    fn source(&self) -> SourceKind {
        SourceKind::EcbFx
    }

    async fn fetch(&self, ctx: &FetchContext) -> RawFeedResult {
        let query = [
            ("lastNObservations", self.observations.to_string()),
            ("format", "csvdata".to_string()),
        ];
        let attempted = self
            .client
            .get_text(self.source(), &self.url, &query, &[])
            .await
            .map(|body| parse_csv(&body).map(FeedRecords::FxRates));
        into_feed_result(self.source(), attempted, ctx.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_locate_columns_by_header_name() {
        let body = "\
KEY,FREQ,CURRENCY,CURRENCY_DENOM,EXR_TYPE,EXR_SUFFIX,TIME_PERIOD,OBS_VALUE,OBS_STATUS
EXR.D.USD.EUR.SP00.A,D,USD,EUR,SP00,A,2024-10-02,1.1052,A
EXR.D.USD.EUR.SP00.A,D,USD,EUR,SP00,A,2024-10-01,1.1100,A
EXR.D.USD.EUR.SP00.A,D,USD,EUR,SP00,A,2024-10-03,NaN,A
";
        let obs = parse_csv(body).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].date, NaiveDate::from_ymd_opt(2024, 10, 1));
        assert_eq!(obs[0].rate, Some(1.11));
        assert_eq!(obs[1].rate, Some(1.1052));
        assert_eq!(obs[2].rate, None);
    }

    #[test]
    fn should_fail_when_value_column_is_missing() {
        let err = parse_csv("KEY,TIME_PERIOD\nX,2024-10-01\n").unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn should_return_no_observations_for_header_only_payload() {
        let obs = parse_csv("TIME_PERIOD,OBS_VALUE\n").unwrap();
        assert!(obs.is_empty());
    }
}
