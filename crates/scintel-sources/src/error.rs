use scintel_common::feeds::FailureClass;

/// Errors a connector can hit while fetching or decoding a feed.
///
/// Connectors never return these past their own boundary; [`SourceError::class`]
/// maps each one onto the failure class recorded in the feed result.
///
/// # Examples
///
/// ```rust
/// use scintel_common::feeds::FailureClass;
/// use scintel_sources::error::SourceError;
///
/// let err = SourceError::HttpStatus { status: 503, body: "busy".to_string() };
/// assert_eq!(err.class(), FailureClass::Transient);
/// assert!(err.to_string().contains("503"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Non-2xx response from the source.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Any other transport failure reported by `reqwest`.
    #[error("network error: {0}")]
    Network(String),

    /// JSON payload could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV payload could not be decoded.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The payload decoded but does not have the expected shape.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The connector is misconfigured (bad URL, missing identifiers).
    #[error("configuration error: {0}")]
    Config(String),
}

impl SourceError {
    pub fn class(&self) -> FailureClass {
        match self {
            SourceError::Timeout(_) | SourceError::Connect(_) | SourceError::Network(_) => {
                FailureClass::Transient
            }
            SourceError::HttpStatus { status, .. } if *status >= 500 => FailureClass::Transient,
            SourceError::HttpStatus { .. } | SourceError::Config(_) => FailureClass::Permanent,
            SourceError::Json(_) | SourceError::Csv(_) | SourceError::Malformed(_) => {
                FailureClass::Malformed
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == FailureClass::Transient
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_connect() {
            SourceError::Connect(err.to_string())
        } else if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else if err.is_builder() {
            SourceError::Config(err.to_string())
        } else if let Some(status) = err.status() {
            SourceError::HttpStatus {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, SourceError>;
