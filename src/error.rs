use chrono::NaiveDate;
use thiserror::Error;

/// Request-fatal failures: rejected immediately, no partial processing.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("missing or malformed request date: {0:?}")]
    InvalidDate(String),

    #[error("feature collection is empty")]
    EmptyFeatureSet,

    #[error("enrichment incomplete: {finished} of {total} clusters finished before the deadline")]
    Incomplete { finished: usize, total: usize },
}

/// Failures of one external data source. The affected attribute stays unset
/// for the batch; the request itself continues.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("empty payload")]
    EmptyPayload,

    #[error("undecodable payload: {0}")]
    Decode(String),
}

/// Per-feature data failures: the feature is excluded from the affected
/// enrichment and reported, the batch continues.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("road length is negative for {road}: {start}..{end}")]
    NegativeLength { road: String, start: i64, end: i64 },

    #[error("unparseable chainage {value:?} for {road}")]
    Chainage { road: String, value: String },

    #[error("no deposit coverage at ({x}, {y})")]
    NoCoverage { x: f64, y: f64 },
}

/// Parse the request `time` parameter: an ISO 8601 date or date-time,
/// truncated to the date component. Example: `2021-03-01T00:00:00Z` →
/// 2021-03-01.
pub fn parse_request_date(raw: &str) -> Result<NaiveDate, EnrichError> {
    let date_part = raw.split('T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| EnrichError::InvalidDate(raw.to_string()))
}
