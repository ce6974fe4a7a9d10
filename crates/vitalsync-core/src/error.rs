//! Error types.
//!
//! Source failures never escape the engine: they are absorbed and reported as
//! "no data" for the affected metric. The only errors a caller sees come from
//! constructing inputs (ranges, catalogs, config files).

use chrono::NaiveDate;
use thiserror::Error;

/// Failure reported by a native or cloud source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Transport-level failure (DNS, connect, reset, TLS).
    #[error("network error: {0}")]
    Network(String),
    /// Credentials missing, expired or rejected.
    #[error("not authorized")]
    Unauthorized,
    /// The service answered with a non-success status.
    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },
    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
    /// The source does not serve this metric.
    #[error("metric '{0}' is not supported by this source")]
    Unsupported(String),
    /// The platform store rejected or failed the read.
    #[error("platform error: {0}")]
    Platform(String),
}

/// A date range that violates the caller contract.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("range end {end} precedes start {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("a window must span at least one day")]
    EmptyWindow,
}

/// Catalog construction failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate metric id '{0}'")]
    DuplicateId(String),
}

/// Engine configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
