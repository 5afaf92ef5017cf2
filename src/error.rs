//! Error types for the aggregation engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while configuring or running a search.
#[derive(Error, Debug)]
pub enum SearchError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered with a non-success status code.
    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Source or overall deadline exceeded.
    #[error("Search timeout exceeded")]
    Timeout,

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid engine or source configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Classifies this error into the per-source outcome taxonomy.
    ///
    /// Errors that do not describe a transport or status problem are treated
    /// as parse failures: the source produced something the adapter could not
    /// turn into records.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Http(err) if err.is_timeout() => ErrorKind::Timeout,
            SearchError::Http(err) if err.is_status() => ErrorKind::HttpStatus,
            SearchError::Http(err) if err.is_decode() => ErrorKind::Parse,
            SearchError::Http(_) => ErrorKind::Network,
            SearchError::HttpStatus { .. } => ErrorKind::HttpStatus,
            SearchError::Timeout => ErrorKind::Timeout,
            SearchError::Parse(_)
            | SearchError::InvalidQuery(_)
            | SearchError::Config(_)
            | SearchError::UrlParse(_)
            | SearchError::Other(_) => ErrorKind::Parse,
        }
    }
}

/// Failure categories reported in per-source outcomes.
///
/// None of these ever reach the caller of [`crate::Search::search`]; they are
/// recorded alongside the result set instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Connection, DNS or TLS failure.
    #[serde(rename = "NetworkError")]
    Network,
    /// Non-success response code.
    #[serde(rename = "HTTPStatusError")]
    HttpStatus,
    /// Schema mismatch or no extractable structure.
    #[serde(rename = "ParseError")]
    Parse,
    /// Per-source timeout or overall deadline exceeded.
    #[serde(rename = "TimeoutError")]
    Timeout,
}

impl ErrorKind {
    /// Returns the stable name used in error strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NetworkError",
            ErrorKind::HttpStatus => "HTTPStatusError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Timeout => "TimeoutError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
