//! Error types for the search library.

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Invalid query or malformed configuration input. Never retried.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// HTTP request failed (connect, reset, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response status marks the attempt as failed.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The proxy pool is empty and no source yielded a new proxy.
    #[error("All proxies exhausted")]
    ProxiesExhausted,

    /// The source denied access in the page content itself.
    #[error("Access denied by {engine}: {reason}")]
    ContentBan { engine: String, reason: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Context key is absent.
    #[error("Missing context key '{0}'")]
    MissingKey(String),

    /// Context key holds a value of another type.
    #[error("Context key '{key}' is not {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// I/O error while reading local input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write delimited output.
    #[error("Failed to write output: {0}")]
    Output(#[from] csv::Error),
}

impl SearchError {
    /// Returns whether the error should rotate the proxy and retry.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, SearchError::Http(_) | SearchError::Transport(_))
    }
}
