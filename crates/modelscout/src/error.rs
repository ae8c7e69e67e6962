//! Error taxonomy for controller operations
//!
//! Every variant renders as its bare message so it can go straight into the
//! error banner.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Missing or invalid input, caught before any network call
    #[error("{0}")]
    Validation(String),
    /// Non-success HTTP status from the scan service
    #[error("{0}")]
    Transport(String),
    /// Success status, but the payload carried an `error` field
    #[error("{0}")]
    Service(String),
    /// Anything else: connection failures, malformed bodies
    #[error("{0}")]
    Unexpected(String),
}

impl SearchError {
    pub fn message(&self) -> &str {
        match self {
            SearchError::Validation(msg)
            | SearchError::Transport(msg)
            | SearchError::Service(msg)
            | SearchError::Unexpected(msg) => msg,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Unexpected(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Unexpected(err.to_string())
    }
}
