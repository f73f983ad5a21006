//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while building core configuration values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Alert threshold list was empty.
    #[error("alert thresholds must not be empty")]
    EmptyThresholds,

    /// Alert thresholds were not strictly descending.
    #[error("alert thresholds must be strictly descending, got {0:?}")]
    UnorderedThresholds(Vec<u32>),

    /// A threshold entry could not be parsed.
    #[error("invalid alert threshold: {0}")]
    InvalidThreshold(String),

    /// Language code is not one we have texts for.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// Errors returned by a queue feed.
///
/// None of these mean the store is closed. Closure is reported through
/// [`crate::StoreStatus`] on a successful snapshot.
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// Upstream could not be reached (network failure, timeout, non-2xx).
    #[error("queue feed unreachable: {0}")]
    Unreachable(String),

    /// Upstream answered with a body we could not understand.
    #[error("malformed queue feed response: {0}")]
    Malformed(String),

    /// The store id is not in the store directory.
    #[error("unknown store: {0}")]
    UnknownStore(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Result type for feed operations.
pub type FeedResult<T> = std::result::Result<T, FeedError>;

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FeedError::Malformed(e.to_string())
        } else {
            FeedError::Unreachable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Malformed(e.to_string())
    }
}
