//! Error taxonomy for the search → warehouse pipeline.
//!
//! | Type | Recoverable | Where it stops |
//! |------|-------------|----------------|
//! | [`ConfigError`] | no | before any input is accepted |
//! | [`SearchError`] | yes | the controller, which returns to idle |
//! | [`IngestError`] | yes | the controller; display still proceeds |
//! | [`CompletionError`] | yes | the debate generator, per side |
//!
//! An empty search result is not an error and has no variant here.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Startup-time configuration failure. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing {what}: set the {env} environment variable")]
    MissingSecret { what: &'static str, env: String },

    #[error("{0}")]
    Invalid(String),
}

/// Failure of the outbound search call.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("search timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("search request failed: {0}")]
    Transport(String),

    #[error("search provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("invalid search response: {0}")]
    Decode(String),
}

impl SearchError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            SearchError::Timeout(timeout)
        } else if err.is_decode() {
            SearchError::Decode(err.to_string())
        } else {
            SearchError::Transport(err.to_string())
        }
    }
}

/// Failure of a warehouse batch write. The batch has been rolled back by the
/// time this is observed.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("warehouse write timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("warehouse error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("warehouse rejected the batch: {0}")]
    Rejected(String),
}

/// Failure of an LLM completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("{0}")]
    InvalidInput(String),

    #[error("completion timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("completion provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("invalid completion response: {0}")]
    Decode(String),
}

impl CompletionError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout(timeout)
        } else if err.is_decode() {
            CompletionError::Decode(err.to_string())
        } else {
            CompletionError::Transport(err.to_string())
        }
    }
}
