//! Error types for the IDC resolver
//!
//! Nothing in here ever reaches a lookup caller: lookups degrade to
//! [`Datacenter::Unknown`](crate::Datacenter::Unknown). Errors are only
//! returned from refresh, configuration and source operations.

use thiserror::Error;

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the IDC resolver
#[derive(Error, Debug)]
pub enum Error {
    /// A segment source could not produce any lines
    #[error("Segment source unavailable: {0}")]
    SourceUnavailable(String),

    /// Region catalogue could not be loaded
    #[error("Region catalogue error: {0}")]
    Region(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a source-unavailable error
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create a region catalogue error
    pub fn region(msg: impl Into<String>) -> Self {
        Self::Region(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
