//! Error types for Lakay.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sink '{sink}' failed: {message}")]
    Sink { sink: &'static str, message: String },

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap any displayable failure as a sink write error.
    pub fn sink(sink: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Sink {
            sink,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
