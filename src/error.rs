//! Custom error types for archivist

use thiserror::Error;

/// Main error type for archivist operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document already exists: {0}")]
    Duplicate(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Connection error: {0}")]
    Connectivity(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

/// Result type alias for archivist
pub type Result<T> = std::result::Result<T, Error>;

/// Convert qdrant errors, splitting out credential and transport failures
/// so callers can distinguish them from plain store errors.
impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        let message = err.to_string();
        let lower = message.to_lowercase();
        if lower.contains("unauthenticated")
            || lower.contains("unauthorized")
            || lower.contains("permission denied")
            || lower.contains("invalid api key")
            || lower.contains("forbidden")
        {
            Error::Auth(message)
        } else if lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("deadline")
            || lower.contains("unavailable")
            || lower.contains("connection")
            || lower.contains("connect")
            || lower.contains("transport")
            || lower.contains("dns")
        {
            Error::Connectivity(message)
        } else {
            Error::Store(message)
        }
    }
}
