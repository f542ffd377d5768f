//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected user input, shown to the user as a blocking alert
    #[error("{0}")]
    Validation(String),

    /// Startup fetch failed; the repository is left as it was
    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Task with ID {0} already exists")]
    DuplicateId(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Fold a lower-level failure into `Error::Ingestion`
    pub fn into_ingestion(self) -> Self {
        match self {
            Self::Ingestion(msg) => Self::Ingestion(msg),
            other => Self::Ingestion(other.to_string()),
        }
    }
}
