//! Error type shared by every pipeline stage.
//!
//! Stage functions return [`HarvestError`]; the scope a failure affects (one
//! article, one task) is decided by the caller, not by the variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Transport failure, timeout, or non-success HTTP status.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The histogram response could not be decoded even after sanitization.
    #[error("malformed histogram response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    /// Extraction found no readable body in the markup.
    #[error("no readable content found")]
    NoContent,

    /// The extractor panicked on this document.
    #[error("extraction panicked: {0}")]
    ExtractionPanicked(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config file: {0}")]
    ConfigFile(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
