//! Crate-wide error taxonomy.

use thiserror::Error;

/// Errors produced by the ingestion and retrieval pipeline.
///
/// Variants follow the failure taxonomy of the system: a dependency that is
/// not reachable, malformed caller input, and per-collaborator failures
/// (bibliographic source, storage, embedding model, generation service).
#[derive(Debug, Error)]
pub enum RagError {
    /// A required backing service is not connected or not reachable.
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },

    /// Malformed caller input, rejected before any I/O.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The bibliographic source failed or returned an unusable response.
    #[error("bibliographic source error: {0}")]
    Source(String),

    /// A metadata or chunk store operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Embedding generation failed as a unit.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The generation service failed or timed out.
    #[error("generation service error: {0}")]
    Generation(String),

    /// Filesystem or other I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

impl RagError {
    /// Shorthand for an unavailable-dependency error.
    pub fn unavailable(service: &'static str, reason: impl Into<String>) -> Self {
        RagError::Unavailable {
            service,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}
