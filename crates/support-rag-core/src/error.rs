//! Error taxonomy for the retrieval engine.

use thiserror::Error;

/// Errors raised by the core pipeline.
///
/// Only [`RagError::InvalidInput`] is ever surfaced from
/// [`RagEngine::answer`](crate::engine::RagEngine::answer); every other
/// variant is recovered close to its source (skip-and-log or fallback text).
#[derive(Debug, Error)]
pub enum RagError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("file too large: {size_kb} KB exceeds the {max_kb} KB limit")]
    FileTooLarge { size_kb: u64, max_kb: u64 },

    #[error("document not found: {0}")]
    NotFound(String),
}

impl RagError {
    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        RagError::Store(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        RagError::Generation(err.to_string())
    }
}
