//! Error types for Docent.
//!
//! This module defines a unified error enum that covers every failure class
//! of the retrieval pipeline: configuration, persisted-index integrity,
//! retrieval availability, generation, and request validation.

use thiserror::Error;

/// Unified error type for Docent.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (fatal at construction)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A vector did not match the index dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A vector holds NaN or infinite components
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Persisted index artifacts are missing or inconsistent
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// The retrieval collaborator timed out, failed, or answered non-success
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation capability errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base and RAG errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Empty or degenerate input, rejected before any network call
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::InvalidRequest(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
