//! Error types for embedding operations

use pulse_core::PulseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    /// Any other failure reported by an embedding provider
    #[error("Embedding provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Malformed stored vector for {id}: {bytes} bytes, expected {expected}")]
    MalformedVector {
        id: String,
        bytes: usize,
        expected: usize,
    },

    #[error("Embedding not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EmbeddingError {
    /// Dimension and storage corruption errors are never degraded to a default
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            EmbeddingError::InvalidDimension { .. } | EmbeddingError::MalformedVector { .. }
        )
    }
}

impl From<rusqlite::Error> for EmbeddingError {
    fn from(e: rusqlite::Error) -> Self {
        EmbeddingError::Database(e.to_string())
    }
}

impl From<EmbeddingError> for PulseError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::InvalidDimension { .. } | EmbeddingError::MalformedVector { .. } => {
                PulseError::data_integrity(e.to_string())
            }
            EmbeddingError::Database(msg) => PulseError::database(msg),
            EmbeddingError::Serialization(e) => PulseError::parse(e.to_string()),
            EmbeddingError::NotFound(msg) => PulseError::not_found(msg),
            EmbeddingError::Config(msg) => PulseError::config(msg),
            EmbeddingError::OpenAI(e) => PulseError::api(format!("OpenAI API error: {}", e)),
            EmbeddingError::Provider(msg) => PulseError::api(msg),
        }
    }
}
