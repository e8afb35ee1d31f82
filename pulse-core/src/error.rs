//! Error types for the pipeline

use thiserror::Error;

/// Pipeline-wide error type
#[derive(Error, Debug)]
pub enum PulseError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    /// Dimension mismatch or a corrupted stored vector. Never degraded.
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    /// A collaborator cannot be reached at all; the run cannot make progress.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PulseError {
    pub fn api(msg: impl Into<String>) -> Self {
        PulseError::Api(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        PulseError::Network(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        PulseError::Auth(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        PulseError::Parse(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        PulseError::NotFound(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        PulseError::Config(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        PulseError::Database(msg.into())
    }

    pub fn data_integrity(msg: impl Into<String>) -> Self {
        PulseError::DataIntegrity(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        PulseError::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PulseError::Internal(msg.into())
    }

    /// Errors that must stop the whole run instead of being counted per item
    pub fn is_fatal(&self) -> bool {
        matches!(self, PulseError::DataIntegrity(_) | PulseError::Unavailable(_))
    }
}

/// Result type alias for pipeline operations
pub type PulseResult<T> = Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(PulseError::data_integrity("dim 3 vs 4").is_fatal());
        assert!(PulseError::unavailable("embedding provider").is_fatal());
        assert!(!PulseError::api("429").is_fatal());
        assert!(!PulseError::parse("bad json").is_fatal());
    }
}
