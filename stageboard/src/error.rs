//! Error types for the pipeline engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, StageboardError>;

/// Errors that can occur in pipeline operations
#[derive(Debug, Error)]
pub enum StageboardError {
    /// Board directory not initialized at the given path
    #[error("board not initialized at {path}")]
    NotInitialized { path: PathBuf },

    /// Board directory already exists
    #[error("board already exists at {path}")]
    AlreadyExists { path: PathBuf },

    /// Entity not found
    #[error("entity not found: {id}")]
    EntityNotFound { id: String },

    /// Stage is not part of the registry
    #[error("unknown stage: {id}")]
    UnknownStage { id: String },

    /// Stage listed twice in a registry
    #[error("duplicate stage ID: {id}")]
    DuplicateStage { id: String },

    /// A registry needs at least one stage
    #[error("stage registry must contain at least one stage")]
    EmptyRegistry,

    /// Persistence backend rejected or failed a call
    #[error("backend error: {message}")]
    Backend { message: String },

    /// Configuration could not be loaded
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Invalid field value
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StageboardError {
    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create an unknown stage error
    pub fn unknown_stage(id: impl Into<String>) -> Self {
        Self::UnknownStage { id: id.into() }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if this is a retryable error
    ///
    /// Backend and IO failures are transient from the board's point of view; everything
    /// else is a caller or data mistake that will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { .. } | Self::Io(_))
    }
}

impl From<figment::Error> for StageboardError {
    fn from(err: figment::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StageboardError::EntityNotFound {
            id: "abc123".into(),
        };
        assert_eq!(err.to_string(), "entity not found: abc123");
    }

    #[test]
    fn test_backend_error() {
        let err = StageboardError::backend("network error");
        assert_eq!(err.to_string(), "backend error: network error");
    }

    #[test]
    fn test_retryable() {
        assert!(StageboardError::backend("timeout").is_retryable());
        assert!(!StageboardError::unknown_stage("Archived").is_retryable());
        assert!(!StageboardError::EmptyRegistry.is_retryable());
    }
}
