//! Error types for Formrag.

use thiserror::Error;

/// Library-level error type for Formrag operations.
#[derive(Error, Debug)]
pub enum FormragError {
    #[error("Embedding model is not ready: {0}")]
    ModelUnavailable(String),

    #[error("Form not found: {0}")]
    FormNotFound(String),

    #[error("Embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Answer generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Response store error: {0}")]
    Store(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

impl FormragError {
    /// Stable machine-readable name for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            FormragError::ModelUnavailable(_) => "model_unavailable",
            FormragError::FormNotFound(_) => "form_not_found",
            FormragError::DimensionMismatch { .. } => "dimension_mismatch",
            FormragError::GenerationFailed(_) => "generation_failed",
            FormragError::Config(_) => "config",
            FormragError::Embedding(_) => "embedding",
            FormragError::Store(_) | FormragError::Database(_) => "store",
            FormragError::InvalidInput(_) => "invalid_input",
            FormragError::Io(_) => "io",
            FormragError::Json(_) | FormragError::TomlParse(_) => "serialization",
            FormragError::Http(_) | FormragError::OpenAI(_) => "upstream",
        }
    }

    /// Whether resubmitting the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FormragError::ModelUnavailable(_) | FormragError::GenerationFailed(_)
        )
    }
}

/// Result type alias for Formrag operations.
pub type Result<T> = std::result::Result<T, FormragError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(FormragError::FormNotFound("x".into()).kind(), "form_not_found");
        assert_eq!(
            FormragError::DimensionMismatch { expected: 3, found: 2 }.kind(),
            "dimension_mismatch"
        );
        assert!(FormragError::GenerationFailed("quota".into()).is_retryable());
        assert!(!FormragError::FormNotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = FormragError::DimensionMismatch { expected: 384, found: 2 };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 384, found 2"
        );
    }
}
