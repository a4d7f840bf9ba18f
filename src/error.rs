//! Error types for section content generation.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the generation pipeline.
///
/// Block-level failures are converted into `ContentBlockResult` data by the
/// generator; only request-level and batch-level variants escape to callers.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("No section configuration found for section type: {0}")]
    SchemaNotFound(String),

    #[error("No model definition found for model id: {0}")]
    ModelNotFound(String),

    #[error("No configuration found for block: {0}")]
    BlockNotConfigured(String),

    #[error("Block has no AI-eligible fields: {0}")]
    NoEligibleFields(String),

    #[error("Prompt build failed: {0}")]
    PromptFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("A batch is already running on this orchestrator")]
    BatchInProgress,

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for GenerationError {
    fn from(err: config::ConfigError) -> Self {
        GenerationError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::PromptFailed(format!("JSON serialization failed: {}", err))
    }
}
