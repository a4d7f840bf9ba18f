//! Model Client
//!
//! Provider-agnostic completion interface used by the section generator. A
//! [`ModelClient`] owns an explicit [`CompletionStrategy`]: a real provider, a
//! real provider backed by the synthetic generator on failure, or the synthetic
//! generator alone when no provider is configured.

use crate::config::ProviderSettings;
use crate::error::GenerationError;
use crate::registry::ModelDefinition;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub mod openai;
pub mod synthetic;

pub use openai::OpenAIProvider;
pub use synthetic::SyntheticProvider;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Completion options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>, // 0.0-2.0
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON-only response
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: Some(2000),
            json_mode: true,
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Where a completion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Provider,
    Synthetic,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Provider => "provider",
            ResponseSource::Synthetic => "synthetic",
        }
    }
}

/// Completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub source: ResponseSource,
}

/// Completion provider boundary
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion from a list of messages for a concrete provider model
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionResponse, GenerationError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

// Helper function to map HTTP errors to GenerationError
pub(crate) fn map_http_error(error: reqwest::Error) -> GenerationError {
    if let Some(status) = error.status() {
        map_status_error(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        GenerationError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        GenerationError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        GenerationError::ProviderError(format!("HTTP error: {}", error))
    }
}

pub(crate) fn map_status_error(status: u16, detail: &str) -> GenerationError {
    match status {
        401 => GenerationError::ProviderAuthFailed(format!("Authentication failed: {}", detail)),
        429 => GenerationError::ProviderRateLimit(format!("Rate limit exceeded: {}", detail)),
        404 => GenerationError::ProviderModelNotFound(format!("Model not found: {}", detail)),
        _ => GenerationError::ProviderRequestFailed(format!(
            "Request failed with status {}: {}",
            status, detail
        )),
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_provider_http_client(request_timeout: Duration) -> Result<Client, GenerationError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| GenerationError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

/// Maps abstract model ids to concrete provider model names.
#[derive(Debug, Clone)]
pub struct ModelTable {
    entries: HashMap<String, String>,
    default_model: String,
}

impl ModelTable {
    pub const DEFAULT_PROVIDER_MODEL: &'static str = "gpt-4o-mini";

    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            default_model: default_model.into(),
        }
    }

    pub fn with_entry(mut self, model_id: impl Into<String>, provider_model: impl Into<String>) -> Self {
        self.entries.insert(model_id.into(), provider_model.into());
        self
    }

    /// Concrete model for a definition: its own override, then the table, then the default.
    pub fn resolve(&self, definition: &ModelDefinition) -> String {
        definition
            .provider_model
            .clone()
            .or_else(|| self.entries.get(&definition.id).cloned())
            .unwrap_or_else(|| self.default_model.clone())
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }
}

impl Default for ModelTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROVIDER_MODEL)
            .with_entry("gpt-4o", "gpt-4o")
            .with_entry("gpt-4o-mini", "gpt-4o-mini")
            .with_entry("gpt-4.1", "gpt-4.1")
            .with_entry("gpt-4.1-mini", "gpt-4.1-mini")
            .with_entry("fast", "gpt-4o-mini")
            .with_entry("quality", "gpt-4o")
    }
}

/// How the client obtains completions.
#[derive(Clone)]
pub enum CompletionStrategy {
    /// Real provider only; provider errors reach the caller
    Provider(Arc<dyn CompletionProvider>),
    /// Real provider, substituting a synthetic response when the call fails
    ProviderWithFallback {
        provider: Arc<dyn CompletionProvider>,
        fallback: SyntheticProvider,
    },
    /// No provider configured
    Synthetic(SyntheticProvider),
}

impl CompletionStrategy {
    fn name(&self) -> &'static str {
        match self {
            CompletionStrategy::Provider(_) => "provider",
            CompletionStrategy::ProviderWithFallback { .. } => "provider_with_fallback",
            CompletionStrategy::Synthetic(_) => "synthetic",
        }
    }
}

/// Completion client handed to the section generator.
pub struct ModelClient {
    strategy: CompletionStrategy,
    models: ModelTable,
    options: CompletionOptions,
}

impl ModelClient {
    pub fn new(strategy: CompletionStrategy) -> Self {
        Self {
            strategy,
            models: ModelTable::default(),
            options: CompletionOptions::default(),
        }
    }

    pub fn synthetic() -> Self {
        Self::new(CompletionStrategy::Synthetic(SyntheticProvider::default()))
    }

    pub fn with_models(mut self, models: ModelTable) -> Self {
        self.models = models;
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a client from provider settings. Without an API key the client is synthetic-only.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, GenerationError> {
        let fallback = SyntheticProvider::new(Duration::from_millis(settings.synthetic_delay_ms));
        let strategy = match settings.resolve_api_key() {
            Some(api_key) => {
                let provider: Arc<dyn CompletionProvider> = Arc::new(OpenAIProvider::new(
                    api_key,
                    settings.base_url.clone(),
                    Duration::from_secs(settings.request_timeout_secs),
                )?);
                if settings.fallback {
                    CompletionStrategy::ProviderWithFallback { provider, fallback }
                } else {
                    CompletionStrategy::Provider(provider)
                }
            }
            None => {
                warn!("No provider API key configured; completions will be synthetic");
                CompletionStrategy::Synthetic(fallback)
            }
        };

        let mut models = ModelTable::new(settings.default_model.clone());
        for (id, provider_model) in ModelTable::default().entries {
            models = models.with_entry(id, provider_model);
        }
        for (id, provider_model) in &settings.models {
            models = models.with_entry(id.clone(), provider_model.clone());
        }
        info!(
            strategy = strategy.name(),
            default_model = models.default_model(),
            "Model client configured"
        );

        Ok(Self::new(strategy)
            .with_models(models)
            .with_options(CompletionOptions {
                temperature: Some(settings.temperature),
                max_tokens: Some(settings.max_tokens),
                json_mode: true,
            }))
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Complete `messages` with the model described by `model`.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &ModelDefinition,
    ) -> Result<CompletionResponse, GenerationError> {
        let provider_model = self.models.resolve(model);
        let options = CompletionOptions {
            temperature: model.temperature.or(self.options.temperature),
            max_tokens: model.max_tokens.or(self.options.max_tokens),
            json_mode: self.options.json_mode,
        };

        let start = Instant::now();
        let response = match &self.strategy {
            CompletionStrategy::Provider(provider) => {
                provider.complete(messages, &provider_model, &options).await?
            }
            CompletionStrategy::ProviderWithFallback { provider, fallback } => {
                match provider.complete(messages, &provider_model, &options).await {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(
                            provider = provider.provider_name(),
                            model = %provider_model,
                            error = %err,
                            "Provider call failed; substituting synthetic response"
                        );
                        fallback.complete(messages, &provider_model, &options).await?
                    }
                }
            }
            CompletionStrategy::Synthetic(synthetic) => {
                synthetic.complete(messages, &provider_model, &options).await?
            }
        };

        info!(
            model_id = %model.id,
            model = %response.model,
            source = response.source.as_str(),
            duration_ms = start.elapsed().as_millis(),
            total_tokens = response.usage.total_tokens,
            "Completion received"
        );
        Ok(response)
    }
}
