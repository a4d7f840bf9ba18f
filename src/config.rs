//! Configuration System
//!
//! Hierarchical configuration for the generation pipeline: built-in defaults,
//! the user's global config file, workspace config files, then `QUIRE__`
//! environment overrides. Validation reports every problem at once.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuireConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Completion provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key; falls back to `OPENAI_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenAI-compatible endpoint (default: https://api.openai.com/v1)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Serve synthetic content when a provider call fails
    #[serde(default = "default_true")]
    pub fallback: bool,

    #[serde(default = "default_synthetic_delay_ms")]
    pub synthetic_delay_ms: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP request timeout for a single completion
    #[serde(default = "default_provider_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Abstract model id → provider model name overrides
    #[serde(default)]
    pub models: HashMap<String, String>,

    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_true() -> bool {
    true
}

fn default_synthetic_delay_ms() -> u64 {
    300
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_provider_timeout_secs() -> u64 {
    120
}

fn default_model() -> String {
    crate::provider::ModelTable::DEFAULT_PROVIDER_MODEL.to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            fallback: default_true(),
            synthetic_delay_ms: default_synthetic_delay_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_provider_timeout_secs(),
            models: HashMap::new(),
            default_model: default_model(),
        }
    }
}

impl ProviderSettings {
    /// Configured key, else `OPENAI_API_KEY`. Blank values count as unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }
        if self.default_model.trim().is_empty() {
            return Err("default_model cannot be empty".to_string());
        }
        if let Some(base_url) = &self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(format!("base_url must be an http(s) URL, got '{}'", base_url));
            }
        }
        Ok(())
    }
}

/// Batch generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Requests run at once within a window
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Per-request timeout in seconds; 0 disables it
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// TOML registry of sections, templates, and models
    #[serde(default)]
    pub registry_path: Option<PathBuf>,
}

fn default_concurrency_limit() -> usize {
    3
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            registry_path: None,
        }
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency_limit == 0 {
            return Err("concurrency_limit must be at least 1".to_string());
        }
        if let Some(path) = &self.registry_path {
            if path.as_os_str().is_empty() {
                return Err("registry_path cannot be empty".to_string());
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        (self.request_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.request_timeout_secs))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    Generation(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl QuireConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.generation.validate() {
            errors.push(ValidationError::Generation(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
