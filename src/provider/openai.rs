//! OpenAI-compatible chat completions provider.

use super::{
    build_provider_http_client, map_http_error, map_status_error, ChatMessage, CompletionOptions,
    CompletionProvider, CompletionResponse, ResponseSource, TokenUsage,
};
use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// OpenAI provider client
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = build_provider_http_client(request_timeout)?;
        let base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status_error(status, &error_text));
        }

        let body: Value = response.json().await.map_err(|e| {
            GenerationError::ProviderError(format!("Failed to parse models response: {}", e))
        })?;
        Ok(body["data"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|model| model["id"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Reads an untyped chat completion body. Any shape mismatch is a provider error.
pub(crate) fn parse_completion_body(
    body: &Value,
    requested_model: &str,
) -> Result<CompletionResponse, GenerationError> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            GenerationError::ProviderError("No message content in provider response".to_string())
        })?;

    let usage_field = |name: &str| {
        body.pointer(&format!("/usage/{}", name))
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32
    };

    Ok(CompletionResponse {
        content: content.to_string(),
        model: body["model"]
            .as_str()
            .unwrap_or(requested_model)
            .to_string(),
        usage: TokenUsage {
            prompt_tokens: usage_field("prompt_tokens"),
            completion_tokens: usage_field("completion_tokens"),
            total_tokens: usage_field("total_tokens"),
        },
        source: ResponseSource::Provider,
    })
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        options: &CompletionOptions,
    ) -> Result<CompletionResponse, GenerationError> {
        let request = ChatCompletionRequest {
            model,
            messages: messages
                .iter()
                .map(|msg| WireMessage {
                    role: msg.role.as_str(),
                    content: &msg.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options
                .json_mode
                .then(|| json!({ "type": "json_object" })),
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %model, message_count = messages.len(), "Sending completion request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status_error(status, &error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::ProviderError(format!("Failed to parse response: {}", e)))?;

        parse_completion_body(&body, model)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}
