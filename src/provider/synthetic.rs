//! Deterministic synthetic completions.
//!
//! Stands in for a provider when none is configured or a provider call fails.
//! The response body is chosen by keyword-matching the last user message.

use super::{
    ChatMessage, CompletionOptions, CompletionProvider, CompletionResponse, MessageRole,
    ResponseSource, TokenUsage,
};
use crate::error::GenerationError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

pub const SYNTHETIC_MODEL: &str = "synthetic";

/// Synthetic response generator with an artificial latency.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    delay: Duration,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

impl SyntheticProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Body chosen for a user message. Pure, so identical prompts yield identical output.
    pub fn response_for(user_message: &str) -> Value {
        let message = user_message.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|k| message.contains(k));

        if has(&["mainstory", "main story"]) {
            json!({
                "title": "The Season Ahead",
                "content": "<p>An in-depth look at what is changing this season.</p>",
                "products": [
                    { "name": "Editor's pick", "description": "A favourite from the team." }
                ],
                "tips": [
                    { "title": "Start early", "description": "Plan a week ahead." }
                ]
            })
        } else if has(&["tip", "advice"]) {
            json!({
                "tips": [
                    { "title": "Start small", "description": "Pick one habit and keep it for a week." },
                    { "title": "Stay consistent", "description": "Same time, same place, every day." },
                    { "title": "Track progress", "description": "Write down one win each evening." }
                ]
            })
        } else if has(&["product", "pick", "recommend"]) {
            json!({
                "products": [
                    { "name": "Everyday essential", "description": "Reliable and well made." },
                    { "name": "Little luxury", "description": "A treat worth saving for." }
                ]
            })
        } else if has(&["faq", "question"]) {
            json!({
                "questions": [
                    { "question": "Where do I start?", "answer": "Begin with the basics covered above." }
                ]
            })
        } else if has(&["quote", "interview"]) {
            json!({
                "quote": "Good work takes the time it takes.",
                "author": "Our featured expert"
            })
        } else if has(&["event", "calendar"]) {
            json!({
                "events": [
                    { "name": "Community meetup", "date": "First Saturday of the month" }
                ]
            })
        } else {
            json!({
                "title": "Sample headline",
                "content": "<p>Sample content for this section.</p>"
            })
        }
    }
}

#[async_trait]
impl CompletionProvider for SyntheticProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, GenerationError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let user_message = messages
            .iter()
            .rev()
            .find(|msg| msg.role == MessageRole::User)
            .map(|msg| msg.content.as_str())
            .unwrap_or_default();
        let content = Self::response_for(user_message).to_string();

        let prompt_chars: usize = messages.iter().map(|msg| msg.content.len()).sum();
        let prompt_tokens = (prompt_chars / 4) as u32;
        let completion_tokens = (content.len() / 4) as u32;

        info!(
            requested_model = %model,
            source = ResponseSource::Synthetic.as_str(),
            "Serving synthetic completion"
        );

        Ok(CompletionResponse {
            content,
            model: SYNTHETIC_MODEL.to_string(),
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            source: ResponseSource::Synthetic,
        })
    }

    fn provider_name(&self) -> &str {
        SYNTHETIC_MODEL
    }
}
