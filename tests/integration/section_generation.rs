//! End-to-end section generation with synthetic completions

use async_trait::async_trait;
use parking_lot::Mutex;
use quire::generator::{ContentGenerator, NoBlockProgress, SectionContentGenerator};
use quire::orchestrator::{Orchestrator, ProgressStatus};
use quire::provider::{
    ChatMessage, CompletionOptions, CompletionProvider, CompletionResponse, CompletionStrategy,
    ModelClient, SyntheticProvider,
};
use quire::registry::InMemoryRegistry;
use quire::types::{GenerationContext, GenerationRequest, RequestId};
use quire::GenerationError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const REGISTRY: &str = r#"
[[models]]
id = "fast"
display_name = "Fast"

[[models]]
id = "house"
provider_model = "gpt-4.1"

[[sections]]
section_type = "featureSpread"

[[sections.blocks]]
name = "mainStory"
display_name = "Main Story"

[[sections.blocks.fields]]
name = "title"
type = "text"

[[sections.blocks.fields]]
name = "content"
type = "html"

[[sections]]
section_type = "tipsList"

[[sections.blocks]]
name = "tips"
display_name = "Tips"

[[sections.blocks.fields]]
name = "tips"
type = "array"

[[sections.blocks.fields.item_fields]]
name = "title"
type = "text"

[[templates]]
section_type = "tipsList"
block_name = "tips"
system = "You write practical tips for {audience}."
user = "Write tips about {topic} for the {block_name} block."
"#;

fn registry() -> Arc<InMemoryRegistry> {
    Arc::new(InMemoryRegistry::from_toml_str(REGISTRY).unwrap())
}

fn synthetic_client() -> Arc<ModelClient> {
    Arc::new(ModelClient::new(CompletionStrategy::Synthetic(
        SyntheticProvider::new(Duration::ZERO),
    )))
}

/// Provider that always fails and records the model it was asked for.
#[derive(Default)]
struct DownProvider {
    models: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionProvider for DownProvider {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        model: &str,
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, GenerationError> {
        self.models.lock().push(model.to_string());
        Err(GenerationError::ProviderRequestFailed("connection refused".to_string()))
    }

    fn provider_name(&self) -> &str {
        "down"
    }
}

#[tokio::test]
async fn feature_spread_main_story_spreads_across_keys() {
    let generator = SectionContentGenerator::new(registry(), synthetic_client());
    let request = GenerationRequest::new("featureSpread", "fast").with_blocks(["mainStory"]);

    let result = generator.generate(&request, &NoBlockProgress).await.unwrap();
    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data["mainStory"]["title"], json!("The Season Ahead"));
    assert!(data["mainStory"].get("products").is_none());
    assert!(data["editorPicks"]["products"].is_array());
    assert!(data["sideStories"].is_array());
}

#[tokio::test]
async fn curated_template_drives_the_synthetic_response() {
    let generator = SectionContentGenerator::new(registry(), synthetic_client());
    let request = GenerationRequest::new("tipsList", "fast")
        .with_blocks(["tips"])
        .with_context(GenerationContext {
            title: Some("Winter running".to_string()),
            ..GenerationContext::default()
        });

    let result = generator.generate(&request, &NoBlockProgress).await.unwrap();
    let tips = &result.data.unwrap()["tips"]["tips"];
    assert_eq!(tips.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn provider_failure_falls_back_to_synthetic_content() {
    let provider = Arc::new(DownProvider::default());
    let client = ModelClient::new(CompletionStrategy::ProviderWithFallback {
        provider: provider.clone(),
        fallback: SyntheticProvider::new(Duration::ZERO),
    });
    let generator = SectionContentGenerator::new(registry(), Arc::new(client));
    let request = GenerationRequest::new("tipsList", "house").with_blocks(["tips"]);

    let result = generator.generate(&request, &NoBlockProgress).await.unwrap();
    assert!(result.success);
    assert_eq!(*provider.models.lock(), vec!["gpt-4.1".to_string()]);
}

#[tokio::test]
async fn provider_failure_without_fallback_fails_the_block() {
    let provider = Arc::new(DownProvider::default());
    let client = ModelClient::new(CompletionStrategy::Provider(provider));
    let generator = SectionContentGenerator::new(registry(), Arc::new(client));
    let request = GenerationRequest::new("tipsList", "fast").with_blocks(["tips"]);

    let result = generator.generate(&request, &NoBlockProgress).await.unwrap();
    assert!(!result.success);
    assert!(result.data.is_none());
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("tips (Provider request failed: connection refused)"));
}

#[tokio::test]
async fn orchestrated_batch_mixes_successes_and_request_failures() {
    let generator = Arc::new(SectionContentGenerator::new(registry(), synthetic_client()));
    let orchestrator = Orchestrator::new(generator, 2).unwrap();

    let results = orchestrator
        .run(vec![
            GenerationRequest::new("tipsList", "fast").with_blocks(["tips"]),
            GenerationRequest::new("unknownSection", "fast").with_blocks(["tips"]),
            GenerationRequest::new("featureSpread", "not-a-model").with_blocks(["mainStory"]),
        ])
        .await
        .unwrap();

    assert!(results[&RequestId::from_index(0)].success);
    let progress = orchestrator.progress();
    assert_eq!(progress[&RequestId::from_index(0)].status, ProgressStatus::Completed);
    assert_eq!(progress[&RequestId::from_index(1)].status, ProgressStatus::Error);
    assert!(progress[&RequestId::from_index(1)]
        .error
        .as_deref()
        .unwrap()
        .contains("unknownSection"));
    assert!(progress[&RequestId::from_index(2)]
        .error
        .as_deref()
        .unwrap()
        .contains("not-a-model"));
}
