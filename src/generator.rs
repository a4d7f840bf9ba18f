//! Section content generator: one generation request end-to-end.
//!
//! Resolves the section's block schema and model, then generates each
//! requested block in order. Block failures are recorded as data and never
//! abort sibling blocks; only schema or model resolution fails the request.

use crate::error::GenerationError;
use crate::parser::ResponseParser;
use crate::prompt::PromptBuilder;
use crate::provider::ModelClient;
use crate::registry::{BlockConfig, ModelDefinition, SectionRegistry};
use crate::types::{ContentBlockResult, FieldMap, GenerationRequest, GenerationResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Receives block-level progress while a request is generated.
pub trait BlockProgress: Send + Sync {
    fn block_started(&self, block_name: &str, index: usize, total: usize);
}

/// Progress sink that discards updates.
pub struct NoBlockProgress;

impl BlockProgress for NoBlockProgress {
    fn block_started(&self, _block_name: &str, _index: usize, _total: usize) {}
}

/// Generates content for one request. The orchestrator drives implementors.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &dyn BlockProgress,
    ) -> Result<GenerationResult, GenerationError>;
}

pub struct SectionContentGenerator {
    registry: Arc<dyn SectionRegistry>,
    client: Arc<ModelClient>,
    prompts: PromptBuilder,
    parser: ResponseParser,
}

impl SectionContentGenerator {
    pub fn new(registry: Arc<dyn SectionRegistry>, client: Arc<ModelClient>) -> Self {
        Self {
            prompts: PromptBuilder::new(registry.clone()),
            registry,
            client,
            parser: ResponseParser::default(),
        }
    }

    pub fn with_parser(mut self, parser: ResponseParser) -> Self {
        self.parser = parser;
        self
    }

    async fn generate_block(
        &self,
        request: &GenerationRequest,
        block: &BlockConfig,
        model: &ModelDefinition,
    ) -> Result<FieldMap, GenerationError> {
        let pair = self.prompts.build(
            &request.section_type,
            block,
            &request.section_data,
            &request.context,
            request.selected_fields.as_ref(),
        )?;
        let messages = PromptBuilder::layer_instructions(pair, &request.context).into_messages();

        let response = self.client.complete(&messages, model).await?;
        debug!(
            section_type = %request.section_type,
            block = %block.name,
            source = response.source.as_str(),
            response_chars = response.content.chars().count(),
            "Parsing block response"
        );
        Ok(self
            .parser
            .parse(&request.section_type, &block.name, &response.content))
    }
}

#[async_trait]
impl ContentGenerator for SectionContentGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &dyn BlockProgress,
    ) -> Result<GenerationResult, GenerationError> {
        let mapping = request
            .section_mapping
            .as_ref()
            .or_else(|| self.registry.section_schema(&request.section_type))
            .ok_or_else(|| GenerationError::SchemaNotFound(request.section_type.clone()))?;
        let model = self
            .registry
            .model_definition(&request.model_id)
            .ok_or_else(|| GenerationError::ModelNotFound(request.model_id.clone()))?;

        let start = Instant::now();
        let total = request.requested_blocks.len();
        let mut block_results = Vec::with_capacity(total);

        for (index, block_name) in request.requested_blocks.iter().enumerate() {
            progress.block_started(block_name, index, total);

            let Some(block) = mapping.block(block_name) else {
                warn!(
                    section_type = %request.section_type,
                    block = %block_name,
                    "No configuration found for block"
                );
                let err = GenerationError::BlockNotConfigured(block_name.clone());
                block_results.push(ContentBlockResult::failed(block_name.clone(), err.to_string()));
                continue;
            };

            match self.generate_block(request, block, model).await {
                Ok(fields) => block_results.push(ContentBlockResult::succeeded(block_name.clone(), fields)),
                Err(err) => {
                    warn!(
                        section_type = %request.section_type,
                        block = %block_name,
                        error = %err,
                        "Block generation failed"
                    );
                    block_results.push(ContentBlockResult::failed(block_name.clone(), err.to_string()));
                }
            }
        }

        let result = GenerationResult::from_blocks(request.section_type.clone(), block_results);
        info!(
            section_type = %request.section_type,
            blocks = total,
            succeeded = result.block_results.iter().filter(|b| b.success).count(),
            success = result.success,
            duration_ms = start.elapsed().as_millis(),
            "Section generation finished"
        );
        Ok(result)
    }
}
