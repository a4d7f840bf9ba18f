//! Core request and result types shared across the pipeline.

use crate::registry::SectionMapping;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Generated or current field values for a block, keyed by field name.
pub type FieldMap = serde_json::Map<String, Value>;

/// Stable identifier for a request within a batch, derived from its input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(usize);

impl RequestId {
    pub fn from_index(index: usize) -> Self {
        RequestId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

/// Editorial context and layered instructions for a generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationContext {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    /// Issue-wide guidance, applied before any other instruction.
    #[serde(default)]
    pub global_instruction: Option<String>,
    /// Section-level guidance configured by an editor.
    #[serde(default)]
    pub custom_instruction: Option<String>,
    /// Free-text ask typed by the user for this run.
    #[serde(default)]
    pub user_instruction: Option<String>,
    /// Current block data keyed by block name.
    #[serde(default)]
    pub current_data: Option<FieldMap>,
}

/// One unit of orchestrator work: the blocks to generate for one section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub section_type: String,
    #[serde(default)]
    pub section_data: Value,
    pub model_id: String,
    pub requested_blocks: Vec<String>,
    #[serde(default)]
    pub section_mapping: Option<SectionMapping>,
    #[serde(default)]
    pub selected_fields: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub context: GenerationContext,
}

impl GenerationRequest {
    pub fn new(section_type: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            section_type: section_type.into(),
            section_data: Value::Null,
            model_id: model_id.into(),
            requested_blocks: Vec::new(),
            section_mapping: None,
            selected_fields: None,
            context: GenerationContext::default(),
        }
    }

    pub fn with_blocks<I, S>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_blocks = blocks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_section_data(mut self, section_data: Value) -> Self {
        self.section_data = section_data;
        self
    }

    pub fn with_mapping(mut self, mapping: SectionMapping) -> Self {
        self.section_mapping = Some(mapping);
        self
    }

    pub fn with_selected_fields(mut self, selected: HashMap<String, Vec<String>>) -> Self {
        self.selected_fields = Some(selected);
        self
    }

    pub fn with_context(mut self, context: GenerationContext) -> Self {
        self.context = context;
        self
    }
}

/// Outcome of generating a single block. Retries produce a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlockResult {
    pub block_name: String,
    pub fields: FieldMap,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContentBlockResult {
    pub fn succeeded(block_name: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            block_name: block_name.into(),
            fields,
            success: true,
            error: None,
        }
    }

    pub fn failed(block_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            block_name: block_name.into(),
            fields: FieldMap::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Outcome of one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub section_type: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FieldMap>,
    pub block_results: Vec<ContentBlockResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResult {
    /// Aggregates block outcomes. Successful block fields are merged in order,
    /// later blocks overwriting earlier ones on key collision.
    pub fn from_blocks(section_type: impl Into<String>, block_results: Vec<ContentBlockResult>) -> Self {
        let mut data = FieldMap::new();
        let mut failures = Vec::new();
        let mut any_success = false;

        for block in &block_results {
            if block.success {
                any_success = true;
                for (key, value) in &block.fields {
                    data.insert(key.clone(), value.clone());
                }
            } else {
                failures.push(format!(
                    "{} ({})",
                    block.block_name,
                    block.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }

        Self {
            section_type: section_type.into(),
            success: any_success,
            data: any_success.then_some(data),
            block_results,
            error: (!failures.is_empty())
                .then(|| format!("Failed to generate blocks: {}", failures.join(", "))),
        }
    }

    /// A request that failed before any block was attempted.
    pub fn request_failed(section_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            section_type: section_type.into(),
            success: false,
            data: None,
            block_results: Vec::new(),
            error: Some(error.into()),
        }
    }
}
