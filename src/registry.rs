//! Section Configuration Registry
//!
//! Read-only source of block schemas, curated prompt templates, and model
//! definitions. The generation pipeline consumes the registry through the
//! [`SectionRegistry`] trait and never mutates it.

use crate::error::GenerationError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

pub mod schema;

pub use schema::{
    BlockConfig, BlockFieldSchema, FieldType, ModelDefinition, PromptTemplate, SectionMapping,
};

/// Lookup interface for section configuration.
pub trait SectionRegistry: Send + Sync {
    /// Block schema for a section type
    fn section_schema(&self, section_type: &str) -> Option<&SectionMapping>;

    /// Curated template for an exact (section type, block) pair
    fn prompt_template(&self, section_type: &str, block_name: &str) -> Option<&PromptTemplate>;

    /// Model definition for an abstract model id
    fn model_definition(&self, model_id: &str) -> Option<&ModelDefinition>;
}

/// Registry held entirely in memory, built programmatically or from TOML.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    sections: HashMap<String, SectionMapping>,
    templates: HashMap<(String, String), PromptTemplate>,
    models: HashMap<String, ModelDefinition>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    models: Vec<ModelDefinition>,
    #[serde(default)]
    sections: Vec<SectionEntry>,
    #[serde(default)]
    templates: Vec<TemplateEntry>,
}

#[derive(Debug, Deserialize)]
struct SectionEntry {
    section_type: String,
    #[serde(default)]
    blocks: Vec<BlockConfig>,
}

#[derive(Debug, Deserialize)]
struct TemplateEntry {
    section_type: String,
    block_name: String,
    system: String,
    user: String,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, section_type: impl Into<String>, mapping: SectionMapping) -> Self {
        self.sections.insert(section_type.into(), mapping);
        self
    }

    pub fn with_template(
        mut self,
        section_type: impl Into<String>,
        block_name: impl Into<String>,
        template: PromptTemplate,
    ) -> Self {
        self.templates
            .insert((section_type.into(), block_name.into()), template);
        self
    }

    pub fn with_model(mut self, model: ModelDefinition) -> Self {
        self.models.insert(model.id.clone(), model);
        self
    }

    /// Parse a registry from TOML with `[[models]]`, `[[sections]]` and `[[templates]]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self, GenerationError> {
        let file: RegistryFile = toml::from_str(content)
            .map_err(|e| GenerationError::RegistryError(format!("Invalid registry TOML: {}", e)))?;

        let mut registry = Self::new();
        for model in file.models {
            if model.id.trim().is_empty() {
                return Err(GenerationError::RegistryError(
                    "Model definition id cannot be empty".to_string(),
                ));
            }
            registry = registry.with_model(model);
        }
        for section in file.sections {
            registry = registry.with_section(section.section_type, SectionMapping::new(section.blocks));
        }
        for template in file.templates {
            registry = registry.with_template(
                template.section_type,
                template.block_name,
                PromptTemplate {
                    system: template.system,
                    user: template.user,
                },
            );
        }

        debug!(
            sections = registry.sections.len(),
            templates = registry.templates.len(),
            models = registry.models.len(),
            "Loaded section registry"
        );
        Ok(registry)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, GenerationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GenerationError::RegistryError(format!(
                "Failed to read registry file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn section_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.sections.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl SectionRegistry for InMemoryRegistry {
    fn section_schema(&self, section_type: &str) -> Option<&SectionMapping> {
        self.sections.get(section_type)
    }

    fn prompt_template(&self, section_type: &str, block_name: &str) -> Option<&PromptTemplate> {
        self.templates
            .get(&(section_type.to_string(), block_name.to_string()))
    }

    fn model_definition(&self, model_id: &str) -> Option<&ModelDefinition> {
        self.models.get(model_id)
    }
}
