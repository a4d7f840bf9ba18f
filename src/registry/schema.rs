//! Block and field schema types owned by the section-configuration registry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Html,
    Number,
    Boolean,
    Array,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Html => "html",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
        }
    }
}

/// Field-level description of a content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockFieldSchema {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_ai_eligible")]
    pub ai_eligible: bool,
    /// Nested schema for array-of-object fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_fields: Option<Vec<BlockFieldSchema>>,
}

fn default_ai_eligible() -> bool {
    true
}

impl BlockFieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            field_type,
            description: String::new(),
            ai_eligible: true,
            item_fields: None,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_items(mut self, items: Vec<BlockFieldSchema>) -> Self {
        self.item_fields = Some(items);
        self
    }

    pub fn not_eligible(mut self) -> Self {
        self.ai_eligible = false;
        self
    }
}

/// A named, independently generatable block and its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub fields: Vec<BlockFieldSchema>,
}

impl BlockConfig {
    pub fn new(name: impl Into<String>, fields: Vec<BlockFieldSchema>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            fields,
        }
    }

    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// Block schema for a whole section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionMapping {
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
}

impl SectionMapping {
    pub fn new(blocks: Vec<BlockConfig>) -> Self {
        Self { blocks }
    }

    pub fn block(&self, name: &str) -> Option<&BlockConfig> {
        self.blocks.iter().find(|block| block.name == name)
    }
}

/// Curated prompt for one (section type, block) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

/// Model offered to editors, keyed by an abstract id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    /// Concrete provider model name; the client's model table is used when absent.
    #[serde(default)]
    pub provider_model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl ModelDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            provider_model: None,
            max_tokens: None,
            temperature: None,
        }
    }
}
