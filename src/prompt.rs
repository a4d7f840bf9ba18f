//! Prompt construction for content blocks.
//!
//! A curated template is used when the registry has one for the exact
//! (section type, block) pair. Otherwise a generic prompt is derived from the
//! block's field schema, anchored on the block's current data so the model
//! edits incrementally instead of regenerating from scratch.

use crate::error::GenerationError;
use crate::provider::ChatMessage;
use crate::registry::{BlockConfig, BlockFieldSchema, FieldType, PromptTemplate, SectionRegistry};
use crate::types::{FieldMap, GenerationContext};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_TOPIC: &str = "general interest";
const DEFAULT_AUDIENCE: &str = "general readers";
const DEFAULT_THEME: &str = "this issue";
const DEFAULT_NAME: &str = "our featured expert";
const DEFAULT_SPECIALIZATION: &str = "their field";

const MODIFICATION_RULES: &str = "Modification rules:
- If the instruction says \"add\", append new items and keep every existing item.
- If the instruction says \"replace\" or \"new\", replace the affected content.
- If the instruction says \"remove\" or \"delete\", remove only the matching items.
- If the instruction says \"update\" or \"change\", edit only the targeted fields.
- Otherwise, append new content and update existing content where it helps.";

/// System and user message pair for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user)]
    }
}

/// Builds prompts from registry templates or block schemas.
#[derive(Clone)]
pub struct PromptBuilder {
    registry: Arc<dyn SectionRegistry>,
}

impl PromptBuilder {
    pub fn new(registry: Arc<dyn SectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn build(
        &self,
        section_type: &str,
        block: &BlockConfig,
        section_data: &Value,
        context: &GenerationContext,
        selected_fields: Option<&HashMap<String, Vec<String>>>,
    ) -> Result<PromptPair, GenerationError> {
        let current = current_block_data(&block.name, section_data, context);

        if let Some(template) = self.registry.prompt_template(section_type, &block.name) {
            debug!(section_type, block = %block.name, "Using curated prompt template");
            return Ok(fill_template(
                template,
                section_type,
                &block.name,
                section_data,
                context,
                &current,
            ));
        }

        debug!(section_type, block = %block.name, "Deriving prompt from block schema");
        generic_prompt(section_type, block, context, &current, selected_fields)
    }

    /// Appends global, custom and user instructions to the user message, in that order.
    pub fn layer_instructions(mut pair: PromptPair, context: &GenerationContext) -> PromptPair {
        let layers = [
            ("Global instructions", &context.global_instruction),
            ("Section instructions", &context.custom_instruction),
            ("User instructions", &context.user_instruction),
        ];
        for (label, text) in layers {
            if let Some(text) = text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                pair.user.push_str(&format!("\n\n{}:\n{}", label, text));
            }
        }
        pair
    }
}

/// Current data for a block: the section's content-block props, then the
/// request's current data, then an empty object.
pub fn current_block_data(block_name: &str, section_data: &Value, context: &GenerationContext) -> Value {
    let from_blocks = section_data
        .get("contentBlocks")
        .and_then(Value::as_array)
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|entry| entry.get("name").and_then(Value::as_str) == Some(block_name))
        })
        .and_then(|entry| entry.get("props"))
        .cloned();

    from_blocks
        .or_else(|| {
            context
                .current_data
                .as_ref()
                .and_then(|data| data.get(block_name))
                .cloned()
        })
        .unwrap_or_else(|| Value::Object(FieldMap::new()))
}

fn first_present<'a>(candidates: &[Option<&'a str>], default: &'a str) -> &'a str {
    candidates
        .iter()
        .flatten()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .unwrap_or(default)
}

fn fill_template(
    template: &PromptTemplate,
    section_type: &str,
    block_name: &str,
    section_data: &Value,
    context: &GenerationContext,
    current: &Value,
) -> PromptPair {
    let data_str = |key: &str| section_data.get(key).and_then(Value::as_str);

    let topic = first_present(
        &[context.title.as_deref(), context.theme.as_deref(), data_str("title")],
        DEFAULT_TOPIC,
    );
    let audience = first_present(&[context.audience.as_deref()], DEFAULT_AUDIENCE);
    let theme = first_present(&[context.theme.as_deref()], DEFAULT_THEME);
    let name = first_present(&[data_str("name")], DEFAULT_NAME);
    let specialization = first_present(
        &[data_str("specialization"), data_str("expertise")],
        DEFAULT_SPECIALIZATION,
    );
    let current_json = serde_json::to_string_pretty(current).unwrap_or_else(|_| "{}".to_string());

    let vars = [
        ("{topic}", topic),
        ("{audience}", audience),
        ("{theme}", theme),
        ("{name}", name),
        ("{specialization}", specialization),
        ("{section_type}", section_type),
        ("{block_name}", block_name),
        ("{current_data}", current_json.as_str()),
    ];

    PromptPair {
        system: substitute(&template.system, &vars),
        user: substitute(&template.user, &vars),
    }
}

/// Single pass over `text`; inserted values are never rescanned for placeholders.
fn substitute(text: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match vars.iter().find(|(placeholder, _)| tail.starts_with(placeholder)) {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn active_fields<'a>(
    block: &'a BlockConfig,
    selected_fields: Option<&HashMap<String, Vec<String>>>,
) -> Vec<&'a BlockFieldSchema> {
    match selected_fields.and_then(|selected| selected.get(&block.name)) {
        Some(names) => block
            .fields
            .iter()
            .filter(|field| names.iter().any(|name| name == &field.name))
            .collect(),
        None => block.fields.iter().filter(|field| field.ai_eligible).collect(),
    }
}

fn placeholder_value(field_type: FieldType) -> Value {
    match field_type {
        FieldType::Text => json!("text content"),
        FieldType::Html => json!("<p>HTML content</p>"),
        FieldType::Number => json!(0),
        FieldType::Boolean => json!(false),
        FieldType::Array => json!([]),
    }
}

/// One description line; item fields are indented and qualified by their parent.
fn describe(field: &BlockFieldSchema, parent: &str) -> String {
    let label = if field.display_name.is_empty() {
        &field.name
    } else {
        &field.display_name
    };
    let mut line = if parent.is_empty() {
        format!("- {} ({}, {})", field.name, label, field.field_type.as_str())
    } else {
        format!(
            "  - {}.{} ({}, {})",
            parent,
            field.name,
            label,
            field.field_type.as_str()
        )
    };
    if !field.description.is_empty() {
        line.push_str(&format!(": {}", field.description));
    }
    line
}

/// Description lines and example value for one active field.
pub(crate) fn field_guidance(block_name: &str, field: &BlockFieldSchema) -> (Vec<String>, Value) {
    let mut lines = vec![describe(field, "")];

    let example = match (field.field_type, field.item_fields.as_deref()) {
        (FieldType::Array, Some(items)) if !items.is_empty() => {
            let mut item = FieldMap::new();
            for item_field in items {
                lines.push(describe(item_field, &field.name));
                item.insert(item_field.name.clone(), placeholder_value(item_field.field_type));
            }
            Value::Array(vec![Value::Object(item)])
        }
        (FieldType::Array, _) => {
            warn!(
                block = %block_name,
                field = %field.name,
                "Array field has no item field definitions; using a generic example item"
            );
            json!([{ "example": "object" }])
        }
        (field_type, _) => placeholder_value(field_type),
    };

    (lines, example)
}

fn generic_prompt(
    section_type: &str,
    block: &BlockConfig,
    context: &GenerationContext,
    current: &Value,
    selected_fields: Option<&HashMap<String, Vec<String>>>,
) -> Result<PromptPair, GenerationError> {
    let fields = active_fields(block, selected_fields);
    if fields.is_empty() {
        return Err(GenerationError::NoEligibleFields(block.name.clone()));
    }

    let mut descriptions = Vec::new();
    let mut skeleton = FieldMap::new();
    for field in fields {
        let (lines, example) = field_guidance(&block.name, field);
        descriptions.extend(lines);
        skeleton.insert(field.name.clone(), example);
    }

    let current_json = serde_json::to_string_pretty(current)?;
    let skeleton_json = serde_json::to_string_pretty(&Value::Object(skeleton))?;
    let instruction = context
        .user_instruction
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or("(no specific instruction)");

    let system = format!(
        "You are modifying existing content for the \"{label}\" block of a {section_type} magazine section. \
Keep what works and change only what the instruction asks for.\n\n\
Current block data:\n{current_json}\n\n\
User instruction:\n{instruction}\n\n\
{MODIFICATION_RULES}\n\n\
Fields:\n{fields}\n\n\
Respond with a single JSON object shaped like this example:\n{skeleton_json}",
        label = block.label(),
        fields = descriptions.join("\n"),
    );

    let user = format!(
        "Update the {} block ({}) for this {} section. Return only the JSON object.",
        block.label(),
        block.name,
        section_type
    );

    Ok(PromptPair { system, user })
}
