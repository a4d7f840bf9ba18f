//! Model response parsing.
//!
//! Parsing never fails: valid JSON is placed under the block name (or spread
//! across destination keys by a composite transform), anything else is kept
//! as free text under `{ block: { content } }`.

use crate::types::FieldMap;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

/// Where one part of a composite block's payload is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Collects the listed source keys into an object under `key`.
    Object { key: String, sources: Vec<String> },
    /// Wraps one source value as `{ field: value }` under `key`.
    Wrapped {
        key: String,
        source: String,
        field: String,
    },
    /// Writes one source value as-is under `key`.
    Flat { key: String, source: String },
}

impl Destination {
    fn apply(&self, parsed: &FieldMap, out: &mut FieldMap) {
        match self {
            Destination::Object { key, sources } => {
                let collected: FieldMap = sources
                    .iter()
                    .filter_map(|source| parsed.get(source).map(|v| (source.clone(), v.clone())))
                    .collect();
                if !collected.is_empty() {
                    out.insert(key.clone(), Value::Object(collected));
                }
            }
            Destination::Wrapped { key, source, field } => {
                if let Some(value) = parsed.get(source) {
                    let mut wrapped = FieldMap::new();
                    wrapped.insert(field.clone(), value.clone());
                    out.insert(key.clone(), Value::Object(wrapped));
                }
            }
            Destination::Flat { key, source } => {
                if let Some(value) = parsed.get(source) {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// Composite blocks keyed by (section type, block name).
#[derive(Debug, Clone, Default)]
pub struct TransformTable {
    entries: HashMap<(String, String), Vec<Destination>>,
}

impl TransformTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_transform(
        mut self,
        section_type: impl Into<String>,
        block_name: impl Into<String>,
        destinations: Vec<Destination>,
    ) -> Self {
        self.entries
            .insert((section_type.into(), block_name.into()), destinations);
        self
    }

    pub fn get(&self, section_type: &str, block_name: &str) -> Option<&[Destination]> {
        self.entries
            .get(&(section_type.to_string(), block_name.to_string()))
            .map(Vec::as_slice)
    }

    /// The feature spread's main story splits into the narrative, the editor's
    /// picks, and the side stories.
    pub fn builtin() -> Self {
        Self::empty().with_transform(
            "featureSpread",
            "mainStory",
            vec![
                Destination::Object {
                    key: "mainStory".to_string(),
                    sources: ["title", "subtitle", "content", "author", "image"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                },
                Destination::Wrapped {
                    key: "editorPicks".to_string(),
                    source: "products".to_string(),
                    field: "products".to_string(),
                },
                Destination::Flat {
                    key: "sideStories".to_string(),
                    source: "tips".to_string(),
                },
            ],
        )
    }
}

/// Parses raw model text into block fields.
#[derive(Debug, Clone)]
pub struct ResponseParser {
    transforms: TransformTable,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(TransformTable::builtin())
    }
}

impl ResponseParser {
    pub fn new(transforms: TransformTable) -> Self {
        Self { transforms }
    }

    pub fn parse(&self, section_type: &str, block_name: &str, raw: &str) -> FieldMap {
        let mut out = FieldMap::new();

        let parsed = match serde_json::from_str::<Value>(strip_code_fence(raw)) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(
                    section_type,
                    block = block_name,
                    error = %err,
                    "Response is not JSON; keeping it as free text"
                );
                out.insert(block_name.to_string(), json!({ "content": raw }));
                return out;
            }
        };

        match (self.transforms.get(section_type, block_name), parsed) {
            (Some(destinations), Value::Object(object)) => {
                for destination in destinations {
                    destination.apply(&object, &mut out);
                }
            }
            (_, parsed) => {
                out.insert(block_name.to_string(), parsed);
            }
        }
        out
    }
}

/// Removes a surrounding ```json fence, if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.find('\n') {
        Some(newline) if body[..newline].trim().chars().all(char::is_alphanumeric) => {
            body[newline + 1..].trim()
        }
        _ => body.trim(),
    }
}
