//! Quire: AI-assisted magazine section content generation
//!
//! Turns a section's block schema into populated content fields by prompting a
//! language model. A batch [`orchestrator::Orchestrator`] runs requests in
//! concurrency windows with live progress and selective retry; each request is
//! generated block by block by [`generator::SectionContentGenerator`].

pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod orchestrator;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod types;

pub use error::GenerationError;
pub use pipeline::Pipeline;
