//! Integration tests for the quire generation pipeline

mod config_loading;
mod orchestrator_batches;
mod section_generation;
mod test_utils;

pub use test_utils::with_env;
