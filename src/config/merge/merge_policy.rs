//! Merge rules: defaults first, later sources override earlier ones key by key.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with the pipeline defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("provider.fallback", true)?
        .set_default("provider.default_model", crate::provider::ModelTable::DEFAULT_PROVIDER_MODEL)?
        .set_default("generation.concurrency_limit", 3_i64)?
        .set_default("generation.request_timeout_secs", 300_i64)?
        .set_default("logging.level", "info")
}
