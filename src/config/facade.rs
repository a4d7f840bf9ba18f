//! Public config loading entry points.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::QuireConfig;
use crate::error::GenerationError;
use config::{Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix for environment overrides, e.g. `QUIRE__GENERATION__CONCURRENCY_LIMIT`.
pub const ENV_PREFIX: &str = "QUIRE";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global config file, workspace
    /// `config/config.toml`, workspace `config/{QUIRE_ENV}.toml`, `QUIRE__*` environment.
    pub fn load(workspace_root: &Path) -> Result<QuireConfig, GenerationError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: QuireConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace_root = %workspace_root.display(),
            concurrency_limit = config.generation.concurrency_limit,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a single config file over the defaults, ignoring other sources.
    pub fn load_from_file(path: &Path) -> Result<QuireConfig, GenerationError> {
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Location of the global config file.
    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
