//! MergeService: orchestrates sources and deserializes to ThreadstoreConfig.

use crate::config::sources::{self, environment};
use crate::config::ThreadstoreConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Builder seeded with the serialized defaults, so partial files only
    /// override the keys they name.
    pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Config::try_from(&ThreadstoreConfig::default())?;
        Ok(Config::builder().add_source(defaults))
    }

    /// Load config from workspace and standard sources.
    /// Precedence: global file (lowest) -> workspace file -> environment (highest).
    pub fn load(workspace_root: &Path) -> Result<ThreadstoreConfig, ConfigError> {
        let builder = Self::builder_with_defaults()?;
        let builder = sources::add_global_file(builder)?;
        let builder = sources::add_workspace_file(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<ThreadstoreConfig, ConfigError> {
        let builder = Self::builder_with_defaults()?;
        let builder = sources::add_explicit_file(builder, path)?;
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }
}
