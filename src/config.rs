//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, the global
//! `$XDG_CONFIG_HOME/threadstore/config.toml`, the workspace
//! `threadstore.toml`, then `THREADSTORE__*` environment variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod workspace;

pub use facade::ConfigLoader;
pub use workspace::storage_paths::StoreConfig;

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadstoreConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ThreadstoreConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        self.store.validate()
    }
}
