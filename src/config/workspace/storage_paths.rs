//! StoreConfig and storage root resolution.

use crate::error::ApiError;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_storage_root() -> PathBuf {
    PathBuf::from("comments")
}

fn default_record_file_name() -> String {
    "comment.md".to_string()
}

fn default_replies_dir() -> String {
    "replies".to_string()
}

fn default_max_body_length() -> usize {
    10_000
}

fn default_date_format() -> String {
    "%Y-%m-%d %H:%M".to_string()
}

/// Comment storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one subdirectory per thread (relative to the workspace root)
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// File name of a comment record
    #[serde(default = "default_record_file_name")]
    pub record_file_name: String,

    /// Directory name that nests replies beneath their parent
    #[serde(default = "default_replies_dir")]
    pub replies_dir: String,

    /// Maximum body length in characters; longer bodies are truncated
    #[serde(default = "default_max_body_length")]
    pub max_body_length: usize,

    /// strftime format for rendered comment dates
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl StoreConfig {
    /// Config rooted at an explicit storage directory, other fields defaulted
    pub fn with_root(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Self::default()
        }
    }

    /// Resolve the storage root against the workspace root.
    ///
    /// Relative roots are joined onto `workspace_root`; existing directories
    /// are canonicalized.
    pub fn resolve_root(&self, workspace_root: &Path) -> PathBuf {
        let root = if self.storage_root.is_absolute() {
            self.storage_root.clone()
        } else {
            workspace_root.join(&self.storage_root)
        };
        dunce::canonicalize(&root).unwrap_or(root)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ApiError> {
        let is_segment = |name: &str| {
            !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
        };
        if !is_segment(&self.record_file_name) {
            return Err(ApiError::ConfigError(format!(
                "record_file_name must be a plain file name, got '{}'",
                self.record_file_name
            )));
        }
        if !is_segment(&self.replies_dir) {
            return Err(ApiError::ConfigError(format!(
                "replies_dir must be a plain directory name, got '{}'",
                self.replies_dir
            )));
        }
        if self.max_body_length == 0 {
            return Err(ApiError::ConfigError(
                "max_body_length must be greater than zero".to_string(),
            ));
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ApiError::ConfigError(format!(
                "Invalid date_format: {}",
                self.date_format
            )));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            record_file_name: default_record_file_name(),
            replies_dir: default_replies_dir(),
            max_body_length: default_max_body_length(),
            date_format: default_date_format(),
        }
    }
}
