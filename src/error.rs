//! Error types
//!
//! `StorageError` covers failures scoped to a single record file; the store
//! recovers from them locally by dropping the record. `ApiError` covers
//! store-level failures that are surfaced to callers.

use std::path::PathBuf;
use thiserror::Error;

/// Per-record storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record unreadable: {path}: {source}")]
    RecordUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Record has no identifier header: {0}")]
    RecordMissingIdentifier(PathBuf),

    #[error("Malformed header value in {path}: {message}")]
    MappingParseFailure { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn mapping(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        StorageError::MappingParseFailure {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Store-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Storage directory unusable: {0}")]
    DirectoryUnusable(String),

    #[error("Concurrent access to thread {0}; another save is in progress")]
    ConcurrentAccessViolation(String),

    #[error("Comment not found: {0}")]
    CommentNotFound(String),

    #[error("Parent comment {parent} not found in thread {thread}")]
    ParentNotFound { thread: String, parent: String },

    #[error("Record already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
