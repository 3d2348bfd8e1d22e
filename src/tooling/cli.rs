//! CLI Tooling
//!
//! Command-line interface over the comment store. Every command returns its
//! output as a string; the binary decides where it goes.

use crate::config::{ConfigLoader, ThreadstoreConfig};
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::store::CommentStore;
use crate::tooling::format;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Threadstore CLI - flat-file threaded comments
#[derive(Parser)]
#[command(name = "threadstore")]
#[command(about = "Inspect and moderate flat-file comment threads")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Comment storage root (overrides store.storage_root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging config with command-line overrides applied
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a thread as a reply tree
    Thread {
        thread_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show a single comment
    Show {
        comment_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Mark comments as spam
    Spam {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Clear the flag instead of setting it
        #[arg(long)]
        unset: bool,
    },
    /// Mark comments as approved
    Approve {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Clear the flag instead of setting it
        #[arg(long)]
        unset: bool,
    },
    /// Rewrite legacy inline-body records of a thread
    Migrate { thread_id: String },
    /// List threads below the storage root
    Threads {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration
    Config {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
}

/// CLI context holding the loaded configuration and the store
pub struct CliContext {
    config: ThreadstoreConfig,
    store: CommentStore,
}

impl CliContext {
    /// Load configuration from an explicit file or the workspace sources.
    pub fn load_config(
        workspace_root: &Path,
        config_path: Option<&Path>,
    ) -> Result<ThreadstoreConfig, ApiError> {
        match config_path {
            Some(path) => ConfigLoader::load_from_file(path),
            None => ConfigLoader::load(workspace_root),
        }
    }

    /// Create a context from loaded configuration; the storage root is
    /// resolved against `workspace_root`.
    pub fn from_config(
        workspace_root: &Path,
        mut config: ThreadstoreConfig,
        root_override: Option<PathBuf>,
    ) -> Result<Self, ApiError> {
        if let Some(root) = root_override {
            config.store.storage_root = root;
        }
        config.store.storage_root = config.store.resolve_root(workspace_root);
        let store = CommentStore::new(config.store.clone())?;
        Ok(Self { config, store })
    }

    /// Create a new CLI context
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        root_override: Option<PathBuf>,
    ) -> Result<Self, ApiError> {
        let config = Self::load_config(&workspace_root, config_path.as_deref())?;
        Self::from_config(&workspace_root, config, root_override)
    }

    pub fn store(&self) -> &CommentStore {
        &self.store
    }

    pub fn config(&self) -> &ThreadstoreConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Thread { thread_id, format } => {
                let hierarchy = self.store.comments_for_thread(thread_id);
                match format.as_str() {
                    "json" => format::format_thread_json(&hierarchy),
                    _ => Ok(format::format_thread_text(&hierarchy)),
                }
            }
            Commands::Show { comment_id, format } => {
                let comment = self
                    .store
                    .find_by_id(comment_id)
                    .ok_or_else(|| ApiError::CommentNotFound(comment_id.clone()))?;
                match format.as_str() {
                    "json" => format::to_json(&comment),
                    _ => Ok(format::format_comment_text(&comment)),
                }
            }
            Commands::Spam { ids, unset } => {
                let report = self.store.set_spam_status(ids, !unset);
                let action = if *unset { "spam cleared" } else { "marked spam" };
                info!(count = ids.len(), spam = !unset, "Spam status command");
                Ok(format::format_status_report(&report, action))
            }
            Commands::Approve { ids, unset } => {
                let report = self.store.set_approved_status(ids, !unset);
                let action = if *unset { "approval cleared" } else { "approved" };
                info!(count = ids.len(), approved = !unset, "Approval status command");
                Ok(format::format_status_report(&report, action))
            }
            Commands::Migrate { thread_id } => {
                let migrated = self.store.migrate_thread(thread_id)?;
                Ok(format!(
                    "Migrated {} legacy record(s) in thread {}",
                    migrated, thread_id
                ))
            }
            Commands::Threads { format } => {
                let rows: Vec<(String, usize)> = self
                    .store
                    .thread_ids()
                    .into_iter()
                    .map(|id| {
                        let count = self.store.comments_for_thread(&id).len();
                        (id, count)
                    })
                    .collect();
                match format.as_str() {
                    "json" => format::to_json(&rows),
                    _ => Ok(format::format_threads_text(&rows)),
                }
            }
            Commands::Config { format } => match format.as_str() {
                "json" => format::to_json(&self.config),
                _ => toml::to_string_pretty(&self.config)
                    .map_err(|e| ApiError::SerializationError(format!("config: {}", e))),
            },
        }
    }
}
