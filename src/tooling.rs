//! Tooling layer
//!
//! The `threadstore` command-line interface over `CommentStore`, plus the
//! text and JSON renderers it prints with.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
