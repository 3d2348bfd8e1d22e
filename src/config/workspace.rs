//! Workspace-relative storage settings.

pub mod storage_paths;
