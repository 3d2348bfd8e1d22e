use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use threadstore::{CommentStore, StoreConfig, ThreadLockManager};

/// Write `content` as the record file of `rel` below `root`
pub fn write_record(root: &Path, rel: &str, content: &str) -> PathBuf {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("comment.md");
    fs::write(&path, content).unwrap();
    path
}

/// Store over a scratch root with its own lock manager
pub fn open_store(temp: &TempDir) -> CommentStore {
    CommentStore::new(StoreConfig::with_root(temp.path()))
        .unwrap()
        .with_lock_manager(Arc::new(ThreadLockManager::new()))
}
