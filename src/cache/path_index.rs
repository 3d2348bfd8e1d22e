//! Path-listing cache
//!
//! Maps a thread id to the record files beneath the thread's directory. A miss
//! walks the directory once; hits never touch the filesystem until the thread
//! is invalidated.

use super::{CacheStats, ThreadCache};
use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory-scan capability
pub trait DirectoryScanner: Send + Sync {
    /// Files below `root` whose name matches `pattern`, in a stable order.
    ///
    /// A missing `root` yields an empty list.
    fn list_files_matching(&self, root: &Path, pattern: &str) -> Result<Vec<PathBuf>, StorageError>;
}

/// Match a file name against a pattern with at most one `*` wildcard
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
        None => name == pattern,
    }
}

/// Recursive scanner over `walkdir`, entries sorted by file name
#[derive(Debug, Clone, Default)]
pub struct WalkdirScanner;

impl DirectoryScanner for WalkdirScanner {
    fn list_files_matching(&self, root: &Path, pattern: &str) -> Result<Vec<PathBuf>, StorageError> {
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    // entries may vanish while a save runs elsewhere
                    warn!("Failed to read directory entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let matched = entry
                .file_name()
                .to_str()
                .map(|name| matches_pattern(name, pattern))
                .unwrap_or(false);
            if matched {
                found.push(entry.into_path());
            }
        }
        Ok(found)
    }
}

/// Directory of `thread_id` below `storage_root`.
///
/// Thread ids must be a single plain path segment.
pub fn thread_directory(storage_root: &Path, thread_id: &str) -> Option<PathBuf> {
    let mut components = Path::new(thread_id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(storage_root.join(thread_id)),
        _ => None,
    }
}

/// Per-thread cache of record paths
pub struct PathIndex {
    storage_root: PathBuf,
    pattern: String,
    scanner: Arc<dyn DirectoryScanner>,
    cache: ThreadCache<Vec<PathBuf>>,
    scans: AtomicU64,
}

impl PathIndex {
    pub fn new(
        storage_root: impl Into<PathBuf>,
        pattern: impl Into<String>,
        scanner: Arc<dyn DirectoryScanner>,
    ) -> Self {
        Self {
            storage_root: storage_root.into(),
            pattern: pattern.into(),
            scanner,
            cache: ThreadCache::new(),
            scans: AtomicU64::new(0),
        }
    }

    /// Record paths of a thread, scanning on miss
    pub fn paths(&self, thread_id: &str) -> Arc<Vec<PathBuf>> {
        if let Some(paths) = self.cache.get(thread_id) {
            debug!(thread_id, count = paths.len(), "Path index hit");
            return paths;
        }

        let Some(dir) = thread_directory(&self.storage_root, thread_id) else {
            warn!(thread_id, "Rejecting thread id that is not a single path segment");
            return Arc::new(Vec::new());
        };

        let generation = self.cache.generation(thread_id);
        self.scans.fetch_add(1, Ordering::Relaxed);
        match self.scanner.list_files_matching(&dir, &self.pattern) {
            Ok(paths) => {
                debug!(thread_id, count = paths.len(), "Path index scan");
                self.cache.put_if_current(thread_id, paths, generation)
            }
            Err(e) => {
                // not cached, the next read retries the scan
                warn!(thread_id, "Failed to scan thread directory: {}", e);
                Arc::new(Vec::new())
            }
        }
    }

    pub fn invalidate(&self, thread_id: &str) {
        self.cache.invalidate(thread_id);
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    /// Number of directory scans performed so far
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
