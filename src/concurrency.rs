//! Save critical sections
//!
//! Writes to a thread run under a per-thread mutex. Saves take it with
//! `try_lock` so a second writer fails fast with a concurrent-access error
//! instead of queueing behind the first. Reads never take these locks.

use crate::error::ApiError;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Per-thread lock manager, keyed by thread directory
pub struct ThreadLockManager {
    /// Map from thread directory to its save mutex
    locks: RwLock<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ThreadLockManager {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Lock manager shared by every store in this process
    pub fn global() -> Arc<ThreadLockManager> {
        static GLOBAL: OnceLock<Arc<ThreadLockManager>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(ThreadLockManager::new())))
    }

    /// Get or create the lock for a thread directory
    pub fn lock_for(&self, thread_dir: &Path) -> Arc<Mutex<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(thread_dir) {
                return Arc::clone(lock);
            }
        }

        let mut map = self.locks.write();
        // another writer may have inserted it between the two locks
        Arc::clone(
            map.entry(thread_dir.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Run `f` inside the thread's critical section, failing fast when held.
    pub fn with_guard<T, F>(&self, thread_dir: &Path, thread_id: &str, f: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Result<T, ApiError>,
    {
        let lock = self.lock_for(thread_dir);
        let _guard = lock
            .try_lock()
            .ok_or_else(|| ApiError::ConcurrentAccessViolation(thread_id.to_string()))?;
        f()
    }
}

impl Default for ThreadLockManager {
    fn default() -> Self {
        Self::new()
    }
}
