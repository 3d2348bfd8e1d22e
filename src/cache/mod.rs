//! Thread-keyed caches
//!
//! Two process-local caches sit in front of the filesystem: the path index
//! (thread id to record paths) and the object cache (thread id to resolved
//! hierarchy). Both are instances of `ThreadCache` and are handed to the store
//! by composition. Entries live until explicitly invalidated.

pub mod object_cache;
pub mod path_index;

pub use object_cache::ObjectCache;
pub use path_index::{DirectoryScanner, PathIndex, WalkdirScanner};

use crate::types::ThreadId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hit/miss counters of a cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Invalidation count of one thread, read before a rebuild starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    thread: u64,
}

struct Slots<V> {
    entries: HashMap<ThreadId, Arc<V>>,
    generations: HashMap<ThreadId, u64>,
    /// bumped by `clear`
    epoch: u64,
}

impl<V> Slots<V> {
    fn generation(&self, thread_id: &str) -> Generation {
        Generation {
            epoch: self.epoch,
            thread: self.generations.get(thread_id).copied().unwrap_or(0),
        }
    }
}

/// Generic get/put/invalidate cache keyed by thread id
///
/// Every invalidation bumps the thread's generation. A value built from a
/// read that started before an invalidation is refused by `put_if_current`,
/// so a rebuild racing a save never re-caches the pre-save state.
pub struct ThreadCache<V> {
    slots: RwLock<Slots<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> ThreadCache<V> {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Slots {
                entries: HashMap::new(),
                generations: HashMap::new(),
                epoch: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, thread_id: &str) -> Option<Arc<V>> {
        let found = self.slots.read().entries.get(thread_id).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Current generation of a thread; capture it before reading the source.
    pub fn generation(&self, thread_id: &str) -> Generation {
        self.slots.read().generation(thread_id)
    }

    /// Store a value, replacing any previous entry
    pub fn put(&self, thread_id: &str, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.slots
            .write()
            .entries
            .insert(thread_id.to_string(), Arc::clone(&value));
        value
    }

    /// Store a value only if the thread was not invalidated since
    /// `generation` was taken. The value is returned either way.
    pub fn put_if_current(&self, thread_id: &str, value: V, generation: Generation) -> Arc<V> {
        let value = Arc::new(value);
        let mut slots = self.slots.write();
        if slots.generation(thread_id) == generation {
            slots.entries.insert(thread_id.to_string(), Arc::clone(&value));
        }
        value
    }

    /// Drop the entry for one thread and bump its generation; returns
    /// whether an entry existed
    pub fn invalidate(&self, thread_id: &str) -> bool {
        let mut slots = self.slots.write();
        *slots.generations.entry(thread_id.to_string()).or_insert(0) += 1;
        slots.entries.remove(thread_id).is_some()
    }

    pub fn clear(&self) {
        let mut slots = self.slots.write();
        slots.epoch += 1;
        slots.entries.clear();
    }

    pub fn contains(&self, thread_id: &str) -> bool {
        self.slots.read().entries.contains_key(thread_id)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.slots.read().entries.len(),
        }
    }
}

impl<V> Default for ThreadCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
