//! Resolved-hierarchy cache
//!
//! Memoizes fully annotated thread hierarchies so a thread is parsed and
//! graphed at most once per cache generation.

use super::{CacheStats, Generation, ThreadCache};
use crate::hierarchy::ThreadHierarchy;
use std::sync::Arc;

/// Thread id to resolved `ThreadHierarchy`
#[derive(Default)]
pub struct ObjectCache {
    cache: ThreadCache<ThreadHierarchy>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, thread_id: &str) -> Option<Arc<ThreadHierarchy>> {
        self.cache.get(thread_id)
    }

    pub fn store(&self, thread_id: &str, hierarchy: ThreadHierarchy) -> Arc<ThreadHierarchy> {
        self.cache.put(thread_id, hierarchy)
    }

    pub fn generation(&self, thread_id: &str) -> Generation {
        self.cache.generation(thread_id)
    }

    /// Store unless the thread was invalidated after `generation` was taken
    pub fn store_if_current(
        &self,
        thread_id: &str,
        hierarchy: ThreadHierarchy,
        generation: Generation,
    ) -> Arc<ThreadHierarchy> {
        self.cache.put_if_current(thread_id, hierarchy, generation)
    }

    pub fn invalidate(&self, thread_id: &str) {
        self.cache.invalidate(thread_id);
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
