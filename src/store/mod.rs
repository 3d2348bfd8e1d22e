//! Comment Store
//!
//! Flat-file storage for threaded comments. Each thread is a directory below
//! the storage root; every comment is one record file, and replies nest below
//! their parent in a `replies/<id>` directory. A top-level comment lives at
//! `<thread>/replies/<id>/<record>`; a record directly in the thread directory
//! (`<thread>/<record>`) has no comment id in its path and is ignored.
//!
//! Reads go through two caches: the path index (record files per thread) and
//! the object cache (resolved hierarchies). Writes run under a per-thread
//! guard and invalidate both caches for the thread on success.

mod save;

pub use save::StatusChange;

use crate::cache::path_index::thread_directory;
use crate::cache::{DirectoryScanner, ObjectCache, PathIndex, WalkdirScanner};
use crate::codec::{HeaderCodec, YamlHeaderCodec};
use crate::comment::{AuthorResolver, Comment, HeaderAuthorResolver};
use crate::concurrency::ThreadLockManager;
use crate::config::StoreConfig;
use crate::error::{ApiError, StorageError};
use crate::hierarchy::{annotate_with_graph, comment_id_from_path, paths_to_graph, ThreadHierarchy};
use crate::record::RecordParser;
use crate::types::ThreadId;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Flat-file comment store
pub struct CommentStore {
    config: StoreConfig,
    root: PathBuf,
    parser: RecordParser,
    codec: Arc<dyn HeaderCodec>,
    authors: Arc<dyn AuthorResolver>,
    paths: Arc<PathIndex>,
    objects: Arc<ObjectCache>,
    locks: Arc<ThreadLockManager>,
    usable: bool,
}

impl CommentStore {
    /// Open a store over `config.storage_root`.
    ///
    /// The root is checked once here. A missing, non-directory, or read-only
    /// root leaves the store unusable: reads return empty hierarchies and
    /// writes fail with `DirectoryUnusable`.
    pub fn new(config: StoreConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let root = config.storage_root.clone();
        let usable = match check_storage_root(&root) {
            Ok(()) => true,
            Err(reason) => {
                error!(root = %root.display(), "Comment storage unusable: {}", reason);
                false
            }
        };

        let paths = PathIndex::new(&root, &config.record_file_name, Arc::new(WalkdirScanner));
        Ok(Self {
            parser: RecordParser::new(config.max_body_length),
            codec: Arc::new(YamlHeaderCodec::new()),
            authors: Arc::new(HeaderAuthorResolver),
            paths: Arc::new(paths),
            objects: Arc::new(ObjectCache::new()),
            locks: ThreadLockManager::global(),
            config,
            root,
            usable,
        })
    }

    /// Replace the directory-scan capability; starts a fresh path index.
    pub fn with_scanner(mut self, scanner: Arc<dyn DirectoryScanner>) -> Self {
        self.paths = Arc::new(PathIndex::new(
            &self.root,
            &self.config.record_file_name,
            scanner,
        ));
        self
    }

    pub fn with_path_index(mut self, paths: Arc<PathIndex>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_object_cache(mut self, objects: Arc<ObjectCache>) -> Self {
        self.objects = objects;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn HeaderCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_author_resolver(mut self, authors: Arc<dyn AuthorResolver>) -> Self {
        self.authors = authors;
        self
    }

    /// Use a private lock manager instead of the process-wide one
    pub fn with_lock_manager(mut self, locks: Arc<ThreadLockManager>) -> Self {
        self.locks = locks;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_usable(&self) -> bool {
        self.usable
    }

    pub fn path_index(&self) -> &PathIndex {
        &self.paths
    }

    pub fn object_cache(&self) -> &ObjectCache {
        &self.objects
    }

    /// Directory of a thread, or an error for ids that are not a single
    /// path segment
    pub fn thread_dir(&self, thread_id: &str) -> Result<PathBuf, ApiError> {
        thread_directory(&self.root, thread_id).ok_or_else(|| {
            ApiError::DirectoryUnusable(format!("invalid thread id '{}'", thread_id))
        })
    }

    /// The save guard of a thread
    pub fn thread_lock(&self, thread_id: &str) -> Result<Arc<Mutex<()>>, ApiError> {
        Ok(self.locks.lock_for(&self.thread_dir(thread_id)?))
    }

    /// Full hierarchy of a thread, served from the object cache when present.
    pub fn comments_for_thread(&self, thread_id: &str) -> Arc<ThreadHierarchy> {
        if !self.usable {
            return Arc::new(ThreadHierarchy::empty(thread_id));
        }
        if let Some(hierarchy) = self.objects.get(thread_id) {
            debug!(thread_id, "Object cache hit");
            return hierarchy;
        }
        debug!(thread_id, "Object cache miss");
        let generation = self.objects.generation(thread_id);
        let hierarchy = self.build_hierarchy(thread_id);
        self.objects.store_if_current(thread_id, hierarchy, generation)
    }

    /// Resolve a thread from its record files, bypassing the object cache.
    pub fn build_hierarchy(&self, thread_id: &str) -> ThreadHierarchy {
        let Some(thread_dir) = thread_directory(&self.root, thread_id) else {
            warn!(thread_id, "Rejecting thread id that is not a single path segment");
            return ThreadHierarchy::empty(thread_id);
        };

        let paths = self.paths.paths(thread_id);
        let mut comments = IndexMap::with_capacity(paths.len());
        let mut surviving = Vec::with_capacity(paths.len());
        for path in paths.iter() {
            let comment = match self.load_comment(thread_id, path) {
                Ok(comment) => comment,
                Err(e) => {
                    warn!(thread_id, "Dropping record: {}", e);
                    continue;
                }
            };
            if comments.contains_key(&comment.id) {
                warn!(
                    thread_id,
                    comment_id = %comment.id,
                    path = %path.display(),
                    "Dropping record with duplicate identifier"
                );
                continue;
            }
            surviving.push(path.clone());
            comments.insert(comment.id.clone(), comment);
        }

        let graph = paths_to_graph(&thread_dir, &surviving, &self.config.replies_dir);
        let hierarchy = annotate_with_graph(thread_id, graph, comments, &self.config.date_format);
        debug!(
            thread_id,
            files = paths.len(),
            comments = hierarchy.len(),
            "Resolved thread hierarchy"
        );
        hierarchy
    }

    /// Parse one record file into a `Comment` of `thread_id`.
    ///
    /// The identifier header must match the directory the record sits in.
    pub fn load_comment(&self, thread_id: &str, path: &Path) -> Result<Comment, StorageError> {
        let record = self.parser.parse(path)?;
        let id = record.require_id()?.to_string();

        if let Some(thread_dir) = thread_directory(&self.root, thread_id) {
            if let Some(path_id) = comment_id_from_path(&thread_dir, path, &self.config.replies_dir)
            {
                if path_id != id {
                    return Err(StorageError::mapping(
                        path,
                        format!("identifier {} does not match directory {}", id, path_id),
                    ));
                }
            }
        }

        let raw = self
            .codec
            .parse_block(&record.raw_header_lines)
            .map_err(|message| StorageError::mapping(path, message))?;
        let mut comment = Comment::from_record(thread_id, record, raw)?;
        comment.author = Some(self.authors.resolve_author(&comment));
        Ok(comment)
    }

    /// Comment of a known thread
    pub fn find_in_thread(&self, thread_id: &str, comment_id: &str) -> Option<Comment> {
        self.comments_for_thread(thread_id).get(comment_id).cloned()
    }

    /// Search every thread below the storage root for `comment_id`.
    pub fn find_by_id(&self, comment_id: &str) -> Option<Comment> {
        self.thread_ids()
            .iter()
            .find_map(|thread_id| self.find_in_thread(thread_id, comment_id))
    }

    /// Thread directories below the storage root, sorted by name
    pub fn thread_ids(&self) -> Vec<ThreadId> {
        if !self.usable {
            return Vec::new();
        }
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), "Failed to list threads: {}", e);
                return Vec::new();
            }
        };

        let mut ids: Vec<ThreadId> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Failed to read directory entry in {}: {}", self.root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !name.starts_with('.'))
            .collect();
        ids.sort();
        ids
    }

    /// Drop both cache entries of a thread
    pub fn invalidate(&self, thread_id: &str) {
        self.paths.invalidate(thread_id);
        self.objects.invalidate(thread_id);
    }

    pub fn invalidate_all(&self) {
        self.paths.invalidate_all();
        self.objects.invalidate_all();
    }

    fn ensure_usable(&self) -> Result<(), ApiError> {
        if self.usable {
            Ok(())
        } else {
            Err(ApiError::DirectoryUnusable(self.root.display().to_string()))
        }
    }
}

/// Startup check of the storage root
fn check_storage_root(root: &Path) -> Result<(), String> {
    let metadata = std::fs::metadata(root).map_err(|e| format!("{}: {}", root.display(), e))?;
    if !metadata.is_dir() {
        return Err(format!("{} is not a directory", root.display()));
    }
    if metadata.permissions().readonly() {
        return Err(format!("{} is read-only", root.display()));
    }
    Ok(())
}
