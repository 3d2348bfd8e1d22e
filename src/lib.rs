//! Threadstore: Flat-File Threaded Comment Storage
//!
//! Comments live as individual record files (a `---` delimited header block
//! followed by a body) in nested `replies/<id>` directories that encode the
//! reply tree. The store parses records under a body cap, resolves the tree
//! from paths alone, caches both the path listing and the resolved hierarchy
//! per thread, and writes changes back without disturbing untouched header
//! lines.

pub mod cache;
pub mod codec;
pub mod comment;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod logging;
pub mod record;
pub mod store;
pub mod tooling;
pub mod types;

pub use cache::{
    CacheStats, DirectoryScanner, Generation, ObjectCache, PathIndex, ThreadCache, WalkdirScanner,
};
pub use codec::{HeaderCodec, YamlHeaderCodec};
pub use comment::{Author, AuthorResolver, Comment, CommentState, GraphAttributes, HeaderAuthorResolver};
pub use concurrency::ThreadLockManager;
pub use config::{ConfigLoader, StoreConfig, ThreadstoreConfig};
pub use error::{ApiError, StorageError};
pub use hierarchy::{annotate_with_graph, paths_to_graph, ThreadGraph, ThreadHierarchy};
pub use record::{CommentRecord, RecordParser};
pub use store::{CommentStore, StatusChange};
pub use types::{CommentId, ThreadId};
