//! Comment entity
//!
//! A `Comment` is the in-memory form of one record: typed data attributes,
//! the raw attribute mapping used for persistence, the body, the resolved
//! author, and the graph attributes filled in by hierarchy annotation.

use crate::error::StorageError;
use crate::record::fields::{coerce, FieldValue};
use crate::record::CommentRecord;
use crate::types::{CommentId, ThreadId, ID_KEY, INLINE_BODY_KEY};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Data attribute flag: the record still carries a legacy inline body
pub const NEEDS_MIGRATION_KEY: &str = "needs_migration";

/// Data attribute flag: the body was cut at the configured cap
pub const CONTENT_TRUNCATED_KEY: &str = "content_truncated";

/// Data attributes that are never written to disk
pub const INTERNAL_KEYS: &[&str] = &[NEEDS_MIGRATION_KEY, CONTENT_TRUNCATED_KEY, INLINE_BODY_KEY];

static LAST_COMMENT_ID: AtomicU64 = AtomicU64::new(0);

/// Next comment id: the current Unix time in seconds, bumped past the last id
/// handed out by this process.
pub fn next_comment_id() -> CommentId {
    let now = Utc::now().timestamp().max(0) as u64;
    let mut last = LAST_COMMENT_ID.load(Ordering::SeqCst);
    loop {
        let candidate = now.max(last + 1);
        match LAST_COMMENT_ID.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => return candidate.to_string(),
            Err(actual) => last = actual,
        }
    }
}

/// Persistence state of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommentState {
    New,
    Saved,
    Updated,
}

/// Resolved comment author
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// True when the author is not a known identity of the host system
    pub transient: bool,
}

/// Author-resolution capability
pub trait AuthorResolver: Send + Sync {
    fn resolve_author(&self, comment: &Comment) -> Author;
}

/// Builds a transient author from the comment's `author`, `email` and `url` headers
#[derive(Debug, Clone, Default)]
pub struct HeaderAuthorResolver;

impl AuthorResolver for HeaderAuthorResolver {
    fn resolve_author(&self, comment: &Comment) -> Author {
        let text = |key: &str| {
            comment
                .get(key)
                .map(FieldValue::to_header_string)
                .filter(|s| !s.trim().is_empty())
        };
        Author {
            name: text("author").unwrap_or_else(|| "Anonymous".to_string()),
            email: text("email"),
            url: text("url"),
            transient: true,
        }
    }
}

/// Attributes derived from the thread graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphAttributes {
    pub is_root: bool,
    pub is_parent: bool,
    pub is_reply: bool,
    pub depth: usize,
    pub parent: Option<CommentId>,
    pub children: Vec<CommentId>,
    pub ancestors: Vec<CommentId>,
    pub descendants: Vec<CommentId>,
    pub absolute_root: Option<CommentId>,
}

/// One comment of a thread
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub thread_id: ThreadId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub data: IndexMap<String, FieldValue>,
    #[serde(skip)]
    pub raw: IndexMap<String, String>,
    pub body: String,
    pub author: Option<Author>,
    pub date: Option<DateTime<Utc>>,
    pub formatted_date: Option<String>,
    #[serde(flatten)]
    pub graph: GraphAttributes,
    state: CommentState,
}

impl Comment {
    fn unsaved(thread_id: &str, parent: Option<CommentId>, body: &str) -> Self {
        let id = next_comment_id();
        let mut data = IndexMap::new();
        data.insert(ID_KEY.to_string(), FieldValue::Text(id.clone()));
        Self {
            id,
            thread_id: thread_id.to_string(),
            path: None,
            data,
            raw: IndexMap::new(),
            body: body.to_string(),
            author: None,
            date: None,
            formatted_date: None,
            graph: GraphAttributes {
                is_root: parent.is_none(),
                is_reply: parent.is_some(),
                parent,
                ..Default::default()
            },
            state: CommentState::New,
        }
    }

    /// New top-level comment, not yet saved
    pub fn new_top_level(thread_id: &str, body: &str) -> Self {
        Self::unsaved(thread_id, None, body)
    }

    /// New reply to `parent_id`, not yet saved
    pub fn new_reply(thread_id: &str, parent_id: &str, body: &str) -> Self {
        Self::unsaved(thread_id, Some(parent_id.to_string()), body)
    }

    /// Build a comment from a parsed record and its raw attribute mapping.
    ///
    /// Raw values are typed through the field table; prototype headers already
    /// typed by the parser take precedence.
    pub fn from_record(
        thread_id: &str,
        record: CommentRecord,
        raw: IndexMap<String, String>,
    ) -> Result<Self, StorageError> {
        let id = record.require_id()?.to_string();

        let mut data = IndexMap::with_capacity(raw.len() + 2);
        for (key, value) in &raw {
            if key == INLINE_BODY_KEY {
                continue;
            }
            let typed = coerce(key, value).map_err(|m| StorageError::mapping(&record.path, m))?;
            data.insert(key.clone(), typed);
        }
        for (key, value) in &record.headers {
            data.insert(key.clone(), value.clone());
        }
        data.insert(
            NEEDS_MIGRATION_KEY.to_string(),
            FieldValue::Bool(record.needs_migration),
        );
        data.insert(
            CONTENT_TRUNCATED_KEY.to_string(),
            FieldValue::Bool(record.content_truncated),
        );

        let body = record.text().to_string();
        Ok(Self {
            id,
            thread_id: thread_id.to_string(),
            path: Some(record.path),
            data,
            raw,
            body,
            author: None,
            date: None,
            formatted_date: None,
            graph: GraphAttributes::default(),
            state: CommentState::Saved,
        })
    }

    pub fn state(&self) -> CommentState {
        self.state
    }

    pub fn is_new(&self) -> bool {
        self.state == CommentState::New
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.data.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.data.shift_remove(key)
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(FieldValue::as_bool).unwrap_or(false)
    }

    pub fn is_spam(&self) -> bool {
        self.flag("spam")
    }

    pub fn is_approved(&self) -> bool {
        self.flag("approved")
    }

    pub fn needs_migration(&self) -> bool {
        self.flag(NEEDS_MIGRATION_KEY)
    }

    pub fn content_truncated(&self) -> bool {
        self.flag(CONTENT_TRUNCATED_KEY)
    }

    pub fn author_name(&self) -> &str {
        self.author.as_ref().map(|a| a.name.as_str()).unwrap_or("Anonymous")
    }

    /// Data attributes that get persisted, rendered as header strings
    pub fn storable_attributes(&self) -> IndexMap<String, String> {
        self.data
            .iter()
            .filter(|(key, _)| !INTERNAL_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.to_header_string()))
            .collect()
    }

    pub(crate) fn mark_saved(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
        self.raw = self.storable_attributes();
        self.state = CommentState::Saved;
    }

    pub(crate) fn mark_updated(&mut self) {
        self.raw = self.storable_attributes();
        self.set(NEEDS_MIGRATION_KEY, false);
        self.set(CONTENT_TRUNCATED_KEY, false);
        self.state = CommentState::Updated;
    }
}
