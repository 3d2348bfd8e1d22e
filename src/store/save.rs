//! Write path: create, update, moderation status, legacy migration.

use super::CommentStore;
use crate::comment::{Comment, CONTENT_TRUNCATED_KEY};
use crate::error::{ApiError, StorageError};
use crate::record::fields::coerce;
use crate::record::{header_groups, CommentRecord, RecordParser};
use crate::types::{CommentId, ID_KEY};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of a status change for one comment id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub id: CommentId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommentStore {
    /// Persist a comment.
    ///
    /// New comments get a record file below their parent (or the thread's
    /// replies directory); saved comments are merged into their existing
    /// record. Fails fast with `ConcurrentAccessViolation` when another save
    /// holds the thread. On failure the comment's state is unchanged.
    pub fn save(&self, comment: &mut Comment) -> Result<(), ApiError> {
        self.ensure_usable()?;
        let thread_id = comment.thread_id.clone();
        let thread_dir = self.thread_dir(&thread_id)?;

        self.locks.with_guard(&thread_dir, &thread_id, || {
            if comment.is_new() {
                self.create(&thread_dir, comment)?;
            } else {
                self.update(comment)?;
            }
            self.invalidate(&thread_id);
            Ok(())
        })
    }

    fn create(&self, thread_dir: &Path, comment: &mut Comment) -> Result<(), ApiError> {
        let replies = &self.config.replies_dir;
        let dir = match comment.graph.parent.clone() {
            None => thread_dir.join(replies).join(&comment.id),
            Some(parent_id) => {
                let parent_path = self
                    .comments_for_thread(&comment.thread_id)
                    .graph()
                    .path(&parent_id)
                    .map(Path::to_path_buf)
                    .ok_or_else(|| ApiError::ParentNotFound {
                        thread: comment.thread_id.clone(),
                        parent: parent_id.clone(),
                    })?;
                let parent_dir = parent_path.parent().unwrap_or(thread_dir);
                parent_dir.join(replies).join(&comment.id)
            }
        };

        let path = dir.join(&self.config.record_file_name);
        if path.exists() {
            return Err(ApiError::AlreadyExists(path));
        }

        let mut mapping = IndexMap::new();
        mapping.insert(ID_KEY.to_string(), comment.id.clone());
        for (key, value) in comment.storable_attributes() {
            if key != ID_KEY {
                mapping.insert(key, value);
            }
        }
        let content = self.codec.render_document(&mapping, &comment.body);

        fs::create_dir_all(&dir).map_err(StorageError::from)?;
        write_atomic(&path, &content)?;

        if comment.author.is_none() {
            comment.author = Some(self.authors.resolve_author(comment));
        }
        comment.mark_saved(&path);
        info!(
            thread_id = %comment.thread_id,
            comment_id = %comment.id,
            path = %path.display(),
            "Saved new comment"
        );
        Ok(())
    }

    fn update(&self, comment: &mut Comment) -> Result<(), ApiError> {
        let path = comment
            .path
            .clone()
            .ok_or_else(|| ApiError::CommentNotFound(comment.id.clone()))?;

        // uncapped so a truncated body can be written back in full
        let record = RecordParser::new(usize::MAX).parse(&path)?;
        let on_disk = self
            .codec
            .parse_block(&record.raw_header_lines)
            .map_err(|message| StorageError::mapping(&path, message))?;

        let storable = comment.storable_attributes();
        let header_lines = self.merge_header_lines(&record, &on_disk, &storable);

        let keep_full_body =
            comment.content_truncated() && record.text().starts_with(comment.body.as_str());
        let body = if keep_full_body {
            record.text()
        } else {
            comment.body.as_str()
        };

        let content = record.render_with(&header_lines, body);
        write_atomic(&path, &content)?;

        comment.mark_updated();
        if keep_full_body {
            comment.set(CONTENT_TRUNCATED_KEY, true);
        }
        info!(
            thread_id = %comment.thread_id,
            comment_id = %comment.id,
            migrated = record.needs_migration,
            "Updated comment"
        );
        Ok(())
    }

    /// Header lines for an updated record.
    ///
    /// Groups whose value is unchanged are kept verbatim, changed keys are
    /// re-rendered in place, removed keys are dropped, new keys are appended.
    fn merge_header_lines(
        &self,
        record: &CommentRecord,
        on_disk: &IndexMap<String, String>,
        storable: &IndexMap<String, String>,
    ) -> Vec<String> {
        let mut lines = Vec::with_capacity(record.raw_header_lines.len());
        let mut seen: HashSet<String> = HashSet::new();

        for group in header_groups(&record.raw_header_lines) {
            let Some(key) = group.key else {
                lines.extend(group.lines);
                continue;
            };
            if !seen.insert(key.clone()) {
                continue;
            }
            let Some(value) = storable.get(&key) else {
                debug!(key = %key, "Dropping removed header");
                continue;
            };
            let unchanged = on_disk
                .get(&key)
                .is_some_and(|old| same_value(&key, old, value));
            if unchanged {
                lines.extend(group.lines);
            } else {
                let mut single = IndexMap::new();
                single.insert(key, value.clone());
                lines.extend(self.codec.render_entries(&single));
            }
        }

        let added: IndexMap<String, String> = storable
            .iter()
            .filter(|(key, _)| !seen.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        lines.extend(self.codec.render_entries(&added));
        lines
    }

    /// Set or clear the `spam` flag on each comment.
    pub fn set_spam_status(&self, ids: &[CommentId], spam: bool) -> Vec<StatusChange> {
        self.set_status(ids, "spam", spam)
    }

    /// Set or clear the `approved` flag on each comment.
    pub fn set_approved_status(&self, ids: &[CommentId], approved: bool) -> Vec<StatusChange> {
        self.set_status(ids, "approved", approved)
    }

    fn set_status(&self, ids: &[CommentId], key: &str, value: bool) -> Vec<StatusChange> {
        ids.iter()
            .map(|id| {
                let result = self
                    .find_by_id(id)
                    .ok_or_else(|| ApiError::CommentNotFound(id.clone()))
                    .and_then(|mut comment| {
                        comment.set(key, value);
                        self.save(&mut comment)
                    });
                match result {
                    Ok(()) => StatusChange {
                        id: id.clone(),
                        success: true,
                        error: None,
                    },
                    Err(e) => {
                        warn!(comment_id = %id, key, "Status change failed: {}", e);
                        StatusChange {
                            id: id.clone(),
                            success: false,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .collect()
    }

    /// Rewrite every legacy record of a thread into the two-block form.
    ///
    /// Returns the number of records rewritten.
    pub fn migrate_thread(&self, thread_id: &str) -> Result<usize, ApiError> {
        self.ensure_usable()?;
        let pending: Vec<Comment> = self
            .comments_for_thread(thread_id)
            .needing_migration()
            .into_iter()
            .cloned()
            .collect();

        let mut migrated = 0;
        for mut comment in pending {
            self.save(&mut comment)?;
            migrated += 1;
        }
        if migrated > 0 {
            info!(thread_id, migrated, "Migrated legacy records");
        }
        Ok(migrated)
    }
}

/// Header values are equal when identical or equal after typing.
fn same_value(key: &str, old: &str, new: &str) -> bool {
    if old == new {
        return true;
    }
    match (coerce(key, old), coerce(key, new)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Write through a sibling temp file and rename over the target.
fn write_atomic(path: &Path, content: &str) -> Result<(), StorageError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp: PathBuf = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    fs::write(&temp, content)?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }
    Ok(())
}
