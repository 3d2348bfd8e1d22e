//! Thread Hierarchy
//!
//! Resolves a thread's comments into a parent/child tree. The graph comes from
//! record paths alone (`resolver`); `annotate_with_graph` then copies the graph
//! attributes onto each comment. Every storage backend goes through the same
//! annotation so depth, ancestors and absolute roots have one definition.

pub mod resolver;

pub use resolver::{comment_id_from_path, id_chain_from_path, paths_to_graph, ThreadGraph};

use crate::comment::{Comment, GraphAttributes};
use crate::types::{CommentId, ThreadId};
use chrono::DateTime;
use indexmap::IndexMap;
use std::fmt::Write;
use tracing::debug;

/// Fully resolved thread: graph plus annotated comments, with equal id sets
#[derive(Debug, Clone, Default)]
pub struct ThreadHierarchy {
    thread_id: ThreadId,
    graph: ThreadGraph,
    comments: IndexMap<CommentId, Comment>,
}

impl ThreadHierarchy {
    /// Valid hierarchy without comments
    pub fn empty(thread_id: &str) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            ..Default::default()
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn graph(&self) -> &ThreadGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.comments.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Comment> {
        self.comments.get(id)
    }

    /// Comments in discovery order
    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.values()
    }

    /// Comments sorted by id, i.e. by creation time
    pub fn chronological(&self) -> Vec<&Comment> {
        let mut out: Vec<&Comment> = self.comments.values().collect();
        out.sort_by_key(|c| (c.id.parse::<u64>().unwrap_or(u64::MAX), c.id.clone()));
        out
    }

    fn resolve(&self, ids: &[CommentId]) -> Vec<&Comment> {
        ids.iter().filter_map(|id| self.comments.get(id)).collect()
    }

    /// Top-level comments in discovery order
    pub fn roots(&self) -> Vec<&Comment> {
        self.comments.values().filter(|c| c.graph.is_root).collect()
    }

    pub fn parent_of(&self, id: &str) -> Option<&Comment> {
        let parent = self.get(id)?.graph.parent.as_ref()?;
        self.get(parent)
    }

    pub fn children_of(&self, id: &str) -> Vec<&Comment> {
        self.get(id)
            .map(|c| self.resolve(&c.graph.children))
            .unwrap_or_default()
    }

    pub fn ancestors_of(&self, id: &str) -> Vec<&Comment> {
        self.get(id)
            .map(|c| self.resolve(&c.graph.ancestors))
            .unwrap_or_default()
    }

    pub fn descendants_of(&self, id: &str) -> Vec<&Comment> {
        self.get(id)
            .map(|c| self.resolve(&c.graph.descendants))
            .unwrap_or_default()
    }

    pub fn absolute_root_of(&self, id: &str) -> Option<&Comment> {
        let root = self.get(id)?.graph.absolute_root.as_ref()?;
        self.get(root)
    }

    /// Comments still carrying a legacy inline body
    pub fn needing_migration(&self) -> Vec<&Comment> {
        self.comments
            .values()
            .filter(|c| c.needs_migration())
            .collect()
    }
}

/// Attach graph attributes to `comments` and assemble the hierarchy.
///
/// Comments without a graph node are dropped, and so are graph nodes (with
/// their subtrees) that have no comment. The absolute root of a comment is its
/// top-level ancestor, or the comment itself when it is top-level.
pub fn annotate_with_graph(
    thread_id: &str,
    graph: ThreadGraph,
    mut comments: IndexMap<CommentId, Comment>,
    date_format: &str,
) -> ThreadHierarchy {
    let graph = if graph.ids().all(|id| comments.contains_key(id)) {
        graph
    } else {
        graph.retain(|id| comments.contains_key(id))
    };

    let mut annotated = IndexMap::with_capacity(graph.len());
    for id in graph.ids() {
        let Some(mut comment) = comments.swap_remove(id) else {
            continue;
        };

        comment.date = id
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        comment.formatted_date = comment.date.and_then(|d| {
            let mut rendered = String::new();
            // an invalid strftime string is a formatting error, not a panic
            write!(rendered, "{}", d.format(date_format)).ok()?;
            Some(rendered)
        });

        let parent = graph.parent(id).cloned();
        let children = graph.children(id).to_vec();
        let ancestors = graph.ancestors(id);
        let absolute_root = ancestors.last().cloned().unwrap_or_else(|| id.clone());
        comment.graph = GraphAttributes {
            is_root: parent.is_none(),
            is_parent: !children.is_empty(),
            is_reply: parent.is_some(),
            depth: graph.depth(id).unwrap_or(0),
            parent,
            children,
            descendants: graph.descendants(id),
            ancestors,
            absolute_root: Some(absolute_root),
        };
        annotated.insert(id.clone(), comment);
    }

    for id in comments.keys() {
        debug!(thread_id, comment_id = %id, "Dropping comment without graph node");
    }

    ThreadHierarchy {
        thread_id: thread_id.to_string(),
        graph,
        comments: annotated,
    }
}
