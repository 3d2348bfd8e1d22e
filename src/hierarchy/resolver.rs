//! Path-shape structure resolution
//!
//! A reply to comment C lives in a `replies/<id>` directory beneath C's own
//! directory, so the whole thread graph can be read off the record paths
//! without opening a single file.

use crate::types::CommentId;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Parent/child graph of one thread, keyed by comment id in discovery order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadGraph {
    parents: IndexMap<CommentId, Option<CommentId>>,
    children: IndexMap<CommentId, Vec<CommentId>>,
    depths: IndexMap<CommentId, usize>,
    paths: IndexMap<CommentId, PathBuf>,
}

impl ThreadGraph {
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.parents.contains_key(id)
    }

    /// Ids in discovery order
    pub fn ids(&self) -> impl Iterator<Item = &CommentId> {
        self.parents.keys()
    }

    /// Top-level comments in discovery order
    pub fn roots(&self) -> Vec<&CommentId> {
        self.parents
            .iter()
            .filter(|(_, parent)| parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn parent(&self, id: &str) -> Option<&CommentId> {
        self.parents.get(id).and_then(Option::as_ref)
    }

    pub fn children(&self, id: &str) -> &[CommentId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn depth(&self, id: &str) -> Option<usize> {
        self.depths.get(id).copied()
    }

    pub fn path(&self, id: &str) -> Option<&Path> {
        self.paths.get(id).map(PathBuf::as_path)
    }

    pub fn is_root(&self, id: &str) -> bool {
        matches!(self.parents.get(id), Some(None))
    }

    /// Parent chain, immediate parent first, top-level comment last
    pub fn ancestors(&self, id: &str) -> Vec<CommentId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if out.len() >= self.len() {
                break;
            }
            out.push(parent.clone());
            current = self.parent(parent);
        }
        out
    }

    /// All replies at any depth, in pre-order over discovery-ordered children
    pub fn descendants(&self, id: &str) -> Vec<CommentId> {
        let mut out = Vec::new();
        let mut stack: Vec<&CommentId> = self.children(id).iter().rev().collect();
        while let Some(next) = stack.pop() {
            if out.len() >= self.len() {
                break;
            }
            out.push(next.clone());
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Copy of the graph keeping only ids accepted by `keep` whose whole
    /// ancestor chain is kept as well.
    pub fn retain<F>(&self, keep: F) -> ThreadGraph
    where
        F: Fn(&CommentId) -> bool,
    {
        let kept: HashSet<&CommentId> = self
            .ids()
            .filter(|id| keep(*id) && self.ancestors(id).iter().all(|a| keep(a)))
            .collect();

        let mut graph = ThreadGraph::default();
        for id in self.ids().filter(|id| kept.contains(id)) {
            graph.parents.insert(id.clone(), self.parents[id].clone());
            graph.depths.insert(id.clone(), self.depths[id]);
            graph.paths.insert(id.clone(), self.paths[id].clone());
            let children = self
                .children(id)
                .iter()
                .filter(|c| kept.contains(c))
                .cloned()
                .collect();
            graph.children.insert(id.clone(), children);
        }
        graph
    }
}

/// Id chain encoded by a record path: top-level id first, own id last.
///
/// Returns `None` when the directories between `thread_root` and the record
/// file are not a non-empty sequence of `<replies_dir>/<id>` pairs.
pub fn id_chain_from_path(
    thread_root: &Path,
    path: &Path,
    replies_dir: &str,
) -> Option<Vec<CommentId>> {
    let relative = path.strip_prefix(thread_root).ok()?;
    let directory = relative.parent()?;

    let mut segments = Vec::new();
    for component in directory.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str()?),
            _ => return None,
        }
    }
    if segments.is_empty() || segments.len() % 2 != 0 {
        return None;
    }

    let mut chain = Vec::with_capacity(segments.len() / 2);
    for pair in segments.chunks(2) {
        let (marker, id) = (pair[0], pair[1]);
        if marker != replies_dir || id.is_empty() || id == replies_dir {
            return None;
        }
        chain.push(id.to_string());
    }
    Some(chain)
}

/// Own comment id of a record path, if the path has the expected shape
pub fn comment_id_from_path(thread_root: &Path, path: &Path, replies_dir: &str) -> Option<CommentId> {
    id_chain_from_path(thread_root, path, replies_dir).and_then(|mut chain| chain.pop())
}

/// Build the thread graph from record paths.
///
/// Paths that do not match the `replies/<id>` nesting are skipped, as are
/// duplicate ids (first occurrence wins) and orphans whose parent record is
/// absent from `paths`.
pub fn paths_to_graph(thread_root: &Path, paths: &[PathBuf], replies_dir: &str) -> ThreadGraph {
    let mut chains: IndexMap<CommentId, (Vec<CommentId>, &PathBuf)> = IndexMap::new();
    for path in paths {
        let Some(chain) = id_chain_from_path(thread_root, path, replies_dir) else {
            debug!(path = %path.display(), "Skipping path outside replies nesting");
            continue;
        };
        let Some(id) = chain.last().cloned() else {
            continue;
        };
        if chains.contains_key(&id) {
            debug!(comment_id = %id, path = %path.display(), "Skipping duplicate comment id");
            continue;
        }
        chains.insert(id, (chain, path));
    }

    // every prefix of a chain must itself be a discovered comment with that chain
    let is_anchored = |chain: &[CommentId]| {
        (1..chain.len()).all(|end| {
            chains
                .get(&chain[end - 1])
                .is_some_and(|(ancestor_chain, _)| ancestor_chain.as_slice() == &chain[..end])
        })
    };

    let mut graph = ThreadGraph::default();
    for (id, (chain, path)) in &chains {
        if !is_anchored(chain) {
            debug!(comment_id = %id, "Skipping orphaned reply");
            continue;
        }
        let parent = chain.len().checked_sub(2).map(|i| chain[i].clone());
        graph.parents.insert(id.clone(), parent);
        graph.depths.insert(id.clone(), chain.len() - 1);
        graph.paths.insert(id.clone(), (*path).clone());
        graph.children.insert(id.clone(), Vec::new());
    }

    let links: Vec<(CommentId, CommentId)> = graph
        .parents
        .iter()
        .filter_map(|(id, parent)| parent.clone().map(|p| (p, id.clone())))
        .collect();
    for (parent, child) in links {
        if let Some(children) = graph.children.get_mut(&parent) {
            children.push(child);
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(root: &Path, rel: &str) -> PathBuf {
        root.join(rel).join("comment.md")
    }

    #[test]
    fn test_root_and_reply() {
        let root = Path::new("/store/thread-a");
        let paths = vec![
            record(root, "replies/1000"),
            record(root, "replies/1000/replies/2000"),
        ];
        let graph = paths_to_graph(root, &paths, "replies");

        assert_eq!(graph.len(), 2);
        assert!(graph.is_root("1000"));
        assert_eq!(graph.children("1000"), &["2000".to_string()]);
        assert_eq!(graph.depth("1000"), Some(0));
        assert_eq!(graph.depth("2000"), Some(1));
        assert_eq!(graph.parent("2000").map(String::as_str), Some("1000"));
        assert_eq!(graph.ancestors("2000"), vec!["1000".to_string()]);
        assert_eq!(graph.descendants("1000"), vec!["2000".to_string()]);
    }

    #[test]
    fn test_orders_follow_discovery() {
        let root = Path::new("/t");
        let paths = vec![
            record(root, "replies/10"),
            record(root, "replies/10/replies/30"),
            record(root, "replies/10/replies/30/replies/40"),
            record(root, "replies/10/replies/20"),
            record(root, "replies/5"),
        ];
        let graph = paths_to_graph(root, &paths, "replies");

        assert_eq!(graph.children("10"), &["30".to_string(), "20".to_string()]);
        assert_eq!(graph.descendants("10"), vec!["30", "40", "20"]);
        assert_eq!(graph.ancestors("40"), vec!["30", "10"]);
        assert_eq!(graph.roots(), vec!["10", "5"]);
        assert_eq!(graph.depth("40"), Some(2));
    }

    #[test]
    fn test_child_listed_before_parent() {
        let root = Path::new("/t");
        let paths = vec![
            record(root, "replies/1/replies/2"),
            record(root, "replies/1"),
        ];
        let graph = paths_to_graph(root, &paths, "replies");
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.children("1"), &["2".to_string()]);
    }

    #[test]
    fn test_malformed_paths_are_skipped() {
        let root = Path::new("/t");
        let paths = vec![
            root.join("comment.md"),
            record(root, "1000"),
            record(root, "replies"),
            record(root, "answers/1000"),
            record(root, "replies/1000/extra"),
            PathBuf::from("/elsewhere/replies/1/comment.md"),
            record(root, "replies/7"),
        ];
        let graph = paths_to_graph(root, &paths, "replies");
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec!["7"]);
    }

    #[test]
    fn test_orphans_and_duplicates_are_skipped() {
        let root = Path::new("/t");
        let paths = vec![
            record(root, "replies/1"),
            record(root, "replies/9/replies/2"),
            record(root, "replies/9/replies/2/replies/3"),
            record(root, "replies/1/replies/1"),
        ];
        let graph = paths_to_graph(root, &paths, "replies");
        assert_eq!(graph.ids().collect::<Vec<_>>(), vec!["1"]);
        assert!(graph.children("1").is_empty());
    }

    #[test]
    fn test_retain_drops_subtrees() {
        let root = Path::new("/t");
        let paths = vec![
            record(root, "replies/1"),
            record(root, "replies/1/replies/2"),
            record(root, "replies/1/replies/2/replies/3"),
            record(root, "replies/1/replies/4"),
        ];
        let graph = paths_to_graph(root, &paths, "replies");
        let pruned = graph.retain(|id| id != "2");
        assert_eq!(pruned.ids().collect::<Vec<_>>(), vec!["1", "4"]);
        assert_eq!(pruned.children("1"), &["4".to_string()]);
    }

    #[test]
    fn test_comment_id_from_path() {
        let root = Path::new("/t");
        assert_eq!(
            comment_id_from_path(root, &record(root, "replies/1/replies/2"), "replies"),
            Some("2".to_string())
        );
        assert_eq!(comment_id_from_path(root, &root.join("comment.md"), "replies"), None);
    }
}
