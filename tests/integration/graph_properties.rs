use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use threadstore::hierarchy::paths_to_graph;

/// Record paths of a generated tree; `parents[i]` picks a parent among the
/// nodes before `i`, `None` makes `i` top-level.
fn tree_paths(root: &Path, parents: &[Option<Index>]) -> (Vec<PathBuf>, Vec<Option<usize>>) {
    let mut dirs: Vec<PathBuf> = Vec::with_capacity(parents.len());
    let mut resolved = Vec::with_capacity(parents.len());
    for (i, choice) in parents.iter().enumerate() {
        let parent = match choice {
            Some(ix) if i > 0 => Some(ix.index(i)),
            _ => None,
        };
        let base = match parent {
            Some(p) => dirs[p].clone(),
            None => root.to_path_buf(),
        };
        dirs.push(base.join("replies").join((1000 + i).to_string()));
        resolved.push(parent);
    }
    let paths = dirs.iter().map(|d| d.join("comment.md")).collect();
    (paths, resolved)
}

fn parents_strategy() -> impl Strategy<Value = Vec<Option<Index>>> {
    prop::collection::vec(proptest::option::of(any::<Index>()), 1..40)
}

proptest! {
    #[test]
    fn depth_follows_parent(parents in parents_strategy()) {
        let root = Path::new("/store/t");
        let (paths, resolved) = tree_paths(root, &parents);
        let graph = paths_to_graph(root, &paths, "replies");

        prop_assert_eq!(graph.len(), paths.len());
        for (i, parent) in resolved.iter().enumerate() {
            let id = (1000 + i).to_string();
            match parent {
                None => {
                    prop_assert!(graph.is_root(&id));
                    prop_assert_eq!(graph.depth(&id), Some(0));
                }
                Some(p) => {
                    let parent_id = (1000 + p).to_string();
                    prop_assert_eq!(graph.parent(&id), Some(&parent_id));
                    prop_assert_eq!(
                        graph.depth(&id),
                        graph.depth(&parent_id).map(|d| d + 1)
                    );
                }
            }
        }
    }

    #[test]
    fn ancestors_and_descendants_are_dual(parents in parents_strategy()) {
        let root = Path::new("/store/t");
        let (mut paths, _) = tree_paths(root, &parents);
        // discovery order must not matter for membership
        paths.reverse();
        let graph = paths_to_graph(root, &paths, "replies");

        let ids: Vec<String> = graph.ids().cloned().collect();
        for id in &ids {
            let ancestors = graph.ancestors(id);
            prop_assert!(!ancestors.contains(id));
            prop_assert_eq!(ancestors.len(), graph.depth(id).unwrap());
            for ancestor in &ancestors {
                prop_assert!(graph.descendants(ancestor).contains(id));
            }
            let descendants = graph.descendants(id);
            prop_assert!(!descendants.contains(id));
            let unique: HashSet<&String> = descendants.iter().collect();
            prop_assert_eq!(unique.len(), descendants.len());
            for descendant in &descendants {
                prop_assert!(graph.ancestors(descendant).contains(id));
            }
        }
    }

    #[test]
    fn removing_a_record_drops_its_subtree(parents in parents_strategy(), victim in any::<Index>()) {
        let root = Path::new("/store/t");
        let (paths, _) = tree_paths(root, &parents);
        let full = paths_to_graph(root, &paths, "replies");

        let removed = victim.index(paths.len());
        let removed_id = (1000 + removed).to_string();
        let mut gone: HashSet<String> = full.descendants(&removed_id).into_iter().collect();
        gone.insert(removed_id);

        let survivors: Vec<PathBuf> = paths
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != removed)
            .map(|(_, p)| p.clone())
            .collect();
        let pruned = paths_to_graph(root, &survivors, "replies");

        prop_assert_eq!(pruned.len(), full.len() - gone.len());
        for id in pruned.ids() {
            prop_assert!(!gone.contains(id));
        }
    }
}
