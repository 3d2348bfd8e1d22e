use crate::integration::support::{open_store, write_record};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::thread;
use tempfile::TempDir;
use threadstore::{
    ApiError, Comment, CommentState, CommentStore, DirectoryScanner, ObjectCache, PathIndex,
    StorageError, StoreConfig, ThreadLockManager, WalkdirScanner,
};

/// Scanner that lets another store save a new comment while the first
/// listing is in flight
struct SaveDuringFirstScan {
    writer: Arc<OnceLock<Arc<CommentStore>>>,
    fired: AtomicBool,
}

impl DirectoryScanner for SaveDuringFirstScan {
    fn list_files_matching(&self, root: &Path, pattern: &str) -> Result<Vec<PathBuf>, StorageError> {
        let listed = WalkdirScanner.list_files_matching(root, pattern)?;
        if !self.fired.swap(true, Ordering::SeqCst) {
            if let Some(writer) = self.writer.get() {
                let writer = Arc::clone(writer);
                thread::spawn(move || {
                    let mut late = Comment::new_top_level("T", "late\n");
                    writer.save(&mut late)
                })
                .join()
                .unwrap()
                .unwrap();
            }
        }
        Ok(listed)
    }
}

#[test]
fn saving_a_reply_invalidates_the_thread() {
    let temp = TempDir::new().unwrap();
    write_record(temp.path(), "T/replies/1000", "---\nid: 1000\n---\nroot\n");
    let store = open_store(&temp);

    let before = store.comments_for_thread("T");
    assert_eq!(before.len(), 1);

    let mut reply = Comment::new_reply("T", "1000", "a reply\n");
    store.save(&mut reply).unwrap();
    assert_eq!(reply.state(), CommentState::Saved);

    let after = store.comments_for_thread("T");
    assert_eq!(after.len(), 2);
    assert_eq!(after.get("1000").unwrap().graph.children, vec![reply.id.clone()]);
    assert_eq!(after.get(&reply.id).unwrap().graph.depth, 1);
    // the old snapshot is untouched
    assert_eq!(before.len(), 1);
}

#[test]
fn save_while_guard_is_held_fails() {
    let temp = TempDir::new().unwrap();
    write_record(temp.path(), "T/replies/1000", "---\nid: 1000\n---\nroot\n");
    let store = open_store(&temp);

    let lock = store.thread_lock("T").unwrap();
    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let holder = thread::spawn(move || {
        let _guard = lock.lock();
        held_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    });
    held_rx.recv().unwrap();

    let mut comment = store.find_in_thread("T", "1000").unwrap();
    comment.set("approved", true);
    let result = store.save(&mut comment);
    assert!(matches!(result, Err(ApiError::ConcurrentAccessViolation(ref t)) if t == "T"));
    assert_eq!(comment.state(), CommentState::Saved);

    release_tx.send(()).unwrap();
    holder.join().unwrap();

    store.save(&mut comment).unwrap();
    assert_eq!(comment.state(), CommentState::Updated);
}

#[test]
fn other_threads_are_not_blocked() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    let lock = store.thread_lock("A").unwrap();
    let _guard = lock.lock();

    let mut comment = Comment::new_top_level("B", "unaffected\n");
    store.save(&mut comment).unwrap();
    assert_eq!(store.comments_for_thread("B").len(), 1);
}

#[test]
fn unchanged_records_round_trip_byte_for_byte() {
    let temp = TempDir::new().unwrap();
    let content = "---\nid: \"1000\"\nauthor: 'Ada L.'\nurl: https://example.org\nspam: no\n---\n\nBody with trailing spaces   \nand no final newline";
    let path = write_record(temp.path(), "T/replies/1000", content);
    let store = open_store(&temp);

    let mut comment = store.find_in_thread("T", "1000").unwrap();
    store.save(&mut comment).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), content);
}

#[test]
fn moderation_reports_each_id() {
    let temp = TempDir::new().unwrap();
    write_record(temp.path(), "A/replies/1000", "---\nid: 1000\n---\n");
    write_record(temp.path(), "B/replies/2000", "---\nid: 2000\napproved: no\n---\n");
    let store = open_store(&temp);

    let ids = vec!["1000".to_string(), "2000".to_string(), "9999".to_string()];
    let report = store.set_approved_status(&ids, true);
    let outcomes: Vec<(&str, bool)> = report.iter().map(|c| (c.id.as_str(), c.success)).collect();
    assert_eq!(outcomes, vec![("1000", true), ("2000", true), ("9999", false)]);

    assert!(store.find_by_id("1000").unwrap().is_approved());
    assert!(store.find_by_id("2000").unwrap().is_approved());
}

#[test]
fn legacy_thread_migrates_to_two_blocks() {
    let temp = TempDir::new().unwrap();
    let path = write_record(
        temp.path(),
        "T/replies/1000",
        "id: 1000\nauthor: Bo\ncomment: >\n  folded legacy\n  text\n",
    );
    let store = open_store(&temp);

    assert_eq!(store.migrate_thread("T").unwrap(), 1);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "---\nid: 1000\nauthor: Bo\n---\nfolded legacy text"
    );
    let comment = store.find_in_thread("T", "1000").unwrap();
    assert!(!comment.needs_migration());
    assert_eq!(comment.body, "folded legacy text");
}

#[test]
fn unusable_root_reads_empty_and_rejects_writes() {
    let temp = TempDir::new().unwrap();
    let store = CommentStore::new(StoreConfig::with_root(temp.path().join("missing"))).unwrap();
    assert!(!store.is_usable());
    assert!(store.comments_for_thread("T").is_empty());

    let mut comment = Comment::new_top_level("T", "x");
    assert!(matches!(
        store.save(&mut comment),
        Err(ApiError::DirectoryUnusable(_))
    ));
    assert!(matches!(
        store.migrate_thread("T"),
        Err(ApiError::DirectoryUnusable(_))
    ));
}

#[test]
fn save_during_rebuild_is_not_lost() {
    let temp = TempDir::new().unwrap();
    write_record(temp.path(), "T/replies/1000", "---\nid: 1000\n---\nroot\n");

    let writer_slot = Arc::new(OnceLock::new());
    let scanner = Arc::new(SaveDuringFirstScan {
        writer: Arc::clone(&writer_slot),
        fired: AtomicBool::new(false),
    });
    let paths = Arc::new(PathIndex::new(temp.path(), "comment.md", scanner));
    let objects = Arc::new(ObjectCache::new());
    let locks = Arc::new(ThreadLockManager::new());
    let open = || {
        CommentStore::new(StoreConfig::with_root(temp.path()))
            .unwrap()
            .with_path_index(Arc::clone(&paths))
            .with_object_cache(Arc::clone(&objects))
            .with_lock_manager(Arc::clone(&locks))
    };
    let reader = open();
    let _ = writer_slot.set(Arc::new(open()));

    assert_eq!(reader.comments_for_thread("T").len(), 1);
    assert_eq!(reader.comments_for_thread("T").len(), 2);
}

#[test]
fn header_values_yaml_rejects_survive_updates() {
    let temp = TempDir::new().unwrap();
    let path = write_record(
        temp.path(),
        "T/replies/1000",
        "---\nid: 1000\nauthor: @ada\ntitle: Re: hello\n---\nbody\n",
    );
    let store = open_store(&temp);

    let mut comment = store.find_in_thread("T", "1000").unwrap();
    comment.set("approved", true);
    store.save(&mut comment).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "---\nid: 1000\nauthor: @ada\ntitle: Re: hello\napproved: true\n---\nbody\n"
    );
    assert!(store.find_in_thread("T", "1000").unwrap().is_approved());
}
