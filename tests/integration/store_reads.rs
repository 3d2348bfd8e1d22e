use crate::integration::support::{open_store, write_record};
use std::sync::Arc;
use tempfile::TempDir;
use threadstore::record::fields::FieldValue;

#[test]
fn reply_hierarchy_scenario() {
    let temp = TempDir::new().unwrap();
    write_record(temp.path(), "T/replies/1000", "---\nid: 1000\n---\nroot\n");
    write_record(
        temp.path(),
        "T/replies/1000/replies/2000",
        "---\nid: 2000\n---\nreply\n",
    );
    let store = open_store(&temp);

    let hierarchy = store.comments_for_thread("T");
    let root = hierarchy.get("1000").unwrap();
    let reply = hierarchy.get("2000").unwrap();

    assert!(root.graph.is_root);
    assert!(root.graph.is_parent);
    assert_eq!(root.graph.children, vec!["2000".to_string()]);
    assert_eq!(root.graph.depth, 0);
    assert_eq!(reply.graph.depth, 1);
    assert_eq!(reply.graph.ancestors, vec!["1000".to_string()]);
    assert_eq!(reply.graph.absolute_root.as_deref(), Some("1000"));
    assert_eq!(root.graph.absolute_root.as_deref(), Some("1000"));
    assert_eq!(hierarchy.parent_of("2000").unwrap().id, "1000");
    assert_eq!(hierarchy.absolute_root_of("2000").unwrap().id, "1000");
}

#[test]
fn quoted_identifier_is_unquoted() {
    let temp = TempDir::new().unwrap();
    write_record(temp.path(), "T/replies/1000", "---\nid: \"1000\"\n---\nquoted\n");
    let store = open_store(&temp);

    let comment = store.find_in_thread("T", "1000").unwrap();
    assert_eq!(comment.id, "1000");
    assert_eq!(
        comment.get("id"),
        Some(&FieldValue::Text("1000".to_string()))
    );
}

#[test]
fn repeated_reads_are_identical() {
    let temp = TempDir::new().unwrap();
    write_record(temp.path(), "T/replies/1000", "---\nid: 1000\n---\na\n");
    write_record(temp.path(), "T/replies/1500", "---\nid: 1500\n---\nb\n");
    let store = open_store(&temp);

    let first = store.comments_for_thread("T");
    let second = store.comments_for_thread("T");
    assert!(Arc::ptr_eq(&first, &second));

    store.invalidate_all();
    let rebuilt = store.comments_for_thread("T");
    assert!(!Arc::ptr_eq(&first, &rebuilt));
    let ids = |h: &threadstore::ThreadHierarchy| {
        h.comments().map(|c| c.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&rebuilt));
}

#[test]
fn dates_come_from_identifiers() {
    let temp = TempDir::new().unwrap();
    write_record(temp.path(), "T/replies/86400", "---\nid: 86400\n---\n");
    let store = open_store(&temp);

    let comment = store.find_in_thread("T", "86400").unwrap();
    assert_eq!(comment.date.unwrap().timestamp(), 86400);
    assert_eq!(comment.formatted_date.as_deref(), Some("1970-01-02 00:00"));
}

#[test]
fn chronological_order_sorts_by_identifier() {
    let temp = TempDir::new().unwrap();
    write_record(temp.path(), "T/replies/3000", "---\nid: 3000\n---\n");
    write_record(temp.path(), "T/replies/1000", "---\nid: 1000\n---\n");
    write_record(temp.path(), "T/replies/1000/replies/2000", "---\nid: 2000\n---\n");
    let store = open_store(&temp);

    let hierarchy = store.comments_for_thread("T");
    let ids: Vec<&str> = hierarchy
        .chronological()
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(ids, vec!["1000", "2000", "3000"]);
}

#[test]
fn legacy_records_are_flagged() {
    let temp = TempDir::new().unwrap();
    write_record(
        temp.path(),
        "T/replies/1000",
        "---\nid: 1000\ncomment: inline body\n---\n",
    );
    let store = open_store(&temp);

    let hierarchy = store.comments_for_thread("T");
    let comment = hierarchy.get("1000").unwrap();
    assert!(comment.needs_migration());
    assert_eq!(comment.body, "inline body");
    assert_eq!(hierarchy.needing_migration().len(), 1);
}

#[test]
fn empty_or_missing_thread_is_empty_hierarchy() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);
    assert!(store.comments_for_thread("nothing-here").is_empty());
}

#[test]
fn header_values_yaml_rejects_are_kept() {
    let temp = TempDir::new().unwrap();
    write_record(
        temp.path(),
        "T/replies/1000",
        "---\nid: 1000\ntitle: Re: hello\n---\nfirst\n",
    );
    write_record(temp.path(), "T/replies/2000", "---\nid: 2000\nauthor: @ada\n---\nsecond\n");
    write_record(
        temp.path(),
        "T/replies/3000",
        "---\nid: 3000\ncomment: Note: legacy body\n---\n",
    );
    write_record(temp.path(), "T/replies/4000", "---\nid: 4000\n---\nplain\n");
    let store = open_store(&temp);

    let hierarchy = store.comments_for_thread("T");
    let ids: Vec<&str> = hierarchy.comments().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["1000", "2000", "3000", "4000"]);

    assert_eq!(
        hierarchy.get("1000").unwrap().get("title"),
        Some(&FieldValue::Text("Re: hello".to_string()))
    );
    assert_eq!(hierarchy.get("2000").unwrap().author_name(), "@ada");
    let legacy = hierarchy.get("3000").unwrap();
    assert!(legacy.needs_migration());
    assert_eq!(legacy.body, "Note: legacy body");
}
