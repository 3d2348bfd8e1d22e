//! Format threads, comments, and status reports as text or JSON.

use crate::comment::Comment;
use crate::error::ApiError;
use crate::hierarchy::ThreadHierarchy;
use crate::store::StatusChange;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::SerializationError(e.to_string()))
}

fn flags(comment: &Comment) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if comment.is_spam() {
        flags.push("spam");
    }
    if comment.is_approved() {
        flags.push("approved");
    }
    if comment.needs_migration() {
        flags.push("legacy");
    }
    if comment.content_truncated() {
        flags.push("truncated");
    }
    flags
}

fn first_line(body: &str) -> &str {
    body.lines().find(|l| !l.trim().is_empty()).unwrap_or("")
}

/// Comments of a thread in tree order: each root followed by its replies
pub fn tree_order(hierarchy: &ThreadHierarchy) -> Vec<&Comment> {
    let mut ordered = Vec::with_capacity(hierarchy.len());
    for root in hierarchy.roots() {
        ordered.push(root);
        ordered.extend(hierarchy.descendants_of(&root.id));
    }
    ordered
}

/// Format a thread as an indented tree.
pub fn format_thread_text(hierarchy: &ThreadHierarchy) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Thread {}", hierarchy.thread_id()))
    ));
    if hierarchy.is_empty() {
        out.push_str("No comments.\n");
        return out;
    }

    for comment in tree_order(hierarchy) {
        let indent = "  ".repeat(comment.graph.depth);
        let date = comment.formatted_date.as_deref().unwrap_or("-");
        let mut line = format!("{}- [{}] {} ({})", indent, comment.id, comment.author_name(), date);
        let flags = flags(comment);
        if !flags.is_empty() {
            line.push_str(&format!(" [{}]", flags.join(", ")));
        }
        out.push_str(&line);
        out.push('\n');
        let preview = first_line(&comment.body);
        if !preview.is_empty() {
            out.push_str(&format!("{}    {}\n", indent, preview.trim()));
        }
    }
    out
}

/// Format a thread as JSON, comments in tree order.
pub fn format_thread_json(hierarchy: &ThreadHierarchy) -> Result<String, ApiError> {
    #[derive(Serialize)]
    struct ThreadOutput<'a> {
        thread: &'a str,
        count: usize,
        comments: Vec<&'a Comment>,
    }

    to_json(&ThreadOutput {
        thread: hierarchy.thread_id(),
        count: hierarchy.len(),
        comments: tree_order(hierarchy),
    })
}

/// Format one comment with its attributes and body.
pub fn format_comment_text(comment: &Comment) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Comment {}", comment.id))
    ));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Field", "Value"]);
    let path = comment
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());
    let rows = [
        ("Thread", comment.thread_id.clone()),
        ("Author", comment.author_name().to_string()),
        (
            "Date",
            comment.formatted_date.clone().unwrap_or_else(|| "-".to_string()),
        ),
        ("Depth", comment.graph.depth.to_string()),
        (
            "Parent",
            comment.graph.parent.clone().unwrap_or_else(|| "-".to_string()),
        ),
        ("Replies", comment.graph.children.len().to_string()),
        ("Flags", flags(comment).join(", ")),
        ("Path", path),
    ];
    for (field, value) in rows {
        table.add_row(vec![field.to_string(), value]);
    }
    for (key, value) in comment.storable_attributes() {
        if !matches!(key.as_str(), "id" | "author" | "spam" | "approved") {
            table.add_row(vec![key, value]);
        }
    }
    out.push_str(&format!("{}\n\n", table));
    out.push_str(&comment.body);
    if !comment.body.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Format a per-id status report.
pub fn format_status_report(report: &[StatusChange], action: &str) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Comment", "Result"]);
    for change in report {
        let result = match (&change.error, change.success) {
            (_, true) => action.to_string(),
            (Some(error), false) => format!("failed: {}", error),
            (None, false) => "failed".to_string(),
        };
        table.add_row(vec![change.id.clone(), result]);
    }
    let succeeded = report.iter().filter(|c| c.success).count();
    format!("{}\n{} of {} updated\n", table, succeeded, report.len())
}

/// Format the thread listing.
pub fn format_threads_text(rows: &[(String, usize)]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Threads")));
    if rows.is_empty() {
        out.push_str("No threads found.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Thread", "Comments"]);
    for (thread_id, count) in rows {
        table.add_row(vec![thread_id.clone(), count.to_string()]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
