//! Comment Record Parser
//!
//! Streams a single comment file and splits it into a header block and a body.
//! The header block sits between two lines that are exactly `---`; inside it,
//! each line is a `key: value` pair. Everything after the closing delimiter is
//! body text, capped at a configured number of characters.
//!
//! Raw header lines are kept verbatim so that an untouched record renders back
//! byte for byte.

pub mod fields;

use crate::error::StorageError;
use crate::types::{HEADER_DELIMITER, ID_KEY, INLINE_BODY_KEY};
use fields::{coerce, field_kind, unquote, FieldValue};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Parsed form of one record file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentRecord {
    pub path: PathBuf,
    /// Prototype fields, typed through the field table
    pub headers: IndexMap<String, FieldValue>,
    /// Header lines exactly as read, line terminators included
    pub raw_header_lines: Vec<String>,
    pub body: String,
    /// Legacy body found under the `comment` header key
    pub inline_comment: Option<String>,
    pub needs_migration: bool,
    pub content_truncated: bool,
    delimiter_lines: Vec<String>,
}

impl CommentRecord {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Default::default()
        }
    }

    /// Identifier header, if present and non-empty
    pub fn id(&self) -> Option<&str> {
        self.headers
            .get(ID_KEY)
            .and_then(FieldValue::as_str)
            .filter(|id| !id.trim().is_empty())
    }

    /// Identifier header, or `RecordMissingIdentifier`
    pub fn require_id(&self) -> Result<&str, StorageError> {
        self.id()
            .ok_or_else(|| StorageError::RecordMissingIdentifier(self.path.clone()))
    }

    /// Body text regardless of format: inline body for legacy records.
    pub fn text(&self) -> &str {
        match &self.inline_comment {
            Some(inline) => inline,
            None => &self.body,
        }
    }

    fn delimiter(&self, index: usize) -> &str {
        match self.delimiter_lines.get(index) {
            Some(line) if line.ends_with('\n') => line,
            _ => "---\n",
        }
    }

    /// Render the record in two-block form.
    ///
    /// A record read from a two-block file renders to the exact bytes it was
    /// read from. Legacy records drop their `comment` header and move the
    /// inline text into the body.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(self.delimiter(0));
        if self.needs_migration {
            for group in header_groups(&self.raw_header_lines) {
                if group.key.as_deref() == Some(INLINE_BODY_KEY) {
                    continue;
                }
                for line in &group.lines {
                    push_line(&mut out, line);
                }
            }
        } else {
            for line in &self.raw_header_lines {
                out.push_str(line);
            }
        }
        match self.delimiter_lines.get(1) {
            Some(line) if !self.needs_migration => out.push_str(line),
            _ => out.push_str(self.delimiter(1)),
        }
        out.push_str(self.text());
        out
    }

    /// Render in two-block form with replacement header lines and body,
    /// reusing this record's delimiter lines.
    pub(crate) fn render_with(&self, header_lines: &[String], body: &str) -> String {
        let mut out = String::new();
        out.push_str(self.delimiter(0));
        for line in header_lines {
            push_line(&mut out, line);
        }
        out.push_str(self.delimiter(1));
        out.push_str(body);
        out
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    if !line.ends_with('\n') {
        out.push('\n');
    }
}

/// A top-level header key together with its continuation lines
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HeaderGroup {
    pub key: Option<String>,
    pub lines: Vec<String>,
}

/// Group raw header lines by the top-level key they belong to.
///
/// Indented or blank lines attach to the preceding key; lines before any key
/// form a group without one.
pub(crate) fn header_groups(lines: &[String]) -> Vec<HeaderGroup> {
    let mut groups: Vec<HeaderGroup> = Vec::new();
    for line in lines {
        let content = strip_terminator(line);
        let key = if is_continuation(content) {
            None
        } else {
            split_header(content).map(|(key, _)| key.to_string())
        };
        match (key, groups.last_mut()) {
            (None, Some(last)) => last.lines.push(line.clone()),
            (key, _) => groups.push(HeaderGroup {
                key,
                lines: vec![line.clone()],
            }),
        }
    }
    groups
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn is_delimiter(line: &str) -> bool {
    strip_terminator(line) == HEADER_DELIMITER
}

fn is_continuation(content: &str) -> bool {
    content.is_empty() || content.starts_with(' ') || content.starts_with('\t')
}

/// Split a header line on the first `": "`; `key:` yields an empty value.
pub(crate) fn split_header(content: &str) -> Option<(&str, &str)> {
    let (key, value) = match content.split_once(": ") {
        Some(pair) => pair,
        None => (content.strip_suffix(':')?, ""),
    };
    let key = key.trim();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    Some((key, value))
}

/// Line-oriented mapping of raw header lines.
///
/// Each top-level `key: value` line becomes one entry, values unquoted, with
/// indented continuation lines folded into the value the same way a legacy
/// inline body is. The first occurrence of a key wins.
pub(crate) fn line_mapping(lines: &[String]) -> IndexMap<String, String> {
    let mut mapping = IndexMap::new();
    for group in header_groups(lines) {
        let Some(key) = group.key else {
            continue;
        };
        let Some((first, rest)) = group.lines.split_first() else {
            continue;
        };
        let value = split_header(strip_terminator(first)).map_or("", |(_, v)| v);
        let mut folded = InlineBody::start(value);
        for line in rest {
            folded.push_continuation(strip_terminator(line), usize::MAX);
        }
        mapping.entry(key).or_insert_with(|| folded.finish());
    }
    mapping
}

/// Lower bound on the header size a capped parser accepts
const MIN_HEADER_LIMIT: usize = 64 * 1024;

/// Scalar style of a legacy inline body
#[derive(Debug, Clone, Copy, PartialEq)]
enum InlineStyle {
    Plain,
    Literal { keep_final_newline: bool },
    Folded,
}

/// Accumulates a legacy `comment:` value and its continuation lines
#[derive(Debug)]
struct InlineBody {
    style: InlineStyle,
    lines: Vec<String>,
    indent: Option<usize>,
    open: bool,
    chars: usize,
    overflowed: bool,
}

impl InlineBody {
    fn start(value: &str) -> Self {
        let trimmed = value.trim();
        let (style, first) = match trimmed {
            "|" => (InlineStyle::Literal { keep_final_newline: true }, None),
            "|-" => (InlineStyle::Literal { keep_final_newline: false }, None),
            ">" | ">-" => (InlineStyle::Folded, None),
            "" => (InlineStyle::Plain, None),
            _ => (InlineStyle::Plain, Some(unquote(trimmed).to_string())),
        };
        let chars = first.as_ref().map_or(0, |f| f.chars().count());
        Self {
            style,
            lines: first.into_iter().collect(),
            indent: None,
            open: true,
            chars,
            overflowed: false,
        }
    }

    /// Append a continuation line; refused once the text is past `limit`.
    fn push_continuation(&mut self, content: &str, limit: usize) -> bool {
        if self.chars > limit {
            self.overflowed = true;
            return false;
        }
        let line = if content.trim().is_empty() {
            String::new()
        } else {
            let leading = content.len() - content.trim_start().len();
            let indent = *self.indent.get_or_insert(leading);
            content[leading.min(indent)..].to_string()
        };
        self.chars += line.chars().count() + 1;
        self.lines.push(line);
        true
    }

    fn finish(mut self) -> String {
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        match self.style {
            InlineStyle::Literal { keep_final_newline } => {
                let mut text = self.lines.join("\n");
                if keep_final_newline && !text.is_empty() {
                    text.push('\n');
                }
                text
            }
            InlineStyle::Folded | InlineStyle::Plain => self
                .lines
                .iter()
                .map(|l| l.trim())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Truncate to at most `max` characters; returns true when text was cut.
fn cap_chars(text: &mut String, max: usize) -> bool {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => {
            text.truncate(byte_index);
            true
        }
        None => false,
    }
}

/// Streaming record parser with a body length cap
#[derive(Debug, Clone)]
pub struct RecordParser {
    max_body_length: usize,
}

impl RecordParser {
    pub fn new(max_body_length: usize) -> Self {
        Self { max_body_length }
    }

    pub fn max_body_length(&self) -> usize {
        self.max_body_length
    }

    fn header_limit(&self) -> usize {
        self.max_body_length.max(MIN_HEADER_LIMIT)
    }

    /// Parse the record file at `path`.
    pub fn parse(&self, path: &Path) -> Result<CommentRecord, StorageError> {
        let file = File::open(path).map_err(|source| StorageError::RecordUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_reader(path, BufReader::new(file))
    }

    /// Parse a record from any buffered reader; `path` labels the record.
    pub fn parse_reader<R: BufRead>(
        &self,
        path: &Path,
        mut reader: R,
    ) -> Result<CommentRecord, StorageError> {
        let mut record = CommentRecord::new(path);
        let mut inline: Option<InlineBody> = None;
        let mut delimiters = 0usize;
        let mut body_chars = 0usize;
        let mut header_chars = 0usize;
        let mut line = String::new();

        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .map_err(|source| StorageError::RecordUnreadable {
                    path: path.to_path_buf(),
                    source,
                })?;
            if read == 0 {
                break;
            }

            if delimiters < 2 && is_delimiter(&line) {
                delimiters += 1;
                record.delimiter_lines.push(line.clone());
                if delimiters == 2 && inline.is_some() {
                    // legacy records carry no second body
                    break;
                }
                continue;
            }

            if delimiters < 2 {
                let keep =
                    self.read_header_line(path, strip_terminator(&line), &mut record, &mut inline)?;
                if keep {
                    header_chars += line.chars().count();
                    if header_chars > self.header_limit() {
                        // header never closed, or runs far past the cap
                        record.content_truncated = true;
                        break;
                    }
                    record.raw_header_lines.push(line.clone());
                }
                continue;
            }

            let len = line.chars().count();
            if body_chars + len > self.max_body_length {
                let keep = self.max_body_length - body_chars;
                record.body.extend(line.chars().take(keep));
                record.content_truncated = true;
                break;
            }
            record.body.push_str(&line);
            body_chars += len;
        }

        if let Some(inline) = inline {
            let overflowed = inline.overflowed;
            let mut text = inline.finish();
            if cap_chars(&mut text, self.max_body_length) || overflowed {
                record.content_truncated = true;
            }
            record.inline_comment = Some(text);
            record.needs_migration = true;
        }

        Ok(record)
    }

    /// Interpret one header line; returns whether its raw text is kept.
    ///
    /// Continuation lines of an inline body already past the cap are dropped.
    fn read_header_line(
        &self,
        path: &Path,
        content: &str,
        record: &mut CommentRecord,
        inline: &mut Option<InlineBody>,
    ) -> Result<bool, StorageError> {
        if let Some(active) = inline.as_mut().filter(|i| i.open) {
            if is_continuation(content) {
                return Ok(active.push_continuation(content, self.max_body_length));
            }
            active.open = false;
        }

        let Some((key, value)) = split_header(content) else {
            return Ok(true);
        };

        if key == INLINE_BODY_KEY {
            if inline.is_none() {
                *inline = Some(InlineBody::start(value));
            }
            return Ok(true);
        }

        if field_kind(key).is_some() {
            let value = unquote(value.trim());
            let typed = coerce(key, value).map_err(|message| StorageError::mapping(path, message))?;
            record.headers.insert(key.to_string(), typed);
        }
        Ok(true)
    }
}
