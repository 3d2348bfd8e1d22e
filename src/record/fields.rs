//! Header field table and value coercion.
//!
//! Every header key the parser keeps is declared here once, together with the
//! type its value is coerced to. Keys outside the table still reach the
//! comment's raw attributes through the header codec, typed as text.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a header value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Bool,
    Date,
}

/// Prototype fields: the header keys retained by the record parser.
pub const FIELD_TABLE: &[(&str, FieldKind)] = &[
    ("id", FieldKind::Text),
    ("author", FieldKind::Text),
    ("email", FieldKind::Text),
    ("url", FieldKind::Text),
    ("type", FieldKind::Text),
    ("language", FieldKind::Text),
    ("spam", FieldKind::Bool),
    ("approved", FieldKind::Bool),
    ("verified", FieldKind::Bool),
    ("updated", FieldKind::Date),
];

/// Look up the declared kind of a header key
pub fn field_kind(key: &str) -> Option<FieldKind> {
    FIELD_TABLE
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
}

/// Typed header value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Date(DateTime<Utc>),
    Text(String),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String form written back into a header line
    pub fn to_header_string(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_string())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Permissive truthy-string rule used for boolean fields
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "y"
    )
}

/// Strip one layer of matching single or double quotes
pub fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' || first == b'\'') && first == last {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Parse a date header: Unix seconds, RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| format!("timestamp out of range: {}", value));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!("unrecognized date: {}", value))
}

/// Coerce an unquoted header value through the field table.
///
/// Keys outside the table are kept as text.
pub fn coerce(key: &str, value: &str) -> Result<FieldValue, String> {
    match field_kind(key) {
        Some(FieldKind::Bool) => Ok(FieldValue::Bool(is_truthy(value))),
        Some(FieldKind::Date) => parse_date(value).map(FieldValue::Date),
        Some(FieldKind::Text) | None => Ok(FieldValue::Text(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy_rule() {
        for value in ["true", "TRUE", "1", "yes", "On", " y "] {
            assert!(is_truthy(value), "{} should be truthy", value);
        }
        for value in ["false", "0", "no", "", "maybe"] {
            assert!(!is_truthy(value), "{} should not be truthy", value);
        }
    }

    #[test]
    fn test_unquote_single_layer() {
        assert_eq!(unquote("\"1000\""), "1000");
        assert_eq!(unquote("'1000'"), "1000");
        assert_eq!(unquote("\"'nested'\""), "'nested'");
        assert_eq!(unquote("\"unbalanced'"), "\"unbalanced'");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_coerce_uses_table() {
        assert_eq!(coerce("spam", "yes").unwrap(), FieldValue::Bool(true));
        assert_eq!(coerce("approved", "nope").unwrap(), FieldValue::Bool(false));
        assert_eq!(
            coerce("id", "1000").unwrap(),
            FieldValue::Text("1000".to_string())
        );
        assert_eq!(
            coerce("website", "true").unwrap(),
            FieldValue::Text("true".to_string())
        );
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(parse_date("1700000000").unwrap(), expected);
        assert_eq!(parse_date("2023-11-14T22:13:20Z").unwrap(), expected);
        assert_eq!(parse_date("2023-11-14 22:13:20").unwrap(), expected);
        assert!(parse_date("2023-11-14").is_ok());
        assert!(coerce("updated", "last tuesday").is_err());
    }

    #[test]
    fn test_date_header_string_round_trips() {
        let value = coerce("updated", "2023-11-14T22:13:20Z").unwrap();
        assert_eq!(value.to_header_string(), "2023-11-14T22:13:20Z");
    }
}
