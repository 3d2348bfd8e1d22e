//! Header value codec
//!
//! The store consumes header parsing and rendering as a capability: turn a block
//! of raw header lines into a key/value mapping, and render a mapping back into
//! header lines. `YamlHeaderCodec` is the default implementation, backed by
//! `serde_yaml` and restricted to flat mappings of scalar values. Blocks that
//! YAML rejects (`title: Re: hello`, `author: @ada`) are read line by line
//! instead, the same way the record parser reads them.

use crate::record::line_mapping;
use crate::types::HEADER_DELIMITER;
use indexmap::IndexMap;
use serde_yaml::Value;
use tracing::debug;

/// Parse/render capability for record header blocks
pub trait HeaderCodec: Send + Sync {
    /// Parse raw header lines into an ordered key/value mapping.
    fn parse_block(&self, lines: &[String]) -> Result<IndexMap<String, String>, String>;

    /// Render a mapping into header lines, each terminated by `\n`.
    fn render_entries(&self, mapping: &IndexMap<String, String>) -> Vec<String>;

    /// Render a full two-block document.
    fn render_document(&self, mapping: &IndexMap<String, String>, body: &str) -> String {
        let mut out = String::new();
        out.push_str(HEADER_DELIMITER);
        out.push('\n');
        for line in self.render_entries(mapping) {
            out.push_str(&line);
        }
        out.push_str(HEADER_DELIMITER);
        out.push('\n');
        out.push_str(body);
        out
    }
}

/// Default codec over the line-oriented YAML subset used by record headers
#[derive(Debug, Clone, Default)]
pub struct YamlHeaderCodec;

impl YamlHeaderCodec {
    pub fn new() -> Self {
        Self
    }

    fn scalar_to_string(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            other => serde_yaml::to_string(other)
                .map(|s| s.trim_end().to_string())
                .unwrap_or_default(),
        }
    }

    /// True when `value` written unquoted parses back to the same string
    fn is_plain_safe(value: &str) -> bool {
        if value.is_empty() || value.contains('\n') {
            return false;
        }
        match serde_yaml::from_str::<Value>(value) {
            Ok(parsed @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
                Self::scalar_to_string(&parsed) == value
            }
            _ => false,
        }
    }

    fn render_value(value: &str) -> String {
        if Self::is_plain_safe(value) {
            return value.to_string();
        }
        match serde_yaml::to_string(&Value::String(value.to_string())) {
            Ok(rendered) => rendered.trim_end_matches('\n').to_string(),
            // JSON strings are valid YAML double-quoted scalars
            Err(_) => serde_json::Value::String(value.to_string()).to_string(),
        }
    }

    fn parse_yaml(text: &str) -> Result<IndexMap<String, String>, String> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
        let mapping = match value {
            Value::Null => return Ok(IndexMap::new()),
            Value::Mapping(mapping) => mapping,
            _ => return Err("header block is not a key/value mapping".to_string()),
        };

        let mut out = IndexMap::with_capacity(mapping.len());
        for (key, value) in mapping {
            let key = match key {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Err("header keys must be scalars".to_string()),
            };
            out.insert(key, Self::scalar_to_string(&value));
        }
        Ok(out)
    }
}

impl HeaderCodec for YamlHeaderCodec {
    fn parse_block(&self, lines: &[String]) -> Result<IndexMap<String, String>, String> {
        let text: String = lines.concat();
        if text.trim().is_empty() {
            return Ok(IndexMap::new());
        }
        match Self::parse_yaml(&text) {
            Ok(mapping) => Ok(mapping),
            Err(reason) => {
                debug!("Header block is not plain YAML, reading line by line: {}", reason);
                Ok(line_mapping(lines))
            }
        }
    }

    fn render_entries(&self, mapping: &IndexMap<String, String>) -> Vec<String> {
        mapping
            .iter()
            .map(|(key, value)| format!("{}: {}\n", key, Self::render_value(value)))
            .collect()
    }
}
