//! `build.properties` parsing and line-preserving edits.
//!
//! The file is a flat list of `key=value` assignments. Reading follows the
//! usual INI rules; editing works on raw lines so that comments, ordering and
//! line endings of everything but the edited line survive untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Property naming the kind of component a folder holds.
pub const COMPONENT_TYPE: &str = "component.type";

/// Property recording the folder's schema version.
pub const COMPONENT_VERSION: &str = "component.version";

/// Errors that can occur when editing build properties.
#[derive(Error, Debug)]
pub enum PropertiesError {
    #[error("invalid property name '{0}': {1}")]
    InvalidName(String, &'static str),

    #[error("invalid value for property '{0}': {1}")]
    InvalidValue(String, &'static str),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A value that can be written into `build.properties`.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Parse properties text into a map.
///
/// Blank lines, `#`/`;` comments and `[section]` headers are skipped. Each
/// remaining line is split at its first `=`; key and value are trimmed and
/// a double-quoted value is unquoted. Later assignments win.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with('[')
        {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        properties.insert(key.to_string(), value.to_string());
    }

    properties
}

/// Check whether some line of `text` starts with `name=`.
///
/// This is a literal, line-anchored prefix test rather than a parse: a
/// line written as `name = value` is not seen, even though
/// [`parse_properties`] would read it.
pub fn has_property(name: &str, text: &str) -> bool {
    let prefix = format!("{name}=");
    text.lines().any(|line| line.starts_with(&prefix))
}

pub(crate) fn validate_name(name: &str) -> Result<(), PropertiesError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains('=') {
        "name contains '='"
    } else if name.contains(['\n', '\r']) {
        "name contains a line break"
    } else if name.trim() != name {
        "name has surrounding whitespace"
    } else {
        return Ok(());
    };
    Err(PropertiesError::InvalidName(name.to_string(), reason))
}

pub(crate) fn render_value(name: &str, value: &PropertyValue) -> Result<String, PropertiesError> {
    let rendered = value.to_string();
    if rendered.contains(['\n', '\r']) {
        return Err(PropertiesError::InvalidValue(
            name.to_string(),
            "value contains a line break",
        ));
    }
    Ok(rendered)
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn newline_style(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Rewrite every line starting with `name=` to `name=value`.
pub(crate) fn replace_property(text: &str, name: &str, value: &str) -> String {
    let prefix = format!("{name}=");
    let mut out = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        let (body, ending) = split_line_ending(line);
        if body.starts_with(&prefix) {
            out.push_str(&prefix);
            out.push_str(value);
            out.push_str(ending);
        } else {
            out.push_str(line);
        }
    }

    out
}

/// Add `name=value` as the last line of `text`.
pub(crate) fn append_property(text: &str, name: &str, value: &str) -> String {
    let newline = newline_style(text);
    let mut out = text.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(newline);
    }
    out.push_str(name);
    out.push('=');
    out.push_str(value);
    out.push_str(newline);
    out
}

/// Insert `name=value` on the line after the first `after=` line.
///
/// Returns `None` when no line assigns `after`.
pub(crate) fn insert_property_after(
    text: &str,
    after: &str,
    name: &str,
    value: &str,
) -> Option<String> {
    let after_prefix = format!("{after}=");
    let newline = newline_style(text);
    let mut out = String::with_capacity(text.len() + name.len() + value.len() + 2);
    let mut inserted = false;

    for line in text.split_inclusive('\n') {
        out.push_str(line);
        if inserted {
            continue;
        }

        let (body, ending) = split_line_ending(line);
        if body.starts_with(&after_prefix) {
            if ending.is_empty() {
                // Anchor was the unterminated last line.
                out.push_str(newline);
            }
            out.push_str(name);
            out.push('=');
            out.push_str(value);
            out.push_str(ending);
            inserted = true;
        }
    }

    inserted.then_some(out)
}
