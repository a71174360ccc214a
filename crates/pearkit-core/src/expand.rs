//! Regenerating `package.xml` from its template.
//!
//! The template holds `${name}` tokens. Every build property becomes a
//! token, alongside `${build.date}`, `${build.time}` and `${contents}` (the
//! `<file>` list produced by [`ContentsBuilder`]).

use crate::contents::ContentsBuilder;
use crate::properties::parse_properties;
use chrono::{DateTime, Local, TimeZone};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while expanding a manifest template.
#[derive(Error, Debug)]
pub enum ExpandError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk the source tree: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Outcome of one [`expand_package_xml`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandReport {
    /// Manifest that was rewritten.
    pub package_xml: PathBuf,

    /// Number of `<file>` entries generated.
    pub files: usize,

    /// Tokens still present after expansion, in order of appearance.
    pub unresolved: Vec<String>,
}

fn token_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([^}]*)\}").ok())
        .as_ref()
}

/// Replace every `${name}` whose name is a key of `tokens`.
///
/// A single left-to-right pass: text inserted by a replacement is not
/// scanned again. Unknown tokens are kept as written.
#[must_use]
pub fn expand_tokens(template: &str, tokens: &BTreeMap<String, String>) -> String {
    let Some(pattern) = token_pattern() else {
        return template.to_string();
    };
    pattern
        .replace_all(template, |caps: &Captures<'_>| match tokens.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Every `${...}` token in `text`, duplicates removed.
#[must_use]
pub fn find_tokens(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let Some(pattern) = token_pattern() else {
        return found;
    };
    for token in pattern.find_iter(text) {
        let token = token.as_str();
        if !found.iter().any(|t| t == token) {
            found.push(token.to_string());
        }
    }
    found
}

/// The token table for one expansion: the build properties plus
/// `build.date` (`YYYY-MM-DD`), `build.time` (`HH:MM:SS`) and `contents`.
pub fn build_tokens<Tz>(
    properties: &BTreeMap<String, String>,
    now: &DateTime<Tz>,
    contents: &str,
) -> BTreeMap<String, String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut tokens = properties.clone();
    tokens.insert("build.date".to_string(), now.format("%Y-%m-%d").to_string());
    tokens.insert("build.time".to_string(), now.format("%H:%M:%S").to_string());
    tokens.insert("contents".to_string(), contents.to_string());
    tokens
}

/// Rewrite `package_xml` in place from its own template text, the
/// properties in `build_properties` and the files under `src_dir`.
pub fn expand_package_xml(
    build_properties: &Path,
    package_xml: &Path,
    src_dir: &Path,
) -> Result<ExpandReport, ExpandError> {
    expand_package_xml_at(build_properties, package_xml, src_dir, &Local::now())
}

/// [`expand_package_xml`] with an explicit generation time.
pub fn expand_package_xml_at<Tz>(
    build_properties: &Path,
    package_xml: &Path,
    src_dir: &Path,
    now: &DateTime<Tz>,
) -> Result<ExpandReport, ExpandError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let properties_text = read(build_properties)?;
    let properties = parse_properties(&properties_text);
    debug!(
        path = %build_properties.display(),
        count = properties.len(),
        "loaded build properties"
    );

    let entries = ContentsBuilder::new(src_dir).collect()?;
    let contents: String = entries.iter().map(|entry| entry.to_xml()).collect();

    let template = read(package_xml)?;
    let tokens = build_tokens(&properties, now, &contents);
    let expanded = expand_tokens(&template, &tokens);

    fs::write(package_xml, &expanded).map_err(|source| ExpandError::Io {
        path: package_xml.to_path_buf(),
        source,
    })?;

    let unresolved = find_tokens(&expanded);
    for token in &unresolved {
        warn!(token = %token, "token left unexpanded");
    }
    info!(
        path = %package_xml.display(),
        files = entries.len(),
        "expanded package manifest"
    );

    Ok(ExpandReport {
        package_xml: package_xml.to_path_buf(),
        files: entries.len(),
        unresolved,
    })
}

fn read(path: &Path) -> Result<String, ExpandError> {
    fs::read_to_string(path).map_err(|source| ExpandError::Io {
        path: path.to_path_buf(),
        source,
    })
}
