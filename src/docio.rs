//! Document I/O: markdown files with a YAML frontmatter block.
//!
//! Every QMS-stored document and workspace copy is written through the
//! minimal path, which keeps only the author-maintained fields (`title`,
//! `revision_summary`). All workflow state lives in `.meta`; authors never
//! edit status into a file.

use crate::error::QmsError;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Frontmatter fields authors own. Everything else is dropped by the
/// minimal write path.
pub const AUTHOR_FIELDS: &[&str] = &["title", "revision_summary"];

/// Splits a document into `(frontmatter, body)`. Documents without a leading
/// `---` block are read as an empty map plus the full content.
pub fn parse_frontmatter(content: &str) -> (Mapping, String) {
    let Some(rest) = content.strip_prefix("---\n") else {
        return (Mapping::new(), content.to_string());
    };
    let (yaml_text, body) = match rest.split_once("\n---\n") {
        Some((yaml_text, body)) => (yaml_text, body),
        None => match rest.strip_suffix("\n---") {
            Some(yaml_text) => (yaml_text, ""),
            None => return (Mapping::new(), content.to_string()),
        },
    };
    let frontmatter = serde_yaml::from_str::<Mapping>(yaml_text).unwrap_or_default();
    (frontmatter, body.trim_start_matches('\n').to_string())
}

/// Reads and splits a document file.
pub fn read_document(path: &Path) -> Result<(Mapping, String), QmsError> {
    let content = fs::read_to_string(path).map_err(|e| QmsError::storage(path, e))?;
    Ok(parse_frontmatter(&content))
}

/// Serializes frontmatter (insertion order preserved, Unicode-safe) followed
/// by a blank line and the body.
pub fn render_document(frontmatter: &Mapping, body: &str) -> Result<String, QmsError> {
    let yaml = serde_yaml::to_string(frontmatter).map_err(|e| QmsError::Storage {
        message: format!("frontmatter serialization: {e}"),
    })?;
    Ok(format!("---\n{yaml}---\n\n{body}"))
}

/// Writes a document with its frontmatter as given.
pub fn write_document(path: &Path, frontmatter: &Mapping, body: &str) -> Result<(), QmsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| QmsError::storage(parent, e))?;
    }
    let content = render_document(frontmatter, body)?;
    fs::write(path, content).map_err(|e| QmsError::storage(path, e))
}

/// Writes a document keeping only the author-maintained frontmatter fields.
pub fn write_document_minimal(
    path: &Path,
    frontmatter: &Mapping,
    body: &str,
) -> Result<(), QmsError> {
    let minimal = filter_author_frontmatter(frontmatter);
    write_document(path, &minimal, body)
}

/// Retains only `title` and `revision_summary`, in that order.
pub fn filter_author_frontmatter(frontmatter: &Mapping) -> Mapping {
    let mut minimal = Mapping::new();
    for field in AUTHOR_FIELDS {
        let key = Value::String(field.to_string());
        if let Some(value) = frontmatter.get(&key) {
            minimal.insert(key, value.clone());
        }
    }
    minimal
}

/// String-valued frontmatter field lookup.
pub fn get_str<'a>(frontmatter: &'a Mapping, key: &str) -> Option<&'a str> {
    frontmatter
        .get(Value::String(key.to_string()))
        .and_then(Value::as_str)
}

/// Builds a frontmatter map from string pairs, preserving order.
pub fn mapping_from_pairs(pairs: &[(&str, &str)]) -> Mapping {
    let mut map = Mapping::new();
    for (key, value) in pairs {
        map.insert(
            Value::String(key.to_string()),
            Value::String(value.to_string()),
        );
    }
    map
}
