//! Document scaffolding from template documents.
//!
//! `create` instantiates a new draft from the effective `TEMPLATE-<TYPE>`
//! document when one exists, falling back to the embedded default scaffold.
//! The template-notice comment block is stripped and placeholders are
//! substituted on instantiation.

use crate::docio;
use crate::error::QmsError;
use crate::project::Project;
use crate::registry::Registry;
use regex::Regex;
use serde_yaml::Mapping;

const DEFAULT_SCAFFOLD: &str = include_str!("../templates/default.md");

/// Loads the scaffold for a new document and renders it with the given
/// identity. Returns the frontmatter and body ready for the minimal write.
pub fn load_for_type(
    project: &Project,
    registry: &Registry,
    doc_type: &str,
    doc_id: &str,
    title: &str,
) -> Result<(Mapping, String), QmsError> {
    let template_id = format!("TEMPLATE-{doc_type}");
    let body = match registry.doc_path(project, &template_id, false) {
        Ok(path) if path.is_file() => {
            let (_, body) = docio::read_document(&path)?;
            body
        }
        _ => DEFAULT_SCAFFOLD.to_string(),
    };
    let body = render_body(&body, doc_type, doc_id, title);
    let frontmatter = docio::mapping_from_pairs(&[("title", title)]);
    Ok((frontmatter, body))
}

/// Strips the template notice and substitutes `{{TITLE}}`, `{{DOC_ID}}`, and
/// the `TYPE-XXX` ID placeholder.
pub fn render_body(body: &str, doc_type: &str, doc_id: &str, title: &str) -> String {
    strip_template_notice(body)
        .replace("{{TITLE}}", title)
        .replace("{{DOC_ID}}", doc_id)
        .replace(&format!("{doc_type}-XXX"), doc_id)
}

fn strip_template_notice(body: &str) -> String {
    // The notice is a single HTML comment block identified by its first line.
    let re = Regex::new(r"(?s)<!--\s*TEMPLATE NOTICE.*?-->\n*")
        .expect("template notice pattern is a valid regex");
    re.replace(body, "").into_owned()
}
