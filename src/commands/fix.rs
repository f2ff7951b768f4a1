//! `fix` - administrative repair of effective/closed documents.
//!
//! Escape hatch for rare on-disk drift: a leftover `checked_out` flag in
//! frontmatter, a body version header out of line with the metadata, or a
//! TBD effective date. Status comes from metadata, never from frontmatter.

use crate::context::CommandContext;
use crate::docio;
use crate::error::QmsError;
use crate::meta::today;
use crate::workflow::Status;
use anyhow::{bail, Result};
use regex::Regex;
use serde_yaml::Value;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str) -> Result<()> {
    ctx.require_permission("fix")?;

    let doc = ctx.load_doc(doc_id)?;
    if !doc.effective_path.is_file() {
        return Err(QmsError::DocumentNotFound {
            doc_id: doc_id.to_string(),
        }
        .into());
    }
    let doc_meta = doc.meta_cloned()?;
    if !matches!(doc_meta.status, Status::Effective | Status::Closed) {
        bail!(
            "fix only applies to EFFECTIVE/CLOSED documents (current: {})",
            doc_meta.status
        );
    }

    let (mut frontmatter, mut body) = docio::read_document(&doc.effective_path)?;
    let mut changes: Vec<String> = Vec::new();

    let checked_out_key = Value::String("checked_out".to_string());
    if frontmatter
        .get(&checked_out_key)
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        frontmatter.remove(&checked_out_key);
        frontmatter.remove(Value::String("checked_out_date".to_string()));
        changes.push("cleared checked_out flag".to_string());
    }

    let version_re = Regex::new(r"\*\*Version:\*\* [^\n]+")
        .expect("version header pattern is a valid regex");
    let version_line = format!("**Version:** {}", doc_meta.version);
    if version_re.is_match(&body) && !body.contains(&version_line) {
        body = version_re.replace(&body, version_line.as_str()).into_owned();
        changes.push(format!("updated body version to {}", doc_meta.version));
    }

    if doc_meta.status == Status::Effective && body.contains("**Effective Date:** TBD") {
        let date = today();
        body = body.replacen("**Effective Date:** TBD", &format!("**Effective Date:** {date}"), 1);
        changes.push(format!("set effective date to {date}"));
    }

    if changes.is_empty() {
        println!("No fixes needed for {doc_id}");
        return Ok(());
    }

    docio::write_document(&doc.effective_path, &frontmatter, &body)?;

    println!("Fixed {doc_id}:");
    for change in &changes {
        println!("  - {change}");
    }
    Ok(())
}
