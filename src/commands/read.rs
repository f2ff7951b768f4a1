//! `read` - print a document (effective, draft, or archived version).

use crate::context::CommandContext;
use crate::error::QmsError;
use anyhow::Result;
use std::fs;

pub fn run(
    ctx: &CommandContext<'_>,
    doc_id: &str,
    version: Option<&str>,
    draft: bool,
) -> Result<()> {
    ctx.require_permission("read")?;

    let path = if let Some(version) = version {
        ctx.registry.archive_path(ctx.project, doc_id, version)?
    } else if draft {
        ctx.registry.doc_path(ctx.project, doc_id, true)?
    } else {
        let effective = ctx.registry.doc_path(ctx.project, doc_id, false)?;
        if effective.is_file() {
            effective
        } else {
            ctx.registry.doc_path(ctx.project, doc_id, true)?
        }
    };

    if !path.is_file() {
        return Err(QmsError::DocumentNotFound {
            doc_id: doc_id.to_string(),
        }
        .into());
    }
    let content = fs::read_to_string(&path).map_err(|e| QmsError::storage(&path, e))?;
    print!("{content}");
    Ok(())
}
