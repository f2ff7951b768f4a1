//! `close` - finish an executable document's lifecycle.
//!
//! The draft becomes the effective record of what was executed; ownership
//! is cleared and the document is terminal.

use crate::audit::{AuditEvent, AuditLog};
use crate::context::CommandContext;
use crate::docio;
use crate::error::QmsError;
use crate::meta;
use crate::workflow::{find_transition, Action};
use anyhow::Result;
use std::fs;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str) -> Result<()> {
    ctx.require_permission("close")?;

    let doc = ctx.load_doc(doc_id)?;
    doc.require_draft_exists()?;
    doc.require_owner(&ctx.user)?;
    let mut doc_meta = doc.meta_cloned()?;

    let transition = find_transition(
        doc_meta.status,
        Action::Close,
        doc_meta.executable,
        doc_meta.phase(),
    )?;

    let (frontmatter, body) = docio::read_document(&doc.draft_path)?;
    docio::write_document_minimal(&doc.effective_path, &frontmatter, &body)?;
    fs::remove_file(&doc.draft_path).map_err(|e| QmsError::storage(&doc.draft_path, e))?;

    let from_status = doc_meta.status;
    let version = doc_meta.version.clone();
    doc_meta.approval(transition.to, None, transition.clears_owner);
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::close(&ctx.user, &version))?;
    log.append(&AuditEvent::status_change(
        &ctx.user,
        &version,
        from_status,
        transition.to,
    ))?;

    let workspace_path = ctx.project.workspace_path(&ctx.user, doc_id);
    if workspace_path.is_file() {
        fs::remove_file(&workspace_path).map_err(|e| QmsError::storage(&workspace_path, e))?;
    }

    println!("Closed: {doc_id}");
    println!("Location: {}", ctx.project.rel(&doc.effective_path));
    Ok(())
}
