//! `checkin` - publish the workspace copy back into the QMS draft.

use crate::audit::{AuditEvent, AuditLog};
use crate::context::CommandContext;
use crate::docio;
use crate::error::QmsError;
use crate::meta;
use anyhow::Result;
use std::fs;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str) -> Result<()> {
    ctx.require_permission("checkin")?;

    let workspace_path = ctx.project.workspace_path(&ctx.user, doc_id);
    if !workspace_path.is_file() {
        return Err(QmsError::NotCheckedOut {
            doc_id: doc_id.to_string(),
        }
        .into());
    }

    let doc = ctx.load_doc(doc_id)?;
    let mut doc_meta = doc.meta_cloned()?;
    match doc_meta.responsible_user.as_deref() {
        Some(owner) if owner != ctx.user => {
            return Err(QmsError::OwnershipDenied {
                owner: owner.to_string(),
            }
            .into());
        }
        _ => {}
    }

    let (frontmatter, body) = docio::read_document(&workspace_path)?;
    docio::write_document_minimal(&doc.draft_path, &frontmatter, &body)?;

    let version = doc_meta.version.clone();
    doc_meta.checkin();
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::checkin(&ctx.user, &version))?;

    fs::remove_file(&workspace_path).map_err(|e| QmsError::storage(&workspace_path, e))?;

    println!("Checked in: {doc_id} (v{version})");
    Ok(())
}
