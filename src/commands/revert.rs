//! `revert` - return a post-reviewed executable document to execution.

use crate::audit::{AuditEvent, AuditLog};
use crate::context::CommandContext;
use crate::error::QmsError;
use crate::meta;
use crate::workflow::{find_transition, Action};
use anyhow::Result;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str, reason: Option<&str>) -> Result<()> {
    ctx.require_permission("revert")?;

    let reason = reason
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| QmsError::CommentRequired {
            flag: "reason".to_string(),
        })?;

    let doc = ctx.load_doc(doc_id)?;
    doc.require_draft_exists()?;
    doc.require_owner(&ctx.user)?;
    let mut doc_meta = doc.meta_cloned()?;

    let transition = find_transition(
        doc_meta.status,
        Action::Revert,
        doc_meta.executable,
        doc_meta.phase(),
    )?;

    let from_status = doc_meta.status;
    let version = doc_meta.version.clone();
    doc_meta.status = transition.to;
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::revert(&ctx.user, &version, reason))?;
    log.append(&AuditEvent::status_change(
        &ctx.user,
        &version,
        from_status,
        transition.to,
    ))?;

    println!("Reverted: {doc_id}");
    println!("Status: {from_status} -> {}", transition.to);
    println!("Reason: {reason}");
    Ok(())
}
