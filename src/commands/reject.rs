//! `reject` - reverse an in-approval document to its reviewed state.

use crate::audit::{AuditEvent, AuditLog};
use crate::context::CommandContext;
use crate::error::QmsError;
use crate::meta;
use crate::tasks;
use crate::workflow::{find_transition, Action};
use anyhow::Result;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str, comment: Option<&str>) -> Result<()> {
    ctx.require_permission("reject")?;

    let comment = comment
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| QmsError::CommentRequired {
            flag: "comment".to_string(),
        })?;

    let doc = ctx.load_doc(doc_id)?;
    doc.require_draft_exists()?;
    let mut doc_meta = doc.meta_cloned()?;

    let transition = find_transition(
        doc_meta.status,
        Action::Reject,
        doc_meta.executable,
        doc_meta.phase(),
    )?;
    if transition.requires_assignment {
        doc.require_assignment(&ctx.user)?;
    }

    let from_status = doc_meta.status;
    let version = doc_meta.version.clone();
    doc_meta.approval(transition.to, None, false);
    doc_meta.retiring = false;
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::reject(&ctx.user, &version, comment))?;
    log.append(&AuditEvent::status_change(
        &ctx.user,
        &version,
        from_status,
        transition.to,
    ))?;

    // Every open approval task for this document is withdrawn.
    tasks::delete_approval_tasks(ctx.project, doc_id)?;

    println!("Rejected: {doc_id}");
    println!("Status: {from_status} -> {}", transition.to);
    println!("Reason: {comment}");
    Ok(())
}
