//! `release` - move a pre-approved executable document into execution.
//!
//! Release is the one-way flip from pre-release to post-release: from here
//! on, review and approval route through the post-release workflow.

use crate::audit::{AuditEvent, AuditLog};
use crate::context::CommandContext;
use crate::meta;
use crate::workflow::{find_transition, Action, ExecutionPhase};
use anyhow::Result;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str) -> Result<()> {
    ctx.require_permission("release")?;

    let doc = ctx.load_doc(doc_id)?;
    doc.require_draft_exists()?;
    doc.require_owner(&ctx.user)?;
    let mut doc_meta = doc.meta_cloned()?;

    let transition = find_transition(
        doc_meta.status,
        Action::Release,
        doc_meta.executable,
        doc_meta.phase(),
    )?;

    let from_status = doc_meta.status;
    let version = doc_meta.version.clone();
    doc_meta.status = transition.to;
    doc_meta.execution_phase = Some(ExecutionPhase::PostRelease);
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::release(&ctx.user, &version))?;
    log.append(&AuditEvent::status_change(
        &ctx.user,
        &version,
        from_status,
        transition.to,
    ))?;

    println!("Released: {doc_id}");
    println!("Status: {from_status} -> {}", transition.to);
    Ok(())
}
