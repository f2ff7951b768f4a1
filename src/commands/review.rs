//! `review` - record an assigned reviewer's outcome and comment.
//!
//! The audit trail is the only place comments live. The completion
//! transition fires when the last pending assignee submits.

use crate::audit::{AuditEvent, AuditLog, ReviewOutcome};
use crate::context::CommandContext;
use crate::error::QmsError;
use crate::meta;
use crate::tasks;
use crate::workflow::{find_transition, Action};
use anyhow::{bail, Result};

pub struct ReviewArgs {
    pub doc_id: String,
    pub recommend: bool,
    pub request_updates: bool,
    pub comment: Option<String>,
}

pub fn run(ctx: &CommandContext<'_>, args: &ReviewArgs) -> Result<()> {
    ctx.require_permission("review")?;

    let comment = args
        .comment
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| QmsError::CommentRequired {
            flag: "comment".to_string(),
        })?;
    let outcome = match (args.recommend, args.request_updates) {
        (true, false) => ReviewOutcome::Recommend,
        (false, true) => ReviewOutcome::UpdatesRequired,
        _ => bail!("specify exactly one outcome: --recommend or --request-updates"),
    };

    let doc = ctx.load_doc(&args.doc_id)?;
    doc.require_draft_exists()?;
    let mut doc_meta = doc.meta_cloned()?;

    let transition = find_transition(
        doc_meta.status,
        Action::Review,
        doc_meta.executable,
        doc_meta.phase(),
    )?;
    if transition.requires_assignment {
        doc.require_assignment(&ctx.user)?;
    }

    let from_status = doc_meta.status;
    let version = doc_meta.version.clone();
    let remaining = doc_meta
        .pending_assignees
        .iter()
        .filter(|user| user.as_str() != ctx.user)
        .count();
    let new_status = (remaining == 0).then_some(transition.to);
    doc_meta.review_complete(&ctx.user, new_status);
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, &args.doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::review(&ctx.user, &version, outcome, comment))?;
    if let Some(new_status) = new_status {
        log.append(&AuditEvent::status_change(
            &ctx.user,
            &version,
            from_status,
            new_status,
        ))?;
        println!("All reviews complete. Status: {from_status} -> {new_status}");
    }

    tasks::delete_user_tasks(ctx.project, &ctx.user, &args.doc_id)?;

    println!("Review submitted for {}", args.doc_id);
    Ok(())
}
