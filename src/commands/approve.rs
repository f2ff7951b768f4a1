//! `approve` - record an assigned approver's sign-off.
//!
//! The last approval executes the transition: major version bump, archival
//! of the outgoing draft, and then one of three endings - the effective
//! write (non-executable), staying in draft (executable), or retirement when
//! the routing flagged it.

use crate::audit::{AuditEvent, AuditLog};
use crate::context::{CommandContext, DocState};
use crate::docio;
use crate::error::QmsError;
use crate::meta::{self, DocMeta};
use crate::project::ensure_dir;
use crate::tasks;
use crate::version::parse_or_initial;
use crate::workflow::{find_transition, Action, Status, VersionBump};
use anyhow::Result;
use std::fs;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str) -> Result<()> {
    ctx.require_permission("approve")?;

    let doc = ctx.load_doc(doc_id)?;
    doc.require_draft_exists()?;
    let mut doc_meta = doc.meta_cloned()?;

    let transition = find_transition(
        doc_meta.status,
        Action::Approve,
        doc_meta.executable,
        doc_meta.phase(),
    )?;
    if transition.requires_assignment {
        doc.require_assignment(&ctx.user)?;
    }

    let remaining = doc_meta
        .pending_assignees
        .iter()
        .filter(|user| user.as_str() != ctx.user)
        .count();
    if remaining > 0 {
        let version = doc_meta.version.clone();
        doc_meta.review_complete(&ctx.user, None);
        meta::write(ctx.project, &doc_meta)?;
        let log = AuditLog::open(ctx.project, doc_id, &doc.doc_type)?;
        log.append(&AuditEvent::approve(&ctx.user, &version))?;
        tasks::delete_user_tasks(ctx.project, &ctx.user, doc_id)?;
        println!("Approval submitted for {doc_id}");
        println!(
            "Waiting for: {}",
            doc_meta.pending_assignees.join(", ")
        );
        return Ok(());
    }

    let current_version = doc_meta.version.clone();
    let new_version = match transition.version_bump {
        Some(VersionBump::Major) => parse_or_initial(&current_version).bump_major().to_string(),
        None => current_version.clone(),
    };

    // Archive the outgoing draft under its pre-approval version.
    if transition.archives_version {
        let archive_path = ctx
            .registry
            .archive_path(ctx.project, doc_id, &current_version)?;
        if let Some(parent) = archive_path.parent() {
            ensure_dir(parent)?;
        }
        fs::copy(&doc.draft_path, &archive_path)
            .map_err(|e| QmsError::storage(&archive_path, e))?;
    }

    println!(
        "All approvals complete. Status: {} -> {}",
        doc_meta.status, transition.to
    );
    println!("Version: {current_version} -> {new_version}");

    if doc_meta.retiring {
        retire(ctx, &doc, &mut doc_meta, transition.to, &current_version, &new_version)?;
    } else if transition.to == Status::Approved {
        make_effective(ctx, &doc, &mut doc_meta, &current_version, &new_version)?;
    } else {
        // Executable document: stays in draft until closed.
        let from_status = doc_meta.status;
        doc_meta.approval(transition.to, Some(new_version.clone()), transition.clears_owner);
        meta::write(ctx.project, &doc_meta)?;
        let log = AuditLog::open(ctx.project, doc_id, &doc.doc_type)?;
        log.append(&AuditEvent::approve(&ctx.user, &current_version))?;
        log.append(&AuditEvent::status_change(
            &ctx.user,
            &new_version,
            from_status,
            transition.to,
        ))?;
    }

    tasks::delete_user_tasks(ctx.project, &ctx.user, doc_id)?;
    println!("Approval submitted for {doc_id}");
    Ok(())
}

/// Non-executable ending: the draft becomes the effective file.
fn make_effective(
    ctx: &CommandContext<'_>,
    doc: &DocState,
    doc_meta: &mut DocMeta,
    current_version: &str,
    new_version: &str,
) -> Result<()> {
    let (frontmatter, body) = docio::read_document(&doc.draft_path)?;
    docio::write_document_minimal(&doc.effective_path, &frontmatter, &body)?;
    fs::remove_file(&doc.draft_path).map_err(|e| QmsError::storage(&doc.draft_path, e))?;

    let from_status = doc_meta.status;
    doc_meta.approval(Status::Effective, Some(new_version.to_string()), true);
    meta::write(ctx.project, doc_meta)?;

    let log = AuditLog::open(ctx.project, &doc.doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::approve(&ctx.user, current_version))?;
    log.append(&AuditEvent::status_change(
        &ctx.user,
        new_version,
        from_status,
        Status::Approved,
    ))?;
    log.append(&AuditEvent::effective(&ctx.user, current_version, new_version))?;
    log.append(&AuditEvent::status_change(
        &ctx.user,
        new_version,
        Status::Approved,
        Status::Effective,
    ))?;

    println!(
        "Document is now EFFECTIVE at {}",
        ctx.project.rel(&doc.effective_path)
    );
    Ok(())
}

/// Retirement ending: archive the final content, remove live files, and
/// terminate the document.
fn retire(
    ctx: &CommandContext<'_>,
    doc: &DocState,
    doc_meta: &mut DocMeta,
    approved_status: Status,
    current_version: &str,
    new_version: &str,
) -> Result<()> {
    let archive_path = ctx
        .registry
        .archive_path(ctx.project, &doc.doc_id, new_version)?;
    if let Some(parent) = archive_path.parent() {
        ensure_dir(parent)?;
    }
    let (frontmatter, body) = docio::read_document(&doc.draft_path)?;
    docio::write_document_minimal(&archive_path, &frontmatter, &body)?;
    println!("Archived: {}", ctx.project.rel(&archive_path));

    fs::remove_file(&doc.draft_path).map_err(|e| QmsError::storage(&doc.draft_path, e))?;
    if doc.effective_path.is_file() {
        fs::remove_file(&doc.effective_path)
            .map_err(|e| QmsError::storage(&doc.effective_path, e))?;
    }

    let from_status = doc_meta.status;
    doc_meta.approval(Status::Retired, Some(new_version.to_string()), true);
    doc_meta.retiring = false;
    meta::write(ctx.project, doc_meta)?;

    let log = AuditLog::open(ctx.project, &doc.doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::approve(&ctx.user, current_version))?;
    log.append(&AuditEvent::status_change(
        &ctx.user,
        new_version,
        from_status,
        approved_status,
    ))?;
    log.append(&AuditEvent::status_change(
        &ctx.user,
        new_version,
        approved_status,
        Status::Retired,
    ))?;
    log.append(&AuditEvent::retire(&ctx.user, current_version, new_version))?;

    println!("Document is now RETIRED");
    Ok(())
}
