//! `checkout` - take ownership of a document for editing.
//!
//! Checking out an effective document archives the effective version and
//! opens a new draft at `{major}.1`; checking out an existing draft flips
//! the ownership flags. Either way a writable copy lands in the caller's
//! workspace.

use crate::audit::{AuditEvent, AuditLog};
use crate::context::CommandContext;
use crate::docio;
use crate::error::QmsError;
use crate::meta::{self, DocMeta};
use crate::project::ensure_dir;
use crate::version::parse_or_initial;
use crate::workflow::Status;
use anyhow::{bail, Result};
use std::fs;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str) -> Result<()> {
    ctx.require_permission("checkout")?;
    let doc = ctx.load_doc(doc_id)?;

    if doc.draft_path.is_file() {
        checkout_draft(ctx, &doc)
    } else if doc.effective_path.is_file() {
        checkout_effective(ctx, &doc)
    } else {
        Err(QmsError::DocumentNotFound {
            doc_id: doc_id.to_string(),
        }
        .into())
    }
}

fn checkout_draft(ctx: &CommandContext<'_>, doc: &crate::context::DocState) -> Result<()> {
    let mut doc_meta = doc.meta.clone().unwrap_or_else(|| {
        DocMeta::legacy(&doc.doc_id, &doc.doc_type, doc.executable, "0.1", Status::Draft)
    });
    if doc_meta.checked_out {
        let owner = doc_meta
            .responsible_user
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        if owner == ctx.user {
            bail!("you already have {} checked out", doc.doc_id);
        }
        return Err(QmsError::CheckedOut { owner }.into());
    }
    if doc_meta.status.is_terminal() {
        return Err(QmsError::InvalidTransition {
            from: doc_meta.status.as_str().to_string(),
            action: "checkout".to_string(),
            reason: "terminal documents accept no further changes".to_string(),
        }
        .into());
    }

    let (frontmatter, body) = docio::read_document(&doc.draft_path)?;
    let workspace_path = ctx.project.workspace_path(&ctx.user, &doc.doc_id);
    docio::write_document_minimal(&workspace_path, &frontmatter, &body)?;

    let version = doc_meta.version.clone();
    doc_meta.checkout(&ctx.user, None);
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, &doc.doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::checkout(&ctx.user, &version, None))?;

    println!("Checked out: {}", doc.doc_id);
    println!("Workspace: {}", ctx.project.rel(&workspace_path));
    Ok(())
}

fn checkout_effective(ctx: &CommandContext<'_>, doc: &crate::context::DocState) -> Result<()> {
    let mut doc_meta = doc.meta.clone().unwrap_or_else(|| {
        DocMeta::legacy(&doc.doc_id, &doc.doc_type, doc.executable, "1.0", Status::Effective)
    });
    if doc_meta.status.is_terminal() {
        return Err(QmsError::InvalidTransition {
            from: doc_meta.status.as_str().to_string(),
            action: "checkout".to_string(),
            reason: "terminal documents accept no further changes".to_string(),
        }
        .into());
    }

    let current_version = doc_meta.version.clone();
    let new_version = parse_or_initial(&current_version).next_draft().to_string();

    // Archive the effective version before opening the new draft.
    let archive_path = ctx
        .registry
        .archive_path(ctx.project, &doc.doc_id, &current_version)?;
    if let Some(parent) = archive_path.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(&doc.effective_path, &archive_path)
        .map_err(|e| QmsError::storage(&archive_path, e))?;
    println!("Archived: v{current_version}");

    let (frontmatter, body) = docio::read_document(&doc.effective_path)?;
    docio::write_document_minimal(&doc.draft_path, &frontmatter, &body)?;
    let workspace_path = ctx.project.workspace_path(&ctx.user, &doc.doc_id);
    docio::write_document_minimal(&workspace_path, &frontmatter, &body)?;

    doc_meta.checkout(&ctx.user, Some(new_version.clone()));
    doc_meta.status = Status::Draft;
    doc_meta.effective_version = Some(current_version.clone());
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, &doc.doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::checkout(
        &ctx.user,
        &new_version,
        Some(&current_version),
    ))?;

    println!("Created draft v{new_version} from effective v{current_version}");
    println!("Checked out: {}", doc.doc_id);
    println!("Workspace: {}", ctx.project.rel(&workspace_path));
    Ok(())
}
