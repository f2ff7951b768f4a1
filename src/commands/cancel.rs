//! `cancel` - permanently delete a never-effective document.
//!
//! Only documents below version 1.0 can be cancelled; once-effective
//! documents go through retirement instead. Cancellation removes every
//! artifact - files, metadata, audit log, workspace copies, and inbox
//! tasks - freeing the document ID for reuse.

use crate::context::CommandContext;
use crate::error::QmsError;
use crate::project::Project;
use crate::tasks;
use crate::version::parse_or_initial;
use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str, confirm: bool) -> Result<()> {
    ctx.require_permission("cancel")?;

    let doc = ctx.load_doc(doc_id)?;
    let doc_meta = doc.meta_cloned()?;

    let version = parse_or_initial(&doc_meta.version);
    if version.has_been_effective() {
        return Err(QmsError::VersionTooHigh {
            version: doc_meta.version.clone(),
        }
        .into());
    }
    if doc_meta.checked_out {
        return Err(QmsError::CheckedOut {
            owner: doc_meta
                .responsible_user
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        }
        .into());
    }

    if !confirm {
        println!(
            "This will permanently delete {doc_id} (v{}) and free the doc ID.",
            doc_meta.version
        );
        println!("The following will be deleted:");
        println!("  - Document file(s)");
        println!("  - Metadata (QMS/.meta/{}/{doc_id}.json)", doc.doc_type);
        println!("  - Audit trail (QMS/.audit/{}/{doc_id}.jsonl)", doc.doc_type);
        println!("  - Workspace copies and inbox tasks");
        bail!("run again with --confirm to proceed");
    }

    let mut deleted: Vec<String> = Vec::new();
    remove_file(ctx.project, &mut deleted, &doc.draft_path)?;
    remove_file(ctx.project, &mut deleted, &doc.effective_path)?;
    remove_file(ctx.project, &mut deleted, &ctx.project.meta_path(doc_id, &doc.doc_type))?;
    remove_file(ctx.project, &mut deleted, &ctx.project.audit_path(doc_id, &doc.doc_type))?;
    for user in ctx.project.user_dirs() {
        remove_file(ctx.project, &mut deleted, &ctx.project.workspace_path(&user, doc_id))?;
    }

    let removed_tasks = tasks::delete_all_tasks(ctx.project, doc_id)?;

    // Folder-per-doc types leave their folder behind; drop it when empty.
    if let Some(folder) = doc.draft_path.parent() {
        if folder != ctx.project.qms_root()
            && folder
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n == doc_id)
            && fs::read_dir(folder).map(|mut d| d.next().is_none()).unwrap_or(false)
        {
            fs::remove_dir(folder).map_err(|e| QmsError::storage(folder, e))?;
            deleted.push(ctx.project.rel(folder));
        }
    }

    println!("Canceled: {doc_id}");
    println!("Deleted:");
    for path in &deleted {
        println!("  - {path}");
    }
    if removed_tasks > 0 {
        println!("  - {removed_tasks} inbox task(s)");
    }
    Ok(())
}

fn remove_file(project: &Project, deleted: &mut Vec<String>, path: &Path) -> Result<(), QmsError> {
    if path.is_file() {
        fs::remove_file(path).map_err(|e| QmsError::storage(path, e))?;
        deleted.push(project.rel(path));
    }
    Ok(())
}
