//! `assign` - add reviewers/approvers to an active workflow (quality only).

use crate::audit::{AuditEvent, AuditLog};
use crate::context::CommandContext;
use crate::error::QmsError;
use crate::identity;
use crate::meta;
use crate::prompts::{PromptStore, TaskType};
use crate::tasks::{self, TaskSpec};
use crate::workflow::workflow_type_for_status;
use anyhow::{bail, Result};

pub fn run(ctx: &CommandContext<'_>, doc_id: &str, assignees: &[String]) -> Result<()> {
    ctx.require_permission("assign")?;

    for assignee in assignees {
        if !identity::is_known_user(ctx.project, assignee) {
            return Err(QmsError::InvalidAssignee {
                user: assignee.clone(),
            }
            .into());
        }
    }

    let doc = ctx.load_doc(doc_id)?;
    doc.require_draft_exists()?;
    let mut doc_meta = doc.meta_cloned()?;
    let title = doc.title();

    let Some(workflow) = workflow_type_for_status(doc_meta.status) else {
        bail!(
            "{doc_id} is not in an active workflow (status: {}); users can only be assigned during review or approval",
            doc_meta.status
        );
    };
    let task_type = if workflow.is_review() {
        TaskType::Review
    } else {
        TaskType::Approval
    };

    let mut added = Vec::new();
    for assignee in assignees {
        if doc_meta.pending_assignees.iter().any(|u| u == assignee) {
            println!("Note: {assignee} is already assigned");
        } else {
            doc_meta.pending_assignees.push(assignee.clone());
            added.push(assignee.clone());
        }
    }
    if added.is_empty() {
        println!("No new users assigned (all already in workflow)");
        return Ok(());
    }

    let version = doc_meta.version.clone();
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::assign(&ctx.user, &version, added.clone()))?;

    let mut prompts = PromptStore::new(ctx.project);
    for assignee in &added {
        tasks::create_task(
            ctx.project,
            &mut prompts,
            &TaskSpec {
                doc_id,
                doc_type: &doc.doc_type,
                title: &title,
                version: &version,
                workflow,
                task_type,
                assigned_by: &ctx.user,
                assignee,
            },
        )?;
    }

    println!(
        "Assigned to {doc_id} ({}): {}",
        workflow.as_str(),
        added.join(", ")
    );
    Ok(())
}
