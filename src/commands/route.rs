//! `route` - send a checked-in draft into a review or approval workflow.

use crate::audit::{self, AuditEvent, AuditLog};
use crate::context::CommandContext;
use crate::error::QmsError;
use crate::identity;
use crate::meta::{self, check_approval_gate};
use crate::prompts::{PromptStore, TaskType};
use crate::tasks::{self, TaskSpec};
use crate::version::parse_or_initial;
use crate::workflow::{find_transition, Action, WorkflowType};
use anyhow::{bail, Result};

pub struct RouteArgs {
    pub doc_id: String,
    pub review: bool,
    pub approval: bool,
    pub assign: Vec<String>,
    pub retire: bool,
}

/// Assignee used when `--assign` is omitted.
const DEFAULT_ASSIGNEE: &str = "qa";

pub fn run(ctx: &CommandContext<'_>, args: &RouteArgs) -> Result<()> {
    ctx.require_permission("route")?;

    let doc = ctx.load_doc(&args.doc_id)?;
    doc.require_draft_exists()?;
    doc.require_checked_in()?;
    doc.require_owner(&ctx.user)?;
    let title = doc.title();
    let mut doc_meta = doc.meta_cloned()?;

    let action = match (args.review, args.approval) {
        (true, false) => Action::RouteReview,
        (false, true) => Action::RouteApproval,
        _ => bail!("specify exactly one workflow: --review or --approval"),
    };

    let events = audit::read_log(ctx.project, &args.doc_id, &doc.doc_type)?;
    if action == Action::RouteApproval {
        check_approval_gate(&doc_meta, &events)?;
    }

    let transition = find_transition(doc_meta.status, action, doc_meta.executable, doc_meta.phase())?;
    let workflow = transition
        .workflow_type
        .ok_or_else(|| QmsError::InvalidTransition {
            from: doc_meta.status.as_str().to_string(),
            action: action.as_str().to_string(),
            reason: "routing transition has no workflow type".to_string(),
        })?;

    if args.retire {
        if !matches!(workflow, WorkflowType::Approval | WorkflowType::PostApproval) {
            bail!("--retire only applies to the final --approval routing");
        }
        let version = parse_or_initial(&doc_meta.version);
        if !version.has_been_effective() {
            bail!(
                "cannot retire {} - it was never effective (v{}); use cancel for unapproved drafts",
                args.doc_id,
                doc_meta.version
            );
        }
    }

    let mut assignees = if args.assign.is_empty() {
        vec![DEFAULT_ASSIGNEE.to_string()]
    } else {
        args.assign.clone()
    };
    let mut seen = std::collections::BTreeSet::new();
    assignees.retain(|user| seen.insert(user.clone()));
    for assignee in &assignees {
        if !identity::is_known_user(ctx.project, assignee) {
            return Err(QmsError::InvalidAssignee {
                user: assignee.clone(),
            }
            .into());
        }
    }

    let from_status = doc_meta.status;
    let version = doc_meta.version.clone();
    doc_meta.retiring = args.retire;
    doc_meta.route(transition.to, assignees.clone());
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, &args.doc_id, &doc.doc_type)?;
    log.append(&AuditEvent::status_change(
        &ctx.user,
        &version,
        from_status,
        transition.to,
    ))?;
    if workflow.is_review() {
        log.append(&AuditEvent::route_review(
            &ctx.user,
            &version,
            assignees.clone(),
            workflow.as_str(),
        ))?;
    } else {
        log.append(&AuditEvent::route_approval(
            &ctx.user,
            &version,
            assignees.clone(),
            workflow.as_str(),
        ))?;
    }

    let task_type = if workflow.is_review() {
        TaskType::Review
    } else {
        TaskType::Approval
    };
    let mut prompts = PromptStore::new(ctx.project);
    for assignee in &assignees {
        tasks::create_task(
            ctx.project,
            &mut prompts,
            &TaskSpec {
                doc_id: &args.doc_id,
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

    println!("Routed: {} for {}", args.doc_id, workflow.as_str());
    println!("Status: {} -> {}", from_status, transition.to);
    println!("Assigned to: {}", assignees.join(", "));
    Ok(())
}
