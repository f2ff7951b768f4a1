//! Task generation: structured review/approval prompts in assignee inboxes.
//!
//! Each routing or assignment event writes one task file per assignee at
//! `.claude/users/<user>/inbox/task-<doc>-<workflow>-v<dotted>.md`. The body
//! is rendered from the prompt configuration; the frontmatter carries the
//! task metadata. Re-routing the same version overwrites the same file, so
//! task creation is idempotent from the assignee's perspective.

use crate::docio;
use crate::error::QmsError;
use crate::meta::today;
use crate::project::{ensure_dir, Project};
use crate::prompts::{PromptConfig, PromptStore, TaskType};
use crate::workflow::WorkflowType;
use std::fs;
use std::path::PathBuf;

/// Task identifier: `task-<docId>-<workflow_lower>-v<version with dots dashed>`.
pub fn task_id(doc_id: &str, workflow: WorkflowType, version: &str) -> String {
    format!(
        "task-{doc_id}-{}-v{}",
        workflow.lower(),
        version.replace('.', "-")
    )
}

/// Everything needed to render one task file.
pub struct TaskSpec<'a> {
    pub doc_id: &'a str,
    pub doc_type: &'a str,
    pub title: &'a str,
    pub version: &'a str,
    pub workflow: WorkflowType,
    pub task_type: TaskType,
    pub assigned_by: &'a str,
    pub assignee: &'a str,
}

/// Writes the task file into the assignee's inbox, returning its path.
pub fn create_task(
    project: &Project,
    prompts: &mut PromptStore,
    spec: &TaskSpec<'_>,
) -> Result<PathBuf, QmsError> {
    let inbox = project.inbox_dir(spec.assignee);
    ensure_dir(&inbox)?;
    let id = task_id(spec.doc_id, spec.workflow, spec.version);
    let path = inbox.join(format!("{id}.md"));
    let config = prompts.config(spec.task_type, spec.workflow, spec.doc_type);
    let content = render(spec, &id, &config)?;
    fs::write(&path, content).map_err(|e| QmsError::storage(&path, e))?;
    Ok(path)
}

fn render(spec: &TaskSpec<'_>, id: &str, config: &PromptConfig) -> Result<String, QmsError> {
    let frontmatter = docio::mapping_from_pairs(&[
        ("task_id", id),
        ("task_type", spec.task_type.as_str()),
        ("workflow_type", spec.workflow.as_str()),
        ("doc_id", spec.doc_id),
        ("assigned_by", spec.assigned_by),
        ("assigned_date", &today()),
        ("version", spec.version),
    ]);

    let mut body = String::new();
    let action = match spec.task_type {
        TaskType::Review => "Review",
        TaskType::Approval => "Approval",
    };
    body.push_str(&format!(
        "# {action} Task: {} v{}\n\n",
        spec.doc_id, spec.version
    ));
    if !spec.title.is_empty() {
        body.push_str(&format!("**Title:** {}\n", spec.title));
    }
    body.push_str(&format!(
        "**Workflow:** {}\n**Assigned by:** {}\n\nRead the document first:\n\n    qms --user {} read {} --draft\n\n",
        spec.workflow.as_str(),
        spec.assigned_by,
        spec.assignee,
        spec.doc_id
    ));

    match spec.task_type {
        TaskType::Review => {
            body.push_str("## MANDATORY VERIFICATION CHECKLIST\n\n");
            body.push_str("Every row must be marked PASS / FAIL, with evidence.\n\n");
            body.push_str("| # | Category | Item | Result | Evidence |\n");
            body.push_str("|---|----------|------|--------|----------|\n");
            for (index, item) in config.checklist_items.iter().enumerate() {
                body.push_str(&format!(
                    "| {} | {} | {} | PASS / FAIL | {} |\n",
                    index + 1,
                    item.category,
                    item.item,
                    item.evidence_prompt
                ));
            }
        }
        TaskType::Approval => {
            body.push_str("## PRE-APPROVAL CHECKLIST\n\n");
            body.push_str("Every row must be answered YES / NO.\n\n");
            body.push_str("| # | Category | Item | Answer |\n");
            body.push_str("|---|----------|------|--------|\n");
            for (index, item) in config.checklist_items.iter().enumerate() {
                body.push_str(&format!(
                    "| {} | {} | {} | YES / NO |\n",
                    index + 1,
                    item.category,
                    item.item
                ));
            }
        }
    }

    if !config.critical_reminders.is_empty() {
        body.push_str("\n## CRITICAL REMINDERS\n\n");
        for reminder in &config.critical_reminders {
            body.push_str(&format!("- {reminder}\n"));
        }
    }

    for section in &config.additional_sections {
        body.push_str(&format!("\n## {}\n\n{}\n", section.title, section.content));
    }

    body.push_str("\n## Respond\n\n");
    match spec.task_type {
        TaskType::Review => {
            body.push_str(&format!(
                "When every row is PASS:\n\n    qms --user {} review {} --recommend --comment \"...\"\n\n",
                spec.assignee, spec.doc_id
            ));
            body.push_str(&format!(
                "If any row is FAIL:\n\n    qms --user {} review {} --request-updates --comment \"...\"\n",
                spec.assignee, spec.doc_id
            ));
        }
        TaskType::Approval => {
            body.push_str(&format!(
                "To approve:\n\n    qms --user {} approve {}\n\n",
                spec.assignee, spec.doc_id
            ));
            body.push_str(&format!(
                "To reject:\n\n    qms --user {} reject {} --comment \"...\"\n",
                spec.assignee, spec.doc_id
            ));
        }
    }

    docio::render_document(&frontmatter, &body)
}

/// Deletes the caller's task files for a document. Returns how many were
/// removed.
pub fn delete_user_tasks(project: &Project, user: &str, doc_id: &str) -> Result<usize, QmsError> {
    delete_matching(project, &[user.to_string()], doc_id, false)
}

/// Deletes every pending approval task for a document across all inboxes.
pub fn delete_approval_tasks(project: &Project, doc_id: &str) -> Result<usize, QmsError> {
    delete_matching(project, &project.user_dirs(), doc_id, true)
}

/// Deletes every task for a document across all inboxes (cancellation).
pub fn delete_all_tasks(project: &Project, doc_id: &str) -> Result<usize, QmsError> {
    delete_matching(project, &project.user_dirs(), doc_id, false)
}

fn delete_matching(
    project: &Project,
    users: &[String],
    doc_id: &str,
    approval_only: bool,
) -> Result<usize, QmsError> {
    let prefix = format!("task-{doc_id}-");
    let mut removed = 0;
    for user in users {
        let inbox = project.inbox_dir(user);
        let Ok(entries) = fs::read_dir(&inbox) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(&prefix) || !name.ends_with(".md") {
                continue;
            }
            if approval_only && !name.contains("approval") {
                continue;
            }
            let path = entry.path();
            fs::remove_file(&path).map_err(|e| QmsError::storage(&path, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    fn spec<'a>(assignee: &'a str, workflow: WorkflowType, task_type: TaskType) -> TaskSpec<'a> {
        TaskSpec {
            doc_id: "SOP-001",
            doc_type: "SOP",
            title: "Cleaning",
            version: "0.1",
            workflow,
            task_type,
            assigned_by: "claude",
            assignee,
        }
    }

    #[test]
    fn task_id_encodes_doc_workflow_and_version() {
        assert_eq!(
            task_id("SOP-001", WorkflowType::Review, "0.1"),
            "task-SOP-001-review-v0-1"
        );
        assert_eq!(
            task_id("CR-001", WorkflowType::PreApproval, "1.0"),
            "task-CR-001-pre_approval-v1-0"
        );
    }

    #[test]
    fn review_task_renders_checklist_and_commands() {
        let dir = tempdir().unwrap();
        let project = Project::at(dir.path());
        let mut prompts = PromptStore::new(&project);
        let path = create_task(
            &project,
            &mut prompts,
            &spec("qa", WorkflowType::Review, TaskType::Review),
        )
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("task_id: task-SOP-001-review-v0-1"));
        assert!(content.contains("task_type: REVIEW"));
        assert!(content.contains("MANDATORY VERIFICATION CHECKLIST"));
        assert!(content.contains("PASS / FAIL"));
        assert!(content.contains("CRITICAL REMINDERS"));
        assert!(content.contains("qms --user qa review SOP-001 --recommend"));
        assert!(content.contains("--request-updates"));
    }

    #[test]
    fn approval_task_renders_approve_and_reject_commands() {
        let dir = tempdir().unwrap();
        let project = Project::at(dir.path());
        let mut prompts = PromptStore::new(&project);
        let path = create_task(
            &project,
            &mut prompts,
            &spec("qa", WorkflowType::Approval, TaskType::Approval),
        )
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("task_type: APPROVAL"));
        assert!(content.contains("PRE-APPROVAL CHECKLIST"));
        assert!(content.contains("YES / NO"));
        assert!(content.contains("qms --user qa approve SOP-001"));
        assert!(content.contains("qms --user qa reject SOP-001 --comment"));
    }

    #[test]
    fn rerouting_overwrites_the_same_task_file() {
        let dir = tempdir().unwrap();
        let project = Project::at(dir.path());
        let mut prompts = PromptStore::new(&project);
        let s = spec("qa", WorkflowType::Review, TaskType::Review);
        let first = create_task(&project, &mut prompts, &s).unwrap();
        let second = create_task(&project, &mut prompts, &s).unwrap();
        assert_eq!(first, second);
        let entries: Vec<_> = fs::read_dir(project.inbox_dir("qa")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn delete_user_tasks_only_touches_that_user() {
        let dir = tempdir().unwrap();
        let project = Project::at(dir.path());
        let mut prompts = PromptStore::new(&project);
        create_task(
            &project,
            &mut prompts,
            &spec("qa", WorkflowType::Review, TaskType::Review),
        )
        .unwrap();
        create_task(
            &project,
            &mut prompts,
            &spec("lead", WorkflowType::Review, TaskType::Review),
        )
        .unwrap();

        let removed = delete_user_tasks(&project, "qa", "SOP-001").unwrap();
        assert_eq!(removed, 1);
        assert!(fs::read_dir(project.inbox_dir("qa")).unwrap().next().is_none());
        assert!(fs::read_dir(project.inbox_dir("lead")).unwrap().next().is_some());
    }

    #[test]
    fn delete_approval_tasks_spares_review_tasks() {
        let dir = tempdir().unwrap();
        let project = Project::at(dir.path());
        let mut prompts = PromptStore::new(&project);
        create_task(
            &project,
            &mut prompts,
            &spec("qa", WorkflowType::Approval, TaskType::Approval),
        )
        .unwrap();
        create_task(
            &project,
            &mut prompts,
            &spec("lead", WorkflowType::Review, TaskType::Review),
        )
        .unwrap();

        let removed = delete_approval_tasks(&project, "SOP-001").unwrap();
        assert_eq!(removed, 1);
        assert!(fs::read_dir(project.inbox_dir("lead")).unwrap().next().is_some());
    }
}
