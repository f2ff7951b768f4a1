//! End-to-end lifecycle scenarios driven through the command layer against
//! isolated project roots.

use crate::audit::{self, AuditEvent, EventKind, ReviewOutcome};
use crate::commands;
use crate::commands::create::CreateArgs;
use crate::commands::review::ReviewArgs;
use crate::commands::route::RouteArgs;
use crate::context::CommandContext;
use crate::docio;
use crate::error::QmsError;
use crate::identity::{self, Group};
use crate::meta::DocMeta;
use crate::project::Project;
use crate::registry::Registry;
use crate::workflow::{is_review_status, ExecutionPhase, Status};
use crate::{meta, tasks};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct TestEnv {
    _dir: TempDir,
    project: Project,
    registry: Registry,
}

impl TestEnv {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        commands::init::run(dir.path()).unwrap();
        let project = Project::at(dir.path());
        let registry = Registry::load(&project).unwrap();
        TestEnv {
            _dir: dir,
            project,
            registry,
        }
    }

    fn ctx(&self, user: &str) -> CommandContext<'_> {
        CommandContext::authenticate(&self.project, &self.registry, Some(user)).unwrap()
    }

    fn meta(&self, doc_id: &str) -> DocMeta {
        let config = self.registry.infer_doc_type(doc_id).unwrap();
        meta::read(&self.project, doc_id, &config.name)
            .unwrap()
            .unwrap()
    }

    fn events(&self, doc_id: &str) -> Vec<AuditEvent> {
        let config = self.registry.infer_doc_type(doc_id).unwrap();
        audit::read_log(&self.project, doc_id, &config.name).unwrap()
    }

    fn draft_path(&self, doc_id: &str) -> PathBuf {
        self.registry.doc_path(&self.project, doc_id, true).unwrap()
    }

    fn effective_path(&self, doc_id: &str) -> PathBuf {
        self.registry.doc_path(&self.project, doc_id, false).unwrap()
    }

    fn archive_path(&self, doc_id: &str, version: &str) -> PathBuf {
        self.registry
            .archive_path(&self.project, doc_id, version)
            .unwrap()
    }

    // Command shorthands.

    fn create(&self, user: &str, doc_type: &str, title: &str) {
        commands::create::run(
            &self.ctx(user),
            &CreateArgs {
                doc_type: doc_type.to_string(),
                title: Some(title.to_string()),
                parent: None,
                name: None,
            },
        )
        .unwrap();
    }

    fn checkout(&self, user: &str, doc_id: &str) {
        commands::checkout::run(&self.ctx(user), doc_id).unwrap();
    }

    fn checkin(&self, user: &str, doc_id: &str) {
        commands::checkin::run(&self.ctx(user), doc_id).unwrap();
    }

    fn route_review(&self, user: &str, doc_id: &str, assign: &[&str]) {
        commands::route::run(
            &self.ctx(user),
            &RouteArgs {
                doc_id: doc_id.to_string(),
                review: true,
                approval: false,
                assign: assign.iter().map(|s| s.to_string()).collect(),
                retire: false,
            },
        )
        .unwrap();
    }

    fn route_approval(&self, user: &str, doc_id: &str, retire: bool) -> anyhow::Result<()> {
        commands::route::run(
            &self.ctx(user),
            &RouteArgs {
                doc_id: doc_id.to_string(),
                review: false,
                approval: true,
                assign: Vec::new(),
                retire,
            },
        )
    }

    fn review(&self, user: &str, doc_id: &str, recommend: bool, comment: &str) {
        commands::review::run(
            &self.ctx(user),
            &ReviewArgs {
                doc_id: doc_id.to_string(),
                recommend,
                request_updates: !recommend,
                comment: Some(comment.to_string()),
            },
        )
        .unwrap();
    }

    fn approve(&self, user: &str, doc_id: &str) {
        commands::approve::run(&self.ctx(user), doc_id).unwrap();
    }

    /// Drives a fresh SOP to EFFECTIVE v1.0.
    fn effective_sop(&self) -> String {
        self.create("claude", "SOP", "Cleaning");
        self.checkin("claude", "SOP-001");
        self.route_review("claude", "SOP-001", &[]);
        self.review("qa", "SOP-001", true, "ok");
        self.route_approval("claude", "SOP-001", false).unwrap();
        self.approve("qa", "SOP-001");
        "SOP-001".to_string()
    }

    /// Asserts the data-model invariants hold for a document's metadata.
    fn assert_invariants(&self, doc_id: &str) {
        let m = self.meta(doc_id);
        assert!(
            Status::valid_for(m.executable).contains(&m.status),
            "{doc_id}: status {} invalid for executable={}",
            m.status,
            m.executable
        );
        if m.checked_out {
            assert!(m.responsible_user.is_some(), "{doc_id}: checked out without owner");
            assert!(m.checked_out_date.is_some(), "{doc_id}: checked out without date");
        }
        if !m.executable {
            assert!(m.execution_phase.is_none(), "{doc_id}: phase on non-executable");
        }
        let live = !matches!(m.status, Status::Effective | Status::Retired | Status::Closed);
        assert_eq!(
            self.draft_path(doc_id).is_file(),
            live,
            "{doc_id}: draft presence does not match status {}",
            m.status
        );
        if matches!(m.status, Status::Effective | Status::Closed) {
            assert!(self.effective_path(doc_id).is_file());
        }
        if m.status == Status::Retired {
            assert!(!self.effective_path(doc_id).is_file());
        }
    }
}

fn kind_of(err: &anyhow::Error) -> Option<&QmsError> {
    err.downcast_ref::<QmsError>()
}

#[test]
fn s1_sop_full_lifecycle() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    let m = env.meta("SOP-001");
    assert_eq!(m.version, "0.1");
    assert_eq!(m.status, Status::Draft);
    assert!(m.checked_out);
    assert_eq!(m.responsible_user.as_deref(), Some("claude"));
    assert!(env.draft_path("SOP-001").is_file());
    assert!(env.project.workspace_path("claude", "SOP-001").is_file());
    env.assert_invariants("SOP-001");

    env.checkin("claude", "SOP-001");
    let m = env.meta("SOP-001");
    assert!(!m.checked_out);
    assert!(!env.project.workspace_path("claude", "SOP-001").is_file());
    assert!(env
        .events("SOP-001")
        .iter()
        .any(|e| e.event == EventKind::Checkin));

    env.route_review("claude", "SOP-001", &[]);
    let m = env.meta("SOP-001");
    assert_eq!(m.status, Status::InReview);
    assert_eq!(m.pending_assignees, vec!["qa".to_string()]);
    assert!(env
        .project
        .inbox_dir("qa")
        .join("task-SOP-001-review-v0-1.md")
        .is_file());
    env.assert_invariants("SOP-001");

    env.review("qa", "SOP-001", true, "ok");
    let m = env.meta("SOP-001");
    assert_eq!(m.status, Status::Reviewed);
    assert!(m.pending_assignees.is_empty());
    let events = env.events("SOP-001");
    let comments = audit::comments(&events, Some("0.1"));
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].comment.as_deref(), Some("ok"));
    // Task consumed on submission.
    assert!(!env
        .project
        .inbox_dir("qa")
        .join("task-SOP-001-review-v0-1.md")
        .is_file());

    env.route_approval("claude", "SOP-001", false).unwrap();
    assert_eq!(env.meta("SOP-001").status, Status::InApproval);

    env.approve("qa", "SOP-001");
    let m = env.meta("SOP-001");
    assert_eq!(m.status, Status::Effective);
    assert_eq!(m.version, "1.0");
    assert_eq!(m.effective_version.as_deref(), Some("1.0"));
    assert!(m.responsible_user.is_none());
    assert!(env.effective_path("SOP-001").is_file());
    assert!(!env.draft_path("SOP-001").is_file());
    assert!(env.archive_path("SOP-001", "0.1").is_file());
    env.assert_invariants("SOP-001");

    let events = env.events("SOP-001");
    assert_eq!(events[0].event, EventKind::Create);
    assert!(events.iter().any(|e| e.event == EventKind::Effective));
}

#[test]
fn s2_cr_post_release_revert() {
    let env = TestEnv::new();

    env.create("claude", "CR", "Fix the pump");
    env.checkin("claude", "CR-001");
    env.route_review("claude", "CR-001", &[]);
    env.review("qa", "CR-001", true, "pre ok");
    env.route_approval("claude", "CR-001", false).unwrap();
    env.approve("qa", "CR-001");
    let m = env.meta("CR-001");
    assert_eq!(m.status, Status::PreApproved);
    assert_eq!(m.version, "1.0");
    // Executable approval keeps the draft and the owner.
    assert!(env.draft_path("CR-001").is_file());
    assert_eq!(m.responsible_user.as_deref(), Some("claude"));

    commands::release::run(&env.ctx("claude"), "CR-001").unwrap();
    let m = env.meta("CR-001");
    assert_eq!(m.status, Status::InExecution);
    assert_eq!(m.execution_phase, Some(ExecutionPhase::PostRelease));

    env.checkout("claude", "CR-001");
    env.checkin("claude", "CR-001");
    env.route_review("claude", "CR-001", &[]);
    assert_eq!(env.meta("CR-001").status, Status::InPostReview);
    env.review("qa", "CR-001", true, "post ok");
    assert_eq!(env.meta("CR-001").status, Status::PostReviewed);

    commands::revert::run(&env.ctx("claude"), "CR-001", Some("rework")).unwrap();
    let m = env.meta("CR-001");
    assert_eq!(m.status, Status::InExecution);
    assert_eq!(m.execution_phase, Some(ExecutionPhase::PostRelease));
    let events = env.events("CR-001");
    let revert = events
        .iter()
        .find(|e| e.event == EventKind::Revert)
        .expect("revert event");
    assert_eq!(revert.reason.as_deref(), Some("rework"));
    env.assert_invariants("CR-001");
}

#[test]
fn s2b_cr_close_writes_effective() {
    let env = TestEnv::new();

    env.create("claude", "CR", "Fix the pump");
    env.checkin("claude", "CR-001");
    env.route_review("claude", "CR-001", &[]);
    env.review("qa", "CR-001", true, "pre ok");
    env.route_approval("claude", "CR-001", false).unwrap();
    env.approve("qa", "CR-001");
    commands::release::run(&env.ctx("claude"), "CR-001").unwrap();
    env.route_review("claude", "CR-001", &[]);
    env.review("qa", "CR-001", true, "post ok");
    env.route_approval("claude", "CR-001", false).unwrap();
    env.approve("qa", "CR-001");
    let m = env.meta("CR-001");
    assert_eq!(m.status, Status::PostApproved);
    assert_eq!(m.version, "2.0");

    commands::close::run(&env.ctx("claude"), "CR-001").unwrap();
    let m = env.meta("CR-001");
    assert_eq!(m.status, Status::Closed);
    assert!(m.responsible_user.is_none());
    assert!(env.effective_path("CR-001").is_file());
    assert!(!env.draft_path("CR-001").is_file());
    env.assert_invariants("CR-001");

    // Terminal: no further checkout.
    let err = commands::checkout::run(&env.ctx("claude"), "CR-001").unwrap_err();
    assert!(matches!(
        kind_of(&err),
        Some(QmsError::InvalidTransition { .. })
    ));
}

#[test]
fn s3_rejection_cycle() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &[]);
    env.review("qa", "SOP-001", true, "ok");
    env.route_approval("claude", "SOP-001", false).unwrap();
    assert!(env
        .project
        .inbox_dir("qa")
        .join("task-SOP-001-approval-v0-1.md")
        .is_file());

    commands::reject::run(&env.ctx("qa"), "SOP-001", Some("add section 5")).unwrap();
    let m = env.meta("SOP-001");
    assert_eq!(m.status, Status::Reviewed);
    assert!(m.pending_assignees.is_empty());
    assert_eq!(m.version, "0.1");
    assert!(!env
        .project
        .inbox_dir("qa")
        .join("task-SOP-001-approval-v0-1.md")
        .is_file());
    let events = env.events("SOP-001");
    let reject = events
        .iter()
        .find(|e| e.event == EventKind::Reject)
        .expect("reject event");
    assert_eq!(reject.comment.as_deref(), Some("add section 5"));
    env.assert_invariants("SOP-001");
}

#[test]
fn s4_retire_effective_document() {
    let env = TestEnv::new();
    let doc_id = env.effective_sop();

    env.checkout("claude", &doc_id);
    let m = env.meta(&doc_id);
    assert_eq!(m.version, "1.1");
    assert_eq!(m.status, Status::Draft);
    assert!(env.archive_path(&doc_id, "1.0").is_file());

    env.checkin("claude", &doc_id);
    env.route_review("claude", &doc_id, &[]);
    env.review("qa", &doc_id, true, "retire ok");
    env.route_approval("claude", &doc_id, true).unwrap();
    assert!(env.meta(&doc_id).retiring);

    env.approve("qa", &doc_id);
    let m = env.meta(&doc_id);
    assert_eq!(m.status, Status::Retired);
    assert_eq!(m.version, "2.0");
    assert!(m.responsible_user.is_none());
    assert!(!m.retiring);
    assert!(!env.draft_path(&doc_id).is_file());
    assert!(!env.effective_path(&doc_id).is_file());
    assert!(env.archive_path(&doc_id, "1.0").is_file());
    assert!(env.archive_path(&doc_id, "2.0").is_file());
    let events = env.events(&doc_id);
    assert_eq!(events.last().map(|e| e.event), Some(EventKind::Retire));
    env.assert_invariants(&doc_id);
}

#[test]
fn s5_cancel_pre_effective_draft() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    // Still checked out: refused.
    let err = commands::cancel::run(&env.ctx("claude"), "SOP-001", true).unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::CheckedOut { .. })));

    env.checkin("claude", "SOP-001");
    // Without --confirm: refused, nothing deleted.
    assert!(commands::cancel::run(&env.ctx("claude"), "SOP-001", false).is_err());
    assert!(env.draft_path("SOP-001").is_file());

    // Leave a review task around so the sweep has something to clear.
    env.route_review("claude", "SOP-001", &[]);
    commands::cancel::run(&env.ctx("claude"), "SOP-001", true).unwrap();

    let config = env.registry.infer_doc_type("SOP-001").unwrap();
    assert!(!env.draft_path("SOP-001").is_file());
    assert!(meta::read(&env.project, "SOP-001", &config.name)
        .unwrap()
        .is_none());
    assert!(!env.project.audit_path("SOP-001", &config.name).is_file());
    for user in env.project.user_dirs() {
        assert!(!env.project.workspace_path(&user, "SOP-001").is_file());
        let inbox = env.project.inbox_dir(&user);
        if let Ok(entries) = fs::read_dir(&inbox) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                assert!(
                    !name.to_string_lossy().starts_with("task-SOP-001-"),
                    "orphan task remains for {user}"
                );
            }
        }
    }

    // The ID is freed: the next create allocates SOP-001 again.
    env.create("claude", "SOP", "Cleaning again");
    assert_eq!(env.meta("SOP-001").version, "0.1");
}

#[test]
fn s6_multi_reviewer_completion_gate() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &["qa", "lead"]);

    env.review("qa", "SOP-001", true, "fine by qa");
    let m = env.meta("SOP-001");
    assert_eq!(m.status, Status::InReview);
    assert_eq!(m.pending_assignees, vec!["lead".to_string()]);
    // Comments stay hidden while the review phase is still open.
    assert!(is_review_status(m.status));

    env.review("lead", "SOP-001", true, "fine by lead");
    let m = env.meta("SOP-001");
    assert_eq!(m.status, Status::Reviewed);
    assert!(m.pending_assignees.is_empty());
    assert!(!is_review_status(m.status));
}

#[test]
fn approval_gate_blocks_after_updates_required() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &[]);
    env.review("qa", "SOP-001", false, "fix section 3");
    assert_eq!(env.meta("SOP-001").status, Status::Reviewed);

    let err = env.route_approval("claude", "SOP-001", false).unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::ApprovalGateClosed)));

    // A fresh cycle with RECOMMEND reopens the gate.
    env.checkout("claude", "SOP-001");
    env.checkin("claude", "SOP-001");
    assert_eq!(env.meta("SOP-001").status, Status::Draft);
    env.route_review("claude", "SOP-001", &[]);
    env.review("qa", "SOP-001", true, "fixed");
    env.route_approval("claude", "SOP-001", false).unwrap();
    assert_eq!(env.meta("SOP-001").status, Status::InApproval);
}

#[test]
fn checkin_from_reviewed_state_invalidates_review() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &[]);
    env.review("qa", "SOP-001", true, "ok");
    assert_eq!(env.meta("SOP-001").status, Status::Reviewed);

    env.checkout("claude", "SOP-001");
    env.checkin("claude", "SOP-001");
    let m = env.meta("SOP-001");
    assert_eq!(m.status, Status::Draft);
    assert!(m.pending_assignees.is_empty());
}

#[test]
fn release_requires_pre_approved() {
    let env = TestEnv::new();
    env.create("claude", "CR", "Fix the pump");
    env.checkin("claude", "CR-001");
    let err = commands::release::run(&env.ctx("claude"), "CR-001").unwrap_err();
    assert!(matches!(
        kind_of(&err),
        Some(QmsError::InvalidTransition { .. })
    ));
}

#[test]
fn retire_requires_a_once_effective_version() {
    let env = TestEnv::new();
    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &[]);
    env.review("qa", "SOP-001", true, "ok");
    // v0.1 was never effective: retirement routing is refused.
    assert!(env.route_approval("claude", "SOP-001", true).is_err());
}

#[test]
fn cancel_refuses_at_version_one_point_zero() {
    let env = TestEnv::new();
    let doc_id = env.effective_sop();
    let err = commands::cancel::run(&env.ctx("claude"), &doc_id, true).unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::VersionTooHigh { .. })));
}

#[test]
fn route_is_owner_only_and_requires_checkin() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    // Checked out: routing refused.
    let err = commands::route::run(
        &env.ctx("claude"),
        &RouteArgs {
            doc_id: "SOP-001".to_string(),
            review: true,
            approval: false,
            assign: Vec::new(),
            retire: false,
        },
    )
    .unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::CheckedOut { .. })));

    env.checkin("claude", "SOP-001");
    // Non-owner (even an administrator) cannot route.
    let err = commands::route::run(
        &env.ctx("lead"),
        &RouteArgs {
            doc_id: "SOP-001".to_string(),
            review: true,
            approval: false,
            assign: Vec::new(),
            retire: false,
        },
    )
    .unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::OwnershipDenied { .. })));
}

#[test]
fn review_requires_assignment_and_comment() {
    let env = TestEnv::new();
    identity::add_user(&env.project, "tu_ui", Group::Reviewer).unwrap();

    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &["qa"]);

    // Not assigned.
    let err = commands::review::run(
        &env.ctx("tu_ui"),
        &ReviewArgs {
            doc_id: "SOP-001".to_string(),
            recommend: true,
            request_updates: false,
            comment: Some("x".to_string()),
        },
    )
    .unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::NotAssigned { .. })));

    // No comment.
    let err = commands::review::run(
        &env.ctx("qa"),
        &ReviewArgs {
            doc_id: "SOP-001".to_string(),
            recommend: true,
            request_updates: false,
            comment: None,
        },
    )
    .unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::CommentRequired { .. })));
}

#[test]
fn permission_denials_leave_state_unchanged() {
    let env = TestEnv::new();
    let err = commands::create::run(
        &env.ctx("qa"),
        &CreateArgs {
            doc_type: "SOP".to_string(),
            title: Some("Nope".to_string()),
            parent: None,
            name: None,
        },
    )
    .unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::PermissionDenied { .. })));
    assert!(!env.draft_path("SOP-001").is_file());
    let config = env.registry.infer_doc_type("SOP-001").unwrap();
    assert!(meta::read(&env.project, "SOP-001", &config.name)
        .unwrap()
        .is_none());
}

#[test]
fn multi_approver_waits_for_everyone() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &[]);
    env.review("qa", "SOP-001", true, "ok");
    commands::route::run(
        &env.ctx("claude"),
        &RouteArgs {
            doc_id: "SOP-001".to_string(),
            review: false,
            approval: true,
            assign: vec!["qa".to_string(), "lead".to_string()],
            retire: false,
        },
    )
    .unwrap();

    env.approve("qa", "SOP-001");
    let m = env.meta("SOP-001");
    assert_eq!(m.status, Status::InApproval);
    assert_eq!(m.pending_assignees, vec!["lead".to_string()]);
    assert_eq!(m.version, "0.1");

    env.approve("lead", "SOP-001");
    let m = env.meta("SOP-001");
    assert_eq!(m.status, Status::Effective);
    assert_eq!(m.version, "1.0");
}

#[test]
fn assign_adds_reviewers_mid_workflow() {
    let env = TestEnv::new();
    identity::add_user(&env.project, "tu_ui", Group::Reviewer).unwrap();

    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &["qa"]);

    commands::assign::run(&env.ctx("qa"), "SOP-001", &["tu_ui".to_string()]).unwrap();
    let m = env.meta("SOP-001");
    assert_eq!(
        m.pending_assignees,
        vec!["qa".to_string(), "tu_ui".to_string()]
    );
    assert!(env
        .project
        .inbox_dir("tu_ui")
        .join("task-SOP-001-review-v0-1.md")
        .is_file());
    assert!(env
        .events("SOP-001")
        .iter()
        .any(|e| e.event == EventKind::Assign));

    // Unknown users are refused.
    let err = commands::assign::run(&env.ctx("qa"), "SOP-001", &["ghost".to_string()])
        .unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::InvalidAssignee { .. })));
}

#[test]
fn rerouting_overwrites_tasks_idempotently() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &[]);
    env.review("qa", "SOP-001", false, "updates please");

    env.checkout("claude", "SOP-001");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &[]);

    let entries: Vec<_> = fs::read_dir(env.project.inbox_dir("qa"))
        .unwrap()
        .flatten()
        .collect();
    assert_eq!(entries.len(), 1, "re-route must overwrite the same task file");
}

#[test]
fn phase_never_returns_to_pre_release() {
    let env = TestEnv::new();

    env.create("claude", "CR", "Fix the pump");
    env.checkin("claude", "CR-001");
    env.route_review("claude", "CR-001", &[]);
    env.review("qa", "CR-001", true, "ok");
    env.route_approval("claude", "CR-001", false).unwrap();
    env.approve("qa", "CR-001");
    commands::release::run(&env.ctx("claude"), "CR-001").unwrap();

    // Checkout/checkin cycles after release must not reset the phase.
    env.checkout("claude", "CR-001");
    env.checkin("claude", "CR-001");
    assert_eq!(
        env.meta("CR-001").execution_phase,
        Some(ExecutionPhase::PostRelease)
    );
    env.route_review("claude", "CR-001", &[]);
    assert_eq!(env.meta("CR-001").status, Status::InPostReview);
}

#[test]
fn nested_creation_under_a_cr() {
    let env = TestEnv::new();

    env.create("claude", "CR", "Fix the pump");
    commands::create::run(
        &env.ctx("claude"),
        &CreateArgs {
            doc_type: "TP".to_string(),
            title: Some("Pump test".to_string()),
            parent: Some("CR-001".to_string()),
            name: None,
        },
    )
    .unwrap();
    commands::create::run(
        &env.ctx("claude"),
        &CreateArgs {
            doc_type: "VAR".to_string(),
            title: Some("Pump variance".to_string()),
            parent: Some("CR-001".to_string()),
            name: None,
        },
    )
    .unwrap();

    assert!(env.draft_path("CR-001-TP-001").is_file());
    assert!(env.draft_path("CR-001-VAR-001").is_file());
    assert!(env
        .draft_path("CR-001-TP-001")
        .parent()
        .unwrap()
        .ends_with("CR/CR-001"));

    // TP requires a CR parent.
    let err = commands::create::run(
        &env.ctx("claude"),
        &CreateArgs {
            doc_type: "TP".to_string(),
            title: Some("orphan".to_string()),
            parent: None,
            name: None,
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("--parent"));
}

#[test]
fn checkout_then_checkin_without_edits_is_stable() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    let before = fs::read_to_string(env.draft_path("SOP-001")).unwrap();

    env.checkout("claude", "SOP-001");
    env.checkin("claude", "SOP-001");
    let after = fs::read_to_string(env.draft_path("SOP-001")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn fix_repairs_effective_document_drift() {
    let env = TestEnv::new();
    let doc_id = env.effective_sop();

    // Inject drift into the effective file.
    let path = env.effective_path(&doc_id);
    let (fm, _) = docio::read_document(&path).unwrap();
    docio::write_document(
        &path,
        &fm,
        "# SOP-001: Cleaning\n\n**Version:** 0.1\n**Effective Date:** TBD\n",
    )
    .unwrap();

    commands::fix::run(&env.ctx("lead"), &doc_id).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("**Version:** 1.0"));
    assert!(!content.contains("**Effective Date:** TBD"));

    // Only administrators may fix.
    let err = commands::fix::run(&env.ctx("qa"), &doc_id).unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::PermissionDenied { .. })));
}

#[test]
fn effective_checkout_keeps_published_copy_until_reapproval() {
    let env = TestEnv::new();
    let doc_id = env.effective_sop();

    env.checkout("claude", &doc_id);
    // The published v1.0 stays available while v1.1 is drafted.
    assert!(env.effective_path(&doc_id).is_file());
    assert!(env.draft_path(&doc_id).is_file());

    env.checkin("claude", &doc_id);
    env.route_review("claude", &doc_id, &[]);
    env.review("qa", &doc_id, true, "ok");
    env.route_approval("claude", &doc_id, false).unwrap();
    env.approve("qa", &doc_id);
    let m = env.meta(&doc_id);
    assert_eq!(m.version, "2.0");
    assert_eq!(m.status, Status::Effective);
    assert!(env.archive_path(&doc_id, "1.0").is_file());
    assert!(env.archive_path(&doc_id, "1.1").is_file());
}

#[test]
fn cancelled_checked_out_document_still_exists() {
    let env = TestEnv::new();
    env.create("claude", "SOP", "Cleaning");
    let _ = commands::cancel::run(&env.ctx("claude"), "SOP-001", true);
    assert!(env.draft_path("SOP-001").is_file());
    assert!(env.project.workspace_path("claude", "SOP-001").is_file());
}

#[test]
fn audit_outcomes_are_recorded_verbatim() {
    let env = TestEnv::new();
    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &[]);
    env.review("qa", "SOP-001", false, "needs work");

    let events = env.events("SOP-001");
    let review = events
        .iter()
        .find(|e| e.event == EventKind::Review)
        .expect("review event");
    assert_eq!(review.outcome, Some(ReviewOutcome::UpdatesRequired));
    assert_eq!(review.comment.as_deref(), Some("needs work"));
    assert_eq!(review.version, "0.1");

    // Route events carry their assignees.
    let route = events
        .iter()
        .find(|e| e.event == EventKind::RouteReview)
        .expect("route event");
    assert_eq!(route.assignees.as_deref(), Some(&["qa".to_string()][..]));
}

#[test]
fn migrate_synthesizes_missing_records() {
    let env = TestEnv::new();

    // Hand-place a legacy effective document with no meta or audit.
    let path = env.effective_path("SOP-001");
    docio::write_document_minimal(
        &path,
        &docio::mapping_from_pairs(&[("title", "Legacy")]),
        "body\n",
    )
    .unwrap();

    commands::migrate::run(&env.ctx("lead")).unwrap();
    let m = env.meta("SOP-001");
    assert_eq!(m.status, Status::Effective);
    assert_eq!(m.version, "1.0");
    assert!(m.responsible_user.is_none());
    let events = env.events("SOP-001");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, EventKind::Create);

    commands::verify_migration::run(&env.ctx("qa")).unwrap();
}

#[test]
fn verify_migration_reports_gaps() {
    let env = TestEnv::new();
    let path = env.draft_path("SOP-001");
    docio::write_document_minimal(
        &path,
        &docio::mapping_from_pairs(&[("title", "Legacy draft")]),
        "body\n",
    )
    .unwrap();
    assert!(commands::verify_migration::run(&env.ctx("qa")).is_err());
}

#[test]
fn namespace_add_requires_administrator() {
    let env = TestEnv::new();

    let err = commands::namespace::add(&env.ctx("qa"), "flow").unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::PermissionDenied { .. })));

    commands::namespace::add(&env.ctx("lead"), "flow").unwrap();
    assert!(env.project.qms_root().join("SDLC-FLOW").is_dir());

    // The new singleton types exist after a registry reload.
    let registry = Registry::load(&env.project).unwrap();
    let ctx = CommandContext::authenticate(&env.project, &registry, Some("claude")).unwrap();
    commands::create::run(
        &ctx,
        &CreateArgs {
            doc_type: "FLOW-RS".to_string(),
            title: Some("Requirements".to_string()),
            parent: None,
            name: None,
        },
    )
    .unwrap();
    assert!(registry
        .doc_path(&env.project, "SDLC-FLOW-RS", true)
        .unwrap()
        .is_file());
}

#[test]
fn user_management_commands() {
    let env = TestEnv::new();

    commands::user::add(&env.ctx("lead"), "tu_scene", Some("reviewer")).unwrap();
    assert!(identity::is_known_user(&env.project, "tu_scene"));

    let err = commands::user::add(&env.ctx("qa"), "tu_ui", Some("reviewer")).unwrap_err();
    assert!(matches!(kind_of(&err), Some(QmsError::PermissionDenied { .. })));

    assert!(commands::user::add(&env.ctx("lead"), "tu_scene", Some("reviewer")).is_err());
    commands::user::list(&env.ctx("qa")).unwrap();
}

#[test]
fn init_refuses_existing_infrastructure() {
    let env = TestEnv::new();
    let err = commands::init::run(env.project.root()).unwrap_err();
    assert!(matches!(
        kind_of(&err),
        Some(QmsError::ExistingInfrastructure { .. })
    ));
}

#[test]
fn task_cleanup_on_delete_sweeps() {
    let env = TestEnv::new();

    env.create("claude", "SOP", "Cleaning");
    env.checkin("claude", "SOP-001");
    env.route_review("claude", "SOP-001", &[]);
    assert_eq!(tasks::delete_all_tasks(&env.project, "SOP-001").unwrap(), 1);
    assert_eq!(tasks::delete_all_tasks(&env.project, "SOP-001").unwrap(), 0);
}
