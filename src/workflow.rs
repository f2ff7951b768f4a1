//! Declarative workflow state machine for document lifecycle transitions.
//!
//! The transition table below is the ONLY place where valid status changes
//! are defined. Commands look transitions up here and never hard-code status
//! comparisons. Each lookup must match exactly one row; zero matches is a
//! user-facing refusal and more than one is a table bug.

use crate::error::QmsError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::debug;

/// Document workflow status.
///
/// `Draft` is shared; the `Pre`/`Post` families apply to executable types
/// only, the review/approval/effective family to non-executable types only.
/// `Closed` and `Retired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Draft,
    InReview,
    Reviewed,
    InApproval,
    Approved,
    Effective,
    InPreReview,
    PreReviewed,
    InPreApproval,
    PreApproved,
    InExecution,
    InPostReview,
    PostReviewed,
    InPostApproval,
    PostApproved,
    Closed,
    Retired,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "DRAFT",
            Status::InReview => "IN_REVIEW",
            Status::Reviewed => "REVIEWED",
            Status::InApproval => "IN_APPROVAL",
            Status::Approved => "APPROVED",
            Status::Effective => "EFFECTIVE",
            Status::InPreReview => "IN_PRE_REVIEW",
            Status::PreReviewed => "PRE_REVIEWED",
            Status::InPreApproval => "IN_PRE_APPROVAL",
            Status::PreApproved => "PRE_APPROVED",
            Status::InExecution => "IN_EXECUTION",
            Status::InPostReview => "IN_POST_REVIEW",
            Status::PostReviewed => "POST_REVIEWED",
            Status::InPostApproval => "IN_POST_APPROVAL",
            Status::PostApproved => "POST_APPROVED",
            Status::Closed => "CLOSED",
            Status::Retired => "RETIRED",
        }
    }

    /// Statuses a document of the given executability may legally hold.
    pub fn valid_for(executable: bool) -> &'static [Status] {
        if executable {
            &[
                Status::Draft,
                Status::InPreReview,
                Status::PreReviewed,
                Status::InPreApproval,
                Status::PreApproved,
                Status::InExecution,
                Status::InPostReview,
                Status::PostReviewed,
                Status::InPostApproval,
                Status::PostApproved,
                Status::Closed,
                Status::Retired,
            ]
        } else {
            &[
                Status::Draft,
                Status::InReview,
                Status::Reviewed,
                Status::InApproval,
                Status::Approved,
                Status::Effective,
                Status::Retired,
            ]
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Closed | Status::Retired)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution phase of an executable document. Transitions pre -> post exactly
/// once, at release, and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    PreRelease,
    PostRelease,
}

/// Actions a command may request from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    RouteReview,
    RouteApproval,
    Review,
    Approve,
    Reject,
    Release,
    Revert,
    Close,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::RouteReview => "route for review",
            Action::RouteApproval => "route for approval",
            Action::Review => "review",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Release => "release",
            Action::Revert => "revert",
            Action::Close => "close",
        }
    }
}

/// Workflow phase label, used for task generation and audit routing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowType {
    Review,
    Approval,
    PreReview,
    PreApproval,
    PostReview,
    PostApproval,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::Review => "REVIEW",
            WorkflowType::Approval => "APPROVAL",
            WorkflowType::PreReview => "PRE_REVIEW",
            WorkflowType::PreApproval => "PRE_APPROVAL",
            WorkflowType::PostReview => "POST_REVIEW",
            WorkflowType::PostApproval => "POST_APPROVAL",
        }
    }

    /// Lowercase form used in task file names.
    pub fn lower(&self) -> String {
        self.as_str().to_lowercase()
    }

    pub fn is_review(&self) -> bool {
        matches!(
            self,
            WorkflowType::Review | WorkflowType::PreReview | WorkflowType::PostReview
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    Major,
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: Status,
    pub action: Action,
    pub to: Status,
    pub workflow_type: Option<WorkflowType>,
    /// `None` = applies to both; `Some(true)` = executable docs only.
    pub for_executable: Option<bool>,
    /// Extra filter for executable documents whose status alone is ambiguous.
    pub requires_phase: Option<ExecutionPhase>,
    pub version_bump: Option<VersionBump>,
    pub archives_version: bool,
    pub clears_owner: bool,
    pub requires_assignment: bool,
}

const fn transition(from: Status, action: Action, to: Status) -> Transition {
    Transition {
        from,
        action,
        to,
        workflow_type: None,
        for_executable: None,
        requires_phase: None,
        version_bump: None,
        archives_version: false,
        clears_owner: false,
        requires_assignment: false,
    }
}

/// The canonical transition set. Sole source of truth for the lifecycle.
pub const TRANSITIONS: &[Transition] = &[
    // Route review
    Transition {
        workflow_type: Some(WorkflowType::Review),
        for_executable: Some(false),
        ..transition(Status::Draft, Action::RouteReview, Status::InReview)
    },
    Transition {
        workflow_type: Some(WorkflowType::PreReview),
        for_executable: Some(true),
        requires_phase: Some(ExecutionPhase::PreRelease),
        ..transition(Status::Draft, Action::RouteReview, Status::InPreReview)
    },
    Transition {
        workflow_type: Some(WorkflowType::PostReview),
        for_executable: Some(true),
        requires_phase: Some(ExecutionPhase::PostRelease),
        ..transition(Status::Draft, Action::RouteReview, Status::InPostReview)
    },
    Transition {
        workflow_type: Some(WorkflowType::PostReview),
        for_executable: Some(true),
        requires_phase: Some(ExecutionPhase::PostRelease),
        ..transition(Status::InExecution, Action::RouteReview, Status::InPostReview)
    },
    // Route approval
    Transition {
        workflow_type: Some(WorkflowType::Approval),
        for_executable: Some(false),
        ..transition(Status::Reviewed, Action::RouteApproval, Status::InApproval)
    },
    Transition {
        workflow_type: Some(WorkflowType::PreApproval),
        for_executable: Some(true),
        ..transition(Status::PreReviewed, Action::RouteApproval, Status::InPreApproval)
    },
    Transition {
        workflow_type: Some(WorkflowType::PostApproval),
        for_executable: Some(true),
        ..transition(Status::PostReviewed, Action::RouteApproval, Status::InPostApproval)
    },
    // Review completion (fires when the last pending assignee submits)
    Transition {
        workflow_type: Some(WorkflowType::Review),
        for_executable: Some(false),
        requires_assignment: true,
        ..transition(Status::InReview, Action::Review, Status::Reviewed)
    },
    Transition {
        workflow_type: Some(WorkflowType::PreReview),
        for_executable: Some(true),
        requires_assignment: true,
        ..transition(Status::InPreReview, Action::Review, Status::PreReviewed)
    },
    Transition {
        workflow_type: Some(WorkflowType::PostReview),
        for_executable: Some(true),
        requires_assignment: true,
        ..transition(Status::InPostReview, Action::Review, Status::PostReviewed)
    },
    // Approve: major bump, archive outgoing draft; non-executable path clears
    // owner on the implicit APPROVED -> EFFECTIVE follow-on
    Transition {
        workflow_type: Some(WorkflowType::Approval),
        for_executable: Some(false),
        requires_assignment: true,
        version_bump: Some(VersionBump::Major),
        archives_version: true,
        clears_owner: true,
        ..transition(Status::InApproval, Action::Approve, Status::Approved)
    },
    Transition {
        workflow_type: Some(WorkflowType::PreApproval),
        for_executable: Some(true),
        requires_assignment: true,
        version_bump: Some(VersionBump::Major),
        archives_version: true,
        ..transition(Status::InPreApproval, Action::Approve, Status::PreApproved)
    },
    Transition {
        workflow_type: Some(WorkflowType::PostApproval),
        for_executable: Some(true),
        requires_assignment: true,
        version_bump: Some(VersionBump::Major),
        archives_version: true,
        ..transition(Status::InPostApproval, Action::Approve, Status::PostApproved)
    },
    // Reject: version unchanged, back to the reviewed state
    Transition {
        for_executable: Some(false),
        requires_assignment: true,
        ..transition(Status::InApproval, Action::Reject, Status::Reviewed)
    },
    Transition {
        for_executable: Some(true),
        requires_assignment: true,
        ..transition(Status::InPreApproval, Action::Reject, Status::PreReviewed)
    },
    Transition {
        for_executable: Some(true),
        requires_assignment: true,
        ..transition(Status::InPostApproval, Action::Reject, Status::PostReviewed)
    },
    // Release: enters execution, flips phase to post_release (one-way)
    Transition {
        for_executable: Some(true),
        ..transition(Status::PreApproved, Action::Release, Status::InExecution)
    },
    // Revert: post-review back to execution (reason required by the command)
    Transition {
        for_executable: Some(true),
        ..transition(Status::PostReviewed, Action::Revert, Status::InExecution)
    },
    // Close: writes effective, deletes draft, clears owner
    Transition {
        for_executable: Some(true),
        clears_owner: true,
        ..transition(Status::PostApproved, Action::Close, Status::Closed)
    },
];

/// Infers the execution phase from a status when metadata carries none.
/// The explicit `execution_phase` in metadata always wins over this.
pub fn infer_phase(status: Status) -> ExecutionPhase {
    match status {
        Status::InExecution
        | Status::InPostReview
        | Status::PostReviewed
        | Status::InPostApproval
        | Status::PostApproved
        | Status::Closed => ExecutionPhase::PostRelease,
        _ => ExecutionPhase::PreRelease,
    }
}

/// Looks up the single transition for `(from, action, executable, phase)`.
///
/// Zero matches is an `InvalidTransition` refusal. The table is constructed
/// so that at most one row can match; a multiple match is a table bug and is
/// reported the same way rather than panicking mid-command.
pub fn find_transition(
    from: Status,
    action: Action,
    executable: bool,
    phase: Option<ExecutionPhase>,
) -> Result<&'static Transition, QmsError> {
    let effective_phase = phase.unwrap_or_else(|| infer_phase(from));
    let mut matched: Option<&'static Transition> = None;

    for t in TRANSITIONS {
        if t.from != from || t.action != action {
            continue;
        }
        if let Some(exec) = t.for_executable {
            if exec != executable {
                continue;
            }
        }
        if let Some(required) = t.requires_phase {
            if required != effective_phase {
                continue;
            }
        }
        if matched.is_some() {
            return Err(QmsError::InvalidTransition {
                from: from.as_str().to_string(),
                action: action.as_str().to_string(),
                reason: "ambiguous transition table entry".to_string(),
            });
        }
        matched = Some(t);
    }

    match matched {
        Some(t) => {
            debug!(from = from.as_str(), to = t.to.as_str(), "transition resolved");
            Ok(t)
        }
        None => {
            let kind = if executable {
                "an executable"
            } else {
                "a non-executable"
            };
            Err(QmsError::InvalidTransition {
                from: from.as_str().to_string(),
                action: action.as_str().to_string(),
                reason: format!("no transition defined for {kind} document in this state"),
            })
        }
    }
}

pub fn is_review_status(status: Status) -> bool {
    matches!(
        status,
        Status::InReview | Status::InPreReview | Status::InPostReview
    )
}

pub fn is_approval_status(status: Status) -> bool {
    matches!(
        status,
        Status::InApproval | Status::InPreApproval | Status::InPostApproval
    )
}

/// The workflow phase label for an active review/approval status.
pub fn workflow_type_for_status(status: Status) -> Option<WorkflowType> {
    match status {
        Status::InReview => Some(WorkflowType::Review),
        Status::InApproval => Some(WorkflowType::Approval),
        Status::InPreReview => Some(WorkflowType::PreReview),
        Status::InPreApproval => Some(WorkflowType::PreApproval),
        Status::InPostReview => Some(WorkflowType::PostReview),
        Status::InPostApproval => Some(WorkflowType::PostApproval),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
