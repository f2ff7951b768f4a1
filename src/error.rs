//! Error types for QMS command handling.
//!
//! Leaf modules return `QmsError` variants; the command layer lifts them into
//! `anyhow` and `main` translates them to a stderr message, an optional hint
//! line, and exit code 1. Every refusal leaves the filesystem unchanged.

use std::fmt::{Display, Formatter};
use std::path::Path;

/// Errors that can occur while executing a QMS command.
#[derive(Debug, Clone)]
pub enum QmsError {
    /// No project root could be located from the working directory.
    UninitializedProject,
    /// User is neither a built-in administrator nor a registered agent.
    UnknownUser { user: String },
    /// Agent file exists but carries an unrecognized group.
    InvalidAgentGroup { user: String, group: String },
    /// Command-level group check failed.
    PermissionDenied {
        command: String,
        group: String,
        required: String,
    },
    /// Caller is not the responsible user of the document.
    OwnershipDenied { owner: String },
    /// Caller is not among the pending assignees.
    NotAssigned { pending: Vec<String> },
    DocumentNotFound { doc_id: String },
    DocumentAlreadyExists { doc_id: String },
    /// Document ID does not match any registered type pattern.
    UnknownDocType { doc_id: String },
    /// The workflow engine has no transition for this request.
    InvalidTransition {
        from: String,
        action: String,
        reason: String,
    },
    /// Routing to approval while the last review requested updates.
    ApprovalGateClosed,
    /// Operation requires a checked-in document.
    CheckedOut { owner: String },
    /// Operation requires the document to be checked out.
    NotCheckedOut { doc_id: String },
    /// Cancel attempted on a document that has been effective.
    VersionTooHigh { version: String },
    /// A required free-text flag was omitted.
    CommentRequired { flag: String },
    /// Assign given a user that cannot be resolved.
    InvalidAssignee { user: String },
    /// Init refused because QMS structures already exist.
    ExistingInfrastructure { paths: Vec<String> },
    /// Filesystem or serialization failure.
    Storage { message: String },
}

impl QmsError {
    /// Wraps an I/O or serde failure with the path it occurred on.
    pub fn storage(path: &Path, err: impl Display) -> Self {
        Self::Storage {
            message: format!("{}: {}", path.display(), err),
        }
    }

    /// A second line of guidance printed after the error message, when the
    /// failure has an obvious next step.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::UninitializedProject => {
                Some("Run `qms init` in the project root to create one.".to_string())
            }
            Self::UnknownUser { .. } => Some(
                "Known users are the built-in administrators and agents under .claude/agents/."
                    .to_string(),
            ),
            Self::InvalidAgentGroup { .. } => Some(
                "Valid groups: administrator, initiator, quality, reviewer.".to_string(),
            ),
            Self::OwnershipDenied { owner } => Some(format!(
                "Ask {owner} to perform this operation, or to check the document in."
            )),
            Self::NotAssigned { .. } => {
                Some("Check your inbox with `qms inbox`, or ask QA to assign you.".to_string())
            }
            Self::ApprovalGateClosed => Some(
                "Address the requested updates, check in, and complete a new review cycle first."
                    .to_string(),
            ),
            Self::CheckedOut { owner } => {
                Some(format!("The owner must check it in first: `qms --user {owner} checkin <DOC-ID>`."))
            }
            Self::VersionTooHigh { .. } => Some(
                "Once-effective documents are retired instead: route the final approval with --retire."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

impl Display for QmsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UninitializedProject => {
                write!(f, "not inside a QMS project (no qms.config.json found)")
            }
            Self::UnknownUser { user } => write!(f, "unknown user: {user}"),
            Self::InvalidAgentGroup { user, group } => {
                write!(f, "agent file for {user} declares invalid group '{group}'")
            }
            Self::PermissionDenied {
                command,
                group,
                required,
            } => write!(
                f,
                "permission denied: '{command}' requires the {required} group (you are {group})"
            ),
            Self::OwnershipDenied { owner } => {
                write!(f, "only the document owner may do this (owner: {owner})")
            }
            Self::NotAssigned { pending } => {
                let assigned = if pending.is_empty() {
                    "none".to_string()
                } else {
                    pending.join(", ")
                };
                write!(f, "you are not assigned to this document (assigned: {assigned})")
            }
            Self::DocumentNotFound { doc_id } => write!(f, "document not found: {doc_id}"),
            Self::DocumentAlreadyExists { doc_id } => {
                write!(f, "document already exists: {doc_id}")
            }
            Self::UnknownDocType { doc_id } => {
                write!(f, "'{doc_id}' does not match any known document type")
            }
            Self::InvalidTransition {
                from,
                action,
                reason,
            } => write!(f, "cannot {action} from {from}: {reason}"),
            Self::ApprovalGateClosed => {
                write!(f, "approval routing blocked: the last review requested updates")
            }
            Self::CheckedOut { owner } => write!(f, "document is checked out by {owner}"),
            Self::NotCheckedOut { doc_id } => write!(f, "{doc_id} is not checked out"),
            Self::VersionTooHigh { version } => {
                write!(f, "cannot cancel a document that has been effective (v{version})")
            }
            Self::CommentRequired { flag } => write!(f, "missing required --{flag} text"),
            Self::InvalidAssignee { user } => write!(f, "cannot assign unknown user: {user}"),
            Self::ExistingInfrastructure { paths } => {
                write!(f, "existing QMS infrastructure found: {}", paths.join(", "))
            }
            Self::Storage { message } => write!(f, "storage failure: {message}"),
        }
    }
}

impl std::error::Error for QmsError {}
