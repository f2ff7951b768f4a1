//! Append-only audit trail per document.
//!
//! One JSONL file per document under `QMS/.audit/<type>/<id>.jsonl`; each
//! line is a single event. The log is the source of truth for history and
//! review comments, and the writer exposes nothing but `append` - there is no
//! update or delete surface. Readers tolerate blank lines and warn on
//! malformed ones without failing the read.

use crate::error::QmsError;
use crate::project::{ensure_dir, Project};
use crate::workflow::Status;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

/// Audit event taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Create,
    Checkout,
    Checkin,
    RouteReview,
    RouteApproval,
    Assign,
    Review,
    Approve,
    Reject,
    Effective,
    Release,
    Revert,
    Close,
    Retire,
    StatusChange,
}

/// Outcome of a review submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewOutcome {
    Recommend,
    UpdatesRequired,
}

impl ReviewOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewOutcome::Recommend => "RECOMMEND",
            ReviewOutcome::UpdatesRequired => "UPDATES_REQUIRED",
        }
    }
}

/// One audit log entry. `ts`, `event`, `user`, and `version` are present on
/// every event; the remaining fields are event-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub ts: String,
    pub event: EventKind,
    pub user: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ReviewOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_status: Option<Status>,
}

/// Current UTC timestamp, ISO-8601 with second precision.
pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

impl AuditEvent {
    fn base(event: EventKind, user: &str, version: &str) -> Self {
        AuditEvent {
            ts: timestamp(),
            event,
            user: user.to_string(),
            version: version.to_string(),
            title: None,
            outcome: None,
            comment: None,
            assignees: None,
            review_type: None,
            approval_type: None,
            from_version: None,
            reason: None,
            from_status: None,
            to_status: None,
        }
    }

    pub fn create(user: &str, version: &str, title: &str) -> Self {
        AuditEvent {
            title: Some(title.to_string()),
            ..Self::base(EventKind::Create, user, version)
        }
    }

    pub fn checkout(user: &str, version: &str, from_version: Option<&str>) -> Self {
        AuditEvent {
            from_version: from_version.map(str::to_string),
            ..Self::base(EventKind::Checkout, user, version)
        }
    }

    pub fn checkin(user: &str, version: &str) -> Self {
        Self::base(EventKind::Checkin, user, version)
    }

    pub fn route_review(user: &str, version: &str, assignees: Vec<String>, review_type: &str) -> Self {
        AuditEvent {
            assignees: Some(assignees),
            review_type: Some(review_type.to_string()),
            ..Self::base(EventKind::RouteReview, user, version)
        }
    }

    pub fn route_approval(
        user: &str,
        version: &str,
        assignees: Vec<String>,
        approval_type: &str,
    ) -> Self {
        AuditEvent {
            assignees: Some(assignees),
            approval_type: Some(approval_type.to_string()),
            ..Self::base(EventKind::RouteApproval, user, version)
        }
    }

    pub fn assign(user: &str, version: &str, assignees: Vec<String>) -> Self {
        AuditEvent {
            assignees: Some(assignees),
            ..Self::base(EventKind::Assign, user, version)
        }
    }

    pub fn review(user: &str, version: &str, outcome: ReviewOutcome, comment: &str) -> Self {
        AuditEvent {
            outcome: Some(outcome),
            comment: Some(comment.to_string()),
            ..Self::base(EventKind::Review, user, version)
        }
    }

    pub fn approve(user: &str, version: &str) -> Self {
        Self::base(EventKind::Approve, user, version)
    }

    pub fn reject(user: &str, version: &str, comment: &str) -> Self {
        AuditEvent {
            comment: Some(comment.to_string()),
            ..Self::base(EventKind::Reject, user, version)
        }
    }

    pub fn effective(user: &str, from_version: &str, new_version: &str) -> Self {
        AuditEvent {
            from_version: Some(from_version.to_string()),
            ..Self::base(EventKind::Effective, user, new_version)
        }
    }

    pub fn release(user: &str, version: &str) -> Self {
        Self::base(EventKind::Release, user, version)
    }

    pub fn revert(user: &str, version: &str, reason: &str) -> Self {
        AuditEvent {
            reason: Some(reason.to_string()),
            ..Self::base(EventKind::Revert, user, version)
        }
    }

    pub fn close(user: &str, version: &str) -> Self {
        Self::base(EventKind::Close, user, version)
    }

    pub fn retire(user: &str, from_version: &str, new_version: &str) -> Self {
        AuditEvent {
            from_version: Some(from_version.to_string()),
            ..Self::base(EventKind::Retire, user, new_version)
        }
    }

    pub fn status_change(user: &str, version: &str, from: Status, to: Status) -> Self {
        AuditEvent {
            from_status: Some(from),
            to_status: Some(to),
            ..Self::base(EventKind::StatusChange, user, version)
        }
    }
}

/// Append-only writer for one document's audit log.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn open(project: &Project, doc_id: &str, doc_type: &str) -> Result<Self, QmsError> {
        let dir = project.audit_dir(doc_type);
        ensure_dir(&dir)?;
        Ok(AuditLog {
            path: project.audit_path(doc_id, doc_type),
        })
    }

    /// Appends one event as a JSON line. Create-or-append semantics; the
    /// line is flushed before returning.
    pub fn append(&self, event: &AuditEvent) -> Result<(), QmsError> {
        let line =
            serde_json::to_string(event).map_err(|e| QmsError::storage(&self.path, e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| QmsError::storage(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| QmsError::storage(&self.path, e))?;
        file.flush().map_err(|e| QmsError::storage(&self.path, e))?;
        Ok(())
    }
}

/// Reads all events for a document in append order. Missing file is an empty
/// history; blank lines are skipped and malformed lines produce a warning
/// without failing the read.
pub fn read_log(
    project: &Project,
    doc_id: &str,
    doc_type: &str,
) -> Result<Vec<AuditEvent>, QmsError> {
    let path = project.audit_path(doc_id, doc_type);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path).map_err(|e| QmsError::storage(&path, e))?;
    let mut events = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!(line = number + 1, error = %e, "malformed audit line");
                eprintln!(
                    "Warning: invalid audit entry at {}:{}: {e}",
                    path.display(),
                    number + 1
                );
            }
        }
    }
    Ok(events)
}

/// REVIEW and REJECT events carrying a non-empty comment, optionally
/// filtered to one version.
pub fn comments<'a>(events: &'a [AuditEvent], version: Option<&str>) -> Vec<&'a AuditEvent> {
    events
        .iter()
        .filter(|e| matches!(e.event, EventKind::Review | EventKind::Reject))
        .filter(|e| e.comment.as_deref().is_some_and(|c| !c.is_empty()))
        .filter(|e| version.is_none_or(|v| e.version == v))
        .collect()
}

/// Human-readable history rendering.
pub fn format_history(events: &[AuditEvent]) -> String {
    if events.is_empty() {
        return "No audit history found.".to_string();
    }
    let mut lines = Vec::new();
    for event in events {
        let ts = &event.ts;
        let user = &event.user;
        let version = &event.version;
        match event.event {
            EventKind::Create => {
                let title = event.title.as_deref().unwrap_or("");
                lines.push(format!("[{ts}] CREATE by {user} - v{version} - \"{title}\""));
            }
            EventKind::Checkout => match event.from_version.as_deref() {
                Some(from) => lines.push(format!(
                    "[{ts}] CHECKOUT by {user} - v{version} (from v{from})"
                )),
                None => lines.push(format!("[{ts}] CHECKOUT by {user} - v{version}")),
            },
            EventKind::Checkin => lines.push(format!("[{ts}] CHECKIN by {user} - v{version}")),
            EventKind::RouteReview | EventKind::RouteApproval => {
                let kind = event
                    .review_type
                    .as_deref()
                    .or(event.approval_type.as_deref())
                    .unwrap_or("?");
                let assignees = event
                    .assignees
                    .as_deref()
                    .unwrap_or_default()
                    .join(", ");
                lines.push(format!(
                    "[{ts}] ROUTE {kind} by {user} - v{version} - to: {assignees}"
                ));
            }
            EventKind::Assign => {
                let assignees = event
                    .assignees
                    .as_deref()
                    .unwrap_or_default()
                    .join(", ");
                lines.push(format!("[{ts}] ASSIGN by {user} - v{version} - {assignees}"));
            }
            EventKind::Review => {
                let outcome = event.outcome.map(|o| o.as_str()).unwrap_or("?");
                lines.push(format!("[{ts}] REVIEW by {user} - v{version} - {outcome}"));
                if let Some(comment) = event.comment.as_deref() {
                    for line in comment.lines() {
                        lines.push(format!("    {line}"));
                    }
                }
            }
            EventKind::Approve => lines.push(format!("[{ts}] APPROVE by {user} - v{version}")),
            EventKind::Reject => {
                lines.push(format!("[{ts}] REJECT by {user} - v{version}"));
                if let Some(comment) = event.comment.as_deref() {
                    for line in comment.lines() {
                        lines.push(format!("    {line}"));
                    }
                }
            }
            EventKind::Effective => {
                let from = event.from_version.as_deref().unwrap_or("?");
                lines.push(format!("[{ts}] EFFECTIVE - v{from} -> v{version}"));
            }
            EventKind::Release => lines.push(format!("[{ts}] RELEASE by {user} - v{version}")),
            EventKind::Revert => {
                lines.push(format!("[{ts}] REVERT by {user} - v{version}"));
                if let Some(reason) = event.reason.as_deref() {
                    lines.push(format!("    Reason: {reason}"));
                }
            }
            EventKind::Close => lines.push(format!("[{ts}] CLOSE by {user} - v{version}")),
            EventKind::Retire => {
                let from = event.from_version.as_deref().unwrap_or("?");
                lines.push(format!(
                    "[{ts}] RETIRE by {user} - v{from} -> v{version} (RETIRED)"
                ));
            }
            EventKind::StatusChange => {
                let from = event.from_status.map(|s| s.as_str()).unwrap_or("?");
                let to = event.to_status.map(|s| s.as_str()).unwrap_or("?");
                lines.push(format!(
                    "[{ts}] STATUS by {user} - v{version} - {from} -> {to}"
                ));
            }
        }
    }
    lines.join("\n")
}

/// Human-readable rendering of review/rejection comments.
pub fn format_comments(comments: &[&AuditEvent]) -> String {
    if comments.is_empty() {
        return "No comments found.".to_string();
    }
    let mut lines = Vec::new();
    for event in comments {
        let mut header = format!("[v{}] {}", event.version, event.user);
        match event.event {
            EventKind::Review => {
                if let Some(outcome) = event.outcome {
                    header.push_str(&format!(" ({})", outcome.as_str()));
                }
            }
            EventKind::Reject => header.push_str(" (REJECTED)"),
            _ => {}
        }
        lines.push(format!("--- {header} - {} ---", event.ts));
        lines.push(event.comment.clone().unwrap_or_default());
        lines.push(String::new());
    }
    lines.join("\n")
}
