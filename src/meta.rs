//! Metadata store: authoritative workflow state per document.
//!
//! One JSON file per document under `QMS/.meta/<type>/<id>.json`, managed
//! entirely by the CLI and never edited by authors. Reads tolerate missing
//! files (pre-migration documents); writes go through a temp-file-then-rename
//! so a crash never leaves a half-written record.
//!
//! The mutation helpers are the only sanctioned ways to change workflow
//! state; commands compose them with the transition table in `workflow`.

use crate::audit::{AuditEvent, EventKind, ReviewOutcome};
use crate::error::QmsError;
use crate::project::{ensure_dir, Project};
use crate::workflow::{ExecutionPhase, Status};
use serde::{Deserialize, Serialize};
use std::fs;

/// Workflow state of one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMeta {
    pub doc_id: String,
    pub doc_type: String,
    pub version: String,
    pub status: Status,
    pub executable: bool,
    pub execution_phase: Option<ExecutionPhase>,
    pub responsible_user: Option<String>,
    pub checked_out: bool,
    pub checked_out_date: Option<String>,
    pub effective_version: Option<String>,
    pub supersedes: Option<String>,
    #[serde(default)]
    pub pending_assignees: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retiring: bool,
    /// Unknown keys are preserved across read/write round-trips.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Today's date in `YYYY-MM-DD`, used for checkout and assignment dates.
pub fn today() -> String {
    chrono::Local::now().date_naive().to_string()
}

impl DocMeta {
    /// Initial metadata for a freshly created document. The creator owns it
    /// and has it checked out.
    pub fn initial(doc_id: &str, doc_type: &str, executable: bool, creator: &str) -> Self {
        DocMeta {
            doc_id: doc_id.to_string(),
            doc_type: doc_type.to_string(),
            version: "0.1".to_string(),
            status: Status::Draft,
            executable,
            execution_phase: executable.then_some(ExecutionPhase::PreRelease),
            responsible_user: Some(creator.to_string()),
            checked_out: true,
            checked_out_date: Some(today()),
            effective_version: None,
            supersedes: None,
            pending_assignees: Vec::new(),
            retiring: false,
            extra: serde_json::Map::new(),
        }
    }

    /// Metadata reconstructed for a document that predates the metadata
    /// store (unclaimed, not checked out). Used by migration and by
    /// checkout of pre-migration drafts.
    pub fn legacy(
        doc_id: &str,
        doc_type: &str,
        executable: bool,
        version: &str,
        status: Status,
    ) -> Self {
        DocMeta {
            doc_id: doc_id.to_string(),
            doc_type: doc_type.to_string(),
            version: version.to_string(),
            status,
            executable,
            execution_phase: executable.then(|| crate::workflow::infer_phase(status)),
            responsible_user: None,
            checked_out: false,
            checked_out_date: None,
            effective_version: matches!(status, Status::Effective | Status::Closed)
                .then(|| version.to_string()),
            supersedes: None,
            pending_assignees: Vec::new(),
            retiring: false,
            extra: serde_json::Map::new(),
        }
    }

    /// The effective execution phase: the stored value wins, falling back to
    /// inference from the status for legacy records.
    pub fn phase(&self) -> Option<ExecutionPhase> {
        if !self.executable {
            return None;
        }
        Some(
            self.execution_phase
                .unwrap_or_else(|| crate::workflow::infer_phase(self.status)),
        )
    }

    /// Checkout: takes ownership, optionally bumping to a new draft version.
    pub fn checkout(&mut self, user: &str, new_version: Option<String>) {
        self.responsible_user = Some(user.to_string());
        self.checked_out = true;
        self.checked_out_date = Some(today());
        if let Some(version) = new_version {
            self.version = version;
        }
    }

    /// Checkin: releases the checkout but keeps ownership and execution
    /// phase. A checkin from a reviewed state reverts to DRAFT and clears
    /// pending assignees, since the edit invalidates the prior review.
    pub fn checkin(&mut self) {
        self.checked_out = false;
        self.checked_out_date = None;
        if matches!(
            self.status,
            Status::Reviewed | Status::PreReviewed | Status::PostReviewed
        ) {
            self.status = Status::Draft;
            self.pending_assignees.clear();
        }
    }

    /// Routing: enters the target workflow state with the given assignees.
    pub fn route(&mut self, target: Status, assignees: Vec<String>) {
        self.status = target;
        self.pending_assignees = assignees;
    }

    /// Records one assignee's review submission. Removes the user from the
    /// pending set and, when a completion status is supplied, transitions.
    pub fn review_complete(&mut self, user: &str, new_status: Option<Status>) {
        self.pending_assignees.retain(|u| u != user);
        if let Some(status) = new_status {
            self.status = status;
        }
    }

    /// Approval-family transition (approve, reject, effective, retire).
    /// Clears pending assignees; when `clear_owner` is set the document
    /// leaves draft life: ownership and checkout are cleared and the new
    /// version becomes the effective version.
    pub fn approval(&mut self, new_status: Status, new_version: Option<String>, clear_owner: bool) {
        self.status = new_status;
        self.pending_assignees.clear();
        if let Some(version) = new_version {
            self.version = version;
        }
        if clear_owner {
            self.responsible_user = None;
            self.checked_out = false;
            self.checked_out_date = None;
            self.effective_version = Some(self.version.clone());
        }
    }
}

/// Reads a document's metadata; `None` when no record exists yet.
pub fn read(project: &Project, doc_id: &str, doc_type: &str) -> Result<Option<DocMeta>, QmsError> {
    let path = project.meta_path(doc_id, doc_type);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).map_err(|e| QmsError::storage(&path, e))?;
    let meta = serde_json::from_str(&content).map_err(|e| QmsError::storage(&path, e))?;
    Ok(Some(meta))
}

/// Writes a document's metadata atomically (temp sibling + rename).
pub fn write(project: &Project, meta: &DocMeta) -> Result<(), QmsError> {
    debug_assert!(
        Status::valid_for(meta.executable).contains(&meta.status),
        "status {} is invalid for executable={}",
        meta.status,
        meta.executable
    );
    let dir = project.meta_dir(&meta.doc_type);
    ensure_dir(&dir)?;
    let path = project.meta_path(&meta.doc_id, &meta.doc_type);
    let content =
        serde_json::to_string_pretty(meta).map_err(|e| QmsError::storage(&path, e))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|e| QmsError::storage(&tmp, e))?;
    fs::rename(&tmp, &path).map_err(|e| QmsError::storage(&path, e))?;
    Ok(())
}

/// Approval gate: routing to approval requires that the review cycle for the
/// current version completed with no UPDATES_REQUIRED outcome.
///
/// The cycle is the set of REVIEW events for the current version recorded
/// after the most recent ROUTE_REVIEW. An empty cycle or any
/// UPDATES_REQUIRED closes the gate.
pub fn check_approval_gate(meta: &DocMeta, events: &[AuditEvent]) -> Result<(), QmsError> {
    let cycle_start = events
        .iter()
        .rposition(|e| e.event == EventKind::RouteReview)
        .map(|i| i + 1)
        .unwrap_or(0);
    let mut reviewed = false;
    for event in events.iter().skip(cycle_start) {
        if event.event != EventKind::Review || event.version != meta.version {
            continue;
        }
        reviewed = true;
        if event.outcome == Some(ReviewOutcome::UpdatesRequired) {
            return Err(QmsError::ApprovalGateClosed);
        }
    }
    if !reviewed {
        return Err(QmsError::ApprovalGateClosed);
    }
    Ok(())
}
