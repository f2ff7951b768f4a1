//! Shared command execution context.
//!
//! Wraps the authenticated caller plus the loaded state of the document a
//! command operates on, and provides the predicate helpers (ownership,
//! checkout, assignment) that commands compose with the workflow engine.

use crate::docio;
use crate::error::QmsError;
use crate::identity::{self, Group};
use crate::meta::{self, DocMeta};
use crate::project::Project;
use crate::registry::Registry;
use std::path::PathBuf;

/// Authenticated caller with project and registry handles.
pub struct CommandContext<'a> {
    pub project: &'a Project,
    pub registry: &'a Registry,
    pub user: String,
    pub group: Group,
}

impl<'a> CommandContext<'a> {
    /// Resolves and validates the caller's identity.
    pub fn authenticate(
        project: &'a Project,
        registry: &'a Registry,
        user: Option<&str>,
    ) -> Result<Self, QmsError> {
        let user = user.filter(|u| !u.is_empty()).ok_or_else(|| QmsError::UnknownUser {
            user: "(no --user given)".to_string(),
        })?;
        let group = identity::resolve_group(project, user)?;
        Ok(CommandContext {
            project,
            registry,
            user: user.to_string(),
            group,
        })
    }

    /// Command-level group check.
    pub fn require_permission(&self, command: &str) -> Result<(), QmsError> {
        identity::check_permission(self.group, command)
    }

    /// Loads a document's paths and metadata by ID.
    pub fn load_doc(&self, doc_id: &str) -> Result<DocState, QmsError> {
        let config = self.registry.infer_doc_type(doc_id)?;
        let doc_type = config.name.clone();
        let executable = config.executable;
        let draft_path = self.registry.doc_path(self.project, doc_id, true)?;
        let effective_path = self.registry.doc_path(self.project, doc_id, false)?;
        let meta = meta::read(self.project, doc_id, &doc_type)?;
        Ok(DocState {
            doc_id: doc_id.to_string(),
            doc_type,
            executable,
            draft_path,
            effective_path,
            meta,
        })
    }
}

/// A document's on-disk locations and workflow state.
pub struct DocState {
    pub doc_id: String,
    pub doc_type: String,
    pub executable: bool,
    pub draft_path: PathBuf,
    pub effective_path: PathBuf,
    pub meta: Option<DocMeta>,
}

impl DocState {
    /// The metadata record, or `DocumentNotFound` when none exists.
    pub fn meta(&self) -> Result<&DocMeta, QmsError> {
        self.meta.as_ref().ok_or_else(|| QmsError::DocumentNotFound {
            doc_id: self.doc_id.clone(),
        })
    }

    /// Owned copy of the metadata for mutation.
    pub fn meta_cloned(&self) -> Result<DocMeta, QmsError> {
        self.meta().cloned()
    }

    pub fn require_draft_exists(&self) -> Result<(), QmsError> {
        if self.draft_path.is_file() {
            return Ok(());
        }
        Err(QmsError::DocumentNotFound {
            doc_id: self.doc_id.clone(),
        })
    }

    /// Owner-only predicate. An unset owner does not block (unclaimed
    /// documents can be operated on by any initiator).
    pub fn require_owner(&self, user: &str) -> Result<(), QmsError> {
        let Some(meta) = self.meta.as_ref() else {
            return Ok(());
        };
        match meta.responsible_user.as_deref() {
            Some(owner) if owner != user => Err(QmsError::OwnershipDenied {
                owner: owner.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Refuses while the document is checked out.
    pub fn require_checked_in(&self) -> Result<(), QmsError> {
        if let Some(meta) = self.meta.as_ref() {
            if meta.checked_out {
                return Err(QmsError::CheckedOut {
                    owner: meta
                        .responsible_user
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            }
        }
        Ok(())
    }

    /// The caller must be among the pending assignees.
    pub fn require_assignment(&self, user: &str) -> Result<(), QmsError> {
        let pending = self
            .meta
            .as_ref()
            .map(|m| m.pending_assignees.clone())
            .unwrap_or_default();
        if pending.iter().any(|u| u == user) {
            return Ok(());
        }
        Err(QmsError::NotAssigned { pending })
    }

    /// The document's title, read from the draft (falling back to the
    /// effective file). Empty when neither exists.
    pub fn title(&self) -> String {
        let path = if self.draft_path.is_file() {
            &self.draft_path
        } else {
            &self.effective_path
        };
        if !path.is_file() {
            return String::new();
        }
        docio::read_document(path)
            .ok()
            .and_then(|(fm, _)| docio::get_str(&fm, "title").map(str::to_string))
            .unwrap_or_default()
    }
}
