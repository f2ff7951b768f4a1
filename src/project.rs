//! Project root discovery and canonical path derivation.
//!
//! Every persistent artifact lives at a deterministic location under the
//! project root:
//! - `qms.config.json` - project marker
//! - `QMS/<type-path>/...` - controlled documents
//! - `QMS/.meta/<type>/<id>.json` - workflow state
//! - `QMS/.audit/<type>/<id>.jsonl` - audit history
//! - `QMS/.archive/<type-path>/...` - archived versions
//! - `.claude/users/<user>/{workspace,inbox}` - per-user working areas
//! - `.claude/agents/<user>.md` - user group assignment
//!
//! A `Project` is constructed once and passed explicitly; no module-level
//! globals.

use crate::error::QmsError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the project marker file.
pub const CONFIG_FILE: &str = "qms.config.json";

/// Name of the controlled-document tree.
pub const QMS_DIR: &str = "QMS";

/// A resolved QMS project root.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Wraps a known project root (used by `init` and tests).
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walks upward from `start` looking for `qms.config.json`; falls back to
    /// the first ancestor containing a `QMS/` directory.
    pub fn discover(start: &Path) -> Result<Self, QmsError> {
        for dir in start.ancestors() {
            if dir.join(CONFIG_FILE).is_file() {
                debug!(root = %dir.display(), "project root found via config marker");
                return Ok(Self::at(dir));
            }
        }
        for dir in start.ancestors() {
            if dir.join(QMS_DIR).is_dir() {
                debug!(root = %dir.display(), "project root found via QMS directory");
                return Ok(Self::at(dir));
            }
        }
        Err(QmsError::UninitializedProject)
    }

    #[allow(dead_code)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn qms_root(&self) -> PathBuf {
        self.root.join(QMS_DIR)
    }

    pub fn meta_root(&self) -> PathBuf {
        self.qms_root().join(".meta")
    }

    pub fn meta_dir(&self, doc_type: &str) -> PathBuf {
        self.meta_root().join(doc_type)
    }

    pub fn meta_path(&self, doc_id: &str, doc_type: &str) -> PathBuf {
        self.meta_dir(doc_type).join(format!("{doc_id}.json"))
    }

    pub fn audit_root(&self) -> PathBuf {
        self.qms_root().join(".audit")
    }

    pub fn audit_dir(&self, doc_type: &str) -> PathBuf {
        self.audit_root().join(doc_type)
    }

    pub fn audit_path(&self, doc_id: &str, doc_type: &str) -> PathBuf {
        self.audit_dir(doc_type).join(format!("{doc_id}.jsonl"))
    }

    pub fn archive_root(&self) -> PathBuf {
        self.qms_root().join(".archive")
    }

    pub fn namespaces_path(&self) -> PathBuf {
        self.meta_root().join("sdlc_namespaces.json")
    }

    pub fn claude_root(&self) -> PathBuf {
        self.root.join(".claude")
    }

    pub fn users_root(&self) -> PathBuf {
        self.claude_root().join("users")
    }

    pub fn workspace_dir(&self, user: &str) -> PathBuf {
        self.users_root().join(user).join("workspace")
    }

    pub fn workspace_path(&self, user: &str, doc_id: &str) -> PathBuf {
        self.workspace_dir(user).join(format!("{doc_id}.md"))
    }

    pub fn inbox_dir(&self, user: &str) -> PathBuf {
        self.users_root().join(user).join("inbox")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.claude_root().join("agents")
    }

    pub fn agent_path(&self, user: &str) -> PathBuf {
        self.agents_dir().join(format!("{user}.md"))
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.root.join("prompts")
    }

    /// Renders a path relative to the project root for display.
    pub fn rel(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    /// Names of users with a directory under `.claude/users/`, sorted.
    /// Used for project-wide sweeps (rejection, cancellation).
    pub fn user_dirs(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = fs::read_dir(self.users_root()) {
            for entry in entries.flatten() {
                if entry.path().is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

/// Creates a directory (and parents) with a storage error on failure.
pub fn ensure_dir(dir: &Path) -> Result<(), QmsError> {
    fs::create_dir_all(dir).map_err(|e| QmsError::storage(dir, e))
}
