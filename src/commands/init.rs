//! `init` - bootstrap a new QMS project in the current directory.

use crate::audit::timestamp;
use crate::error::QmsError;
use crate::identity::{self, Group, ADMIN_USERS};
use crate::project::{ensure_dir, Project, CONFIG_FILE, QMS_DIR};
use crate::prompts::{DEFAULT_APPROVAL_YAML, DEFAULT_REVIEW_YAML};
use crate::registry::Registry;
use anyhow::Result;
use std::fs;
use std::path::Path;

pub fn run(cwd: &Path) -> Result<()> {
    let project = Project::at(cwd);

    let mut existing = Vec::new();
    if project.config_path().is_file() {
        existing.push(CONFIG_FILE.to_string());
    }
    if project.qms_root().is_dir() {
        existing.push(format!("{QMS_DIR}/"));
    }
    if !existing.is_empty() {
        return Err(QmsError::ExistingInfrastructure { paths: existing }.into());
    }

    // Project marker.
    let config = serde_json::json!({
        "version": "1.0",
        "created": timestamp(),
        "sdlc_namespaces": [],
    });
    let config_path = project.config_path();
    fs::write(
        &config_path,
        format!("{}\n", serde_json::to_string_pretty(&config)?),
    )
    .map_err(|e| QmsError::storage(&config_path, e))?;

    // Document tree.
    let registry = Registry::builtin();
    for type_config in registry.types() {
        if type_config.parent_type.is_none() {
            ensure_dir(&project.qms_root().join(&type_config.path))?;
        }
    }
    ensure_dir(&project.meta_root())?;
    ensure_dir(&project.audit_root())?;
    ensure_dir(&project.archive_root())?;

    // Bootstrap users: the built-in administrators get working areas, and a
    // qa quality agent backs the default routing assignee.
    ensure_dir(&project.agents_dir())?;
    for admin in ADMIN_USERS {
        ensure_dir(&project.workspace_dir(admin))?;
        ensure_dir(&project.inbox_dir(admin))?;
    }
    identity::add_user(&project, "qa", Group::Quality)?;

    // Default prompt configurations, discoverable for customization.
    let review_dir = project.prompts_dir().join("review");
    let approval_dir = project.prompts_dir().join("approval");
    ensure_dir(&review_dir)?;
    ensure_dir(&approval_dir)?;
    let review_defaults = review_dir.join("default.yaml");
    if !review_defaults.is_file() {
        fs::write(&review_defaults, DEFAULT_REVIEW_YAML)
            .map_err(|e| QmsError::storage(&review_defaults, e))?;
    }
    let approval_defaults = approval_dir.join("default.yaml");
    if !approval_defaults.is_file() {
        fs::write(&approval_defaults, DEFAULT_APPROVAL_YAML)
            .map_err(|e| QmsError::storage(&approval_defaults, e))?;
    }

    println!("Initialized QMS project at {}", cwd.display());
    println!("  - {CONFIG_FILE}");
    println!("  - {QMS_DIR}/ (document tree, .meta, .audit, .archive)");
    println!("  - .claude/agents/ and per-user workspaces/inboxes");
    println!("  - prompts/ (default review and approval checklists)");
    println!("Administrators: {}", ADMIN_USERS.join(", "));
    Ok(())
}
