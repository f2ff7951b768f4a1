//! User identity, groups, and command-level permissions.
//!
//! Users come from two merged sources: a hardcoded administrator set built
//! into the binary, and per-user agent files under `.claude/agents/<user>.md`
//! whose frontmatter carries a `group`. Groups form the hierarchy
//! administrator > initiator > quality > reviewer; a permission granted to a
//! group is granted to every higher group.

use crate::docio;
use crate::error::QmsError;
use crate::project::{ensure_dir, Project};
use std::fmt::{Display, Formatter};
use std::fs;

/// Identities that are administrators without an agent file.
pub const ADMIN_USERS: &[&str] = &["lead", "claude"];

/// User group. Variant order is rank order; `>=` means "at least as
/// privileged as".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Group {
    Reviewer,
    Quality,
    Initiator,
    Administrator,
}

impl Group {
    pub fn parse(s: &str) -> Option<Group> {
        match s {
            "reviewer" => Some(Group::Reviewer),
            "quality" => Some(Group::Quality),
            "initiator" => Some(Group::Initiator),
            "administrator" => Some(Group::Administrator),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Reviewer => "reviewer",
            Group::Quality => "quality",
            Group::Initiator => "initiator",
            Group::Administrator => "administrator",
        }
    }

    /// Group hierarchy check: does this group satisfy `required`?
    pub fn permits(&self, required: Group) -> bool {
        *self >= required
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum group per command. Extra predicates (owner-only, assignment,
/// status gates) are enforced by the commands themselves.
const PERMISSIONS: &[(&str, Group)] = &[
    ("create", Group::Initiator),
    ("checkout", Group::Initiator),
    ("checkin", Group::Initiator),
    ("route", Group::Initiator),
    ("assign", Group::Quality),
    ("review", Group::Reviewer),
    ("approve", Group::Reviewer),
    ("reject", Group::Reviewer),
    ("release", Group::Initiator),
    ("revert", Group::Initiator),
    ("close", Group::Initiator),
    ("cancel", Group::Initiator),
    ("fix", Group::Administrator),
    ("namespace add", Group::Administrator),
    ("user add", Group::Administrator),
    ("migrate", Group::Administrator),
    // Read-only queries: any known user.
    ("read", Group::Reviewer),
    ("status", Group::Reviewer),
    ("inbox", Group::Reviewer),
    ("workspace", Group::Reviewer),
    ("history", Group::Reviewer),
    ("comments", Group::Reviewer),
    ("namespace list", Group::Reviewer),
    ("user list", Group::Reviewer),
    ("verify-migration", Group::Reviewer),
];

/// Resolves a user to their group, or fails with `UnknownUser` /
/// `InvalidAgentGroup`.
pub fn resolve_group(project: &Project, user: &str) -> Result<Group, QmsError> {
    if ADMIN_USERS.contains(&user) {
        return Ok(Group::Administrator);
    }
    let agent_path = project.agent_path(user);
    if !agent_path.is_file() {
        return Err(QmsError::UnknownUser {
            user: user.to_string(),
        });
    }
    let (frontmatter, _) = docio::read_document(&agent_path)?;
    let group = docio::get_str(&frontmatter, "group").ok_or_else(|| QmsError::InvalidAgentGroup {
        user: user.to_string(),
        group: "<missing>".to_string(),
    })?;
    Group::parse(group).ok_or_else(|| QmsError::InvalidAgentGroup {
        user: user.to_string(),
        group: group.to_string(),
    })
}

pub fn is_known_user(project: &Project, user: &str) -> bool {
    resolve_group(project, user).is_ok()
}

/// All known users with their groups: built-in administrators plus every
/// valid agent file, sorted by name.
pub fn known_users(project: &Project) -> Vec<(String, Group)> {
    let mut users: Vec<(String, Group)> = ADMIN_USERS
        .iter()
        .map(|u| (u.to_string(), Group::Administrator))
        .collect();
    if let Ok(entries) = fs::read_dir(project.agents_dir()) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str().and_then(|n| n.strip_suffix(".md")) else {
                continue;
            };
            if ADMIN_USERS.contains(&name) {
                continue;
            }
            if let Ok(group) = resolve_group(project, name) {
                users.push((name.to_string(), group));
            }
        }
    }
    users.sort();
    users
}

/// Command-level permission check against the table above.
pub fn check_permission(group: Group, command: &str) -> Result<(), QmsError> {
    let required = PERMISSIONS
        .iter()
        .find(|(name, _)| *name == command)
        .map(|(_, g)| *g)
        .unwrap_or(Group::Administrator);
    if group.permits(required) {
        return Ok(());
    }
    Err(QmsError::PermissionDenied {
        command: command.to_string(),
        group: group.as_str().to_string(),
        required: required.as_str().to_string(),
    })
}

/// Registers a user by writing their agent file and creating their
/// workspace and inbox directories. Used by `init` and `user --add`.
pub fn add_user(project: &Project, user: &str, group: Group) -> Result<(), QmsError> {
    ensure_dir(&project.agents_dir())?;
    let mut frontmatter = serde_yaml::Mapping::new();
    frontmatter.insert(
        serde_yaml::Value::String("group".to_string()),
        serde_yaml::Value::String(group.as_str().to_string()),
    );
    let body = format!("# {user}\n\nQMS {group} agent.\n");
    docio::write_document(&project.agent_path(user), &frontmatter, &body)?;
    ensure_dir(&project.workspace_dir(user))?;
    ensure_dir(&project.inbox_dir(user))?;
    Ok(())
}
