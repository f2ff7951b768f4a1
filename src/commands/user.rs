//! `user` - manage QMS users via agent definition files.

use crate::context::CommandContext;
use crate::identity::{self, Group};
use anyhow::{bail, Result};

pub fn add(ctx: &CommandContext<'_>, user: &str, group: Option<&str>) -> Result<()> {
    ctx.require_permission("user add")?;

    let Some(group) = group else {
        bail!("--add requires --group (administrator, initiator, quality, reviewer)");
    };
    let Some(group) = Group::parse(group) else {
        bail!("unknown group '{group}' (valid: administrator, initiator, quality, reviewer)");
    };
    if identity::is_known_user(ctx.project, user) {
        bail!("user '{user}' already exists");
    }

    identity::add_user(ctx.project, user, group)?;
    println!("Added user: {user} ({group})");
    println!("Agent file: {}", ctx.project.rel(&ctx.project.agent_path(user)));
    Ok(())
}

pub fn list(ctx: &CommandContext<'_>) -> Result<()> {
    ctx.require_permission("user list")?;

    println!("Known users:");
    for (user, group) in identity::known_users(ctx.project) {
        println!("  {user} ({group})");
    }
    Ok(())
}
