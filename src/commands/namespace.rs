//! `namespace` - list or register SDLC namespaces.

use crate::context::CommandContext;
use crate::registry::Registry;
use anyhow::Result;

pub fn list(ctx: &CommandContext<'_>) -> Result<()> {
    ctx.require_permission("namespace list")?;

    println!("Registered SDLC Namespaces:");
    println!("{}", "=".repeat(60));
    for (name, entry) in ctx.registry.namespaces() {
        println!("  {name}:");
        println!("    Path: {}", entry.path);
        println!("    Types: {name}-RS, {name}-RTM");
        println!();
    }
    Ok(())
}

pub fn add(ctx: &CommandContext<'_>, name: &str) -> Result<()> {
    ctx.require_permission("namespace add")?;

    let mut registry: Registry = ctx.registry.clone();
    registry.add_namespace(ctx.project, name)?;
    let name = name.to_uppercase();

    println!("Registered namespace: {name}");
    println!("  Document types: {name}-RS, {name}-RTM");
    println!("  Path: SDLC-{name}/");
    Ok(())
}
