//! `inbox` - list the caller's pending tasks. Strictly caller-scoped.

use crate::context::CommandContext;
use crate::docio;
use anyhow::Result;
use std::fs;

pub fn run(ctx: &CommandContext<'_>) -> Result<()> {
    ctx.require_permission("inbox")?;

    let inbox = ctx.project.inbox_dir(&ctx.user);
    let mut tasks: Vec<_> = match fs::read_dir(&inbox) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect(),
        Err(_) => Vec::new(),
    };
    tasks.sort();

    if tasks.is_empty() {
        println!("Inbox is empty");
        return Ok(());
    }

    println!("Inbox for {}:", ctx.user);
    println!("{}", "-".repeat(60));
    for path in tasks {
        let (frontmatter, _) = docio::read_document(&path)?;
        let field = |key: &str| docio::get_str(&frontmatter, key).unwrap_or("?").to_string();
        println!("  [{}] {}", field("task_type"), field("doc_id"));
        println!("    Workflow: {}", field("workflow_type"));
        println!("    From: {}", field("assigned_by"));
        println!("    Date: {}", field("assigned_date"));
        println!();
    }
    Ok(())
}
