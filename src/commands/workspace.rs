//! `workspace` - list the caller's checked-out documents. Strictly
//! caller-scoped.

use crate::context::CommandContext;
use crate::meta;
use anyhow::Result;
use std::fs;

pub fn run(ctx: &CommandContext<'_>) -> Result<()> {
    ctx.require_permission("workspace")?;

    let workspace = ctx.project.workspace_dir(&ctx.user);
    let mut docs: Vec<_> = match fs::read_dir(&workspace) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect(),
        Err(_) => Vec::new(),
    };
    docs.sort();

    if docs.is_empty() {
        println!("Workspace is empty");
        return Ok(());
    }

    println!("Workspace for {}:", ctx.user);
    println!("{}", "-".repeat(60));
    for path in docs {
        let doc_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("?")
            .to_string();
        println!("  {doc_id}");
        // Workflow state lives in .meta, not in the workspace file.
        if let Ok(config) = ctx.registry.infer_doc_type(&doc_id) {
            if let Ok(Some(doc_meta)) = meta::read(ctx.project, &doc_id, &config.name) {
                println!("    Version: {}", doc_meta.version);
                println!("    Status: {}", doc_meta.status);
            }
        }
        println!();
    }
    Ok(())
}
