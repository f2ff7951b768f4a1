//! `verify-migration` - report documents missing metadata or audit records.

use crate::audit;
use crate::commands::migrate::scan_documents;
use crate::context::CommandContext;
use crate::meta;
use anyhow::{bail, Result};

pub fn run(ctx: &CommandContext<'_>) -> Result<()> {
    ctx.require_permission("verify-migration")?;

    let documents = scan_documents(ctx.project, ctx.registry);
    let mut missing = Vec::new();
    for (doc_id, doc_type) in &documents {
        if meta::read(ctx.project, doc_id, doc_type)?.is_none() {
            missing.push(format!("{doc_id}: no metadata record"));
        }
        if audit::read_log(ctx.project, doc_id, doc_type)?.is_empty() {
            missing.push(format!("{doc_id}: no audit log"));
        }
    }

    println!("Checked {} document(s)", documents.len());
    if missing.is_empty() {
        println!("All documents have metadata and audit records");
        return Ok(());
    }
    for item in &missing {
        println!("  MISSING {item}");
    }
    bail!("{} document(s) need `qms migrate`", missing.len());
}
