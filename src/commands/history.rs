//! `history` - full audit trail of a document.

use crate::audit;
use crate::context::CommandContext;
use crate::error::QmsError;
use anyhow::Result;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str) -> Result<()> {
    ctx.require_permission("history")?;

    let doc = ctx.load_doc(doc_id)?;
    let events = audit::read_log(ctx.project, doc_id, &doc.doc_type)?;

    if events.is_empty() {
        if doc.draft_path.is_file() || doc.effective_path.is_file() {
            println!("Document {doc_id} exists but has no audit log.");
            println!("Run `qms migrate` to synthesize one.");
            return Ok(());
        }
        return Err(QmsError::DocumentNotFound {
            doc_id: doc_id.to_string(),
        }
        .into());
    }

    println!("Audit History: {doc_id}");
    println!("{}", "=".repeat(70));
    println!("{}", audit::format_history(&events));
    Ok(())
}
