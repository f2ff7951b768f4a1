//! `status` - workflow state projection for one document.

use crate::context::CommandContext;
use crate::error::QmsError;
use anyhow::Result;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str) -> Result<()> {
    ctx.require_permission("status")?;

    let doc = ctx.load_doc(doc_id)?;
    let location = if doc.draft_path.is_file() {
        "draft"
    } else if doc.effective_path.is_file() {
        "effective"
    } else {
        return Err(QmsError::DocumentNotFound {
            doc_id: doc_id.to_string(),
        }
        .into());
    };
    let title = doc.title();
    let doc_meta = doc.meta_cloned()?;

    println!("Document: {doc_id}");
    println!("Title: {}", if title.is_empty() { "N/A" } else { &title });
    println!("Version: {}", doc_meta.version);
    println!("Status: {}", doc_meta.status);
    println!("Location: {location}");
    println!("Type: {}", doc.doc_type);
    println!("Executable: {}", doc_meta.executable);
    println!(
        "Responsible User: {}",
        doc_meta.responsible_user.as_deref().unwrap_or("N/A")
    );
    println!("Checked Out: {}", doc_meta.checked_out);
    if let Some(effective) = doc_meta.effective_version.as_deref() {
        println!("Effective Version: {effective}");
    }
    if !doc_meta.pending_assignees.is_empty() {
        let label = if crate::workflow::is_review_status(doc_meta.status) {
            "Pending Reviewers"
        } else if crate::workflow::is_approval_status(doc_meta.status) {
            "Pending Approvers"
        } else {
            "Pending Assignees"
        };
        println!();
        println!("{label}: {}", doc_meta.pending_assignees.join(", "));
    }
    Ok(())
}
