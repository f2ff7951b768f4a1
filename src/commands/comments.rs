//! `comments` - review/rejection comments for a document.
//!
//! Comments stay hidden while the document is in a review status so
//! reviewers cannot influence each other; the visibility rule reads the
//! status from metadata.

use crate::audit;
use crate::context::CommandContext;
use crate::workflow::is_review_status;
use anyhow::Result;

pub fn run(ctx: &CommandContext<'_>, doc_id: &str, version: Option<&str>) -> Result<()> {
    ctx.require_permission("comments")?;

    let doc = ctx.load_doc(doc_id)?;
    let doc_meta = doc.meta_cloned()?;

    if is_review_status(doc_meta.status) {
        println!(
            "Comments are not visible while document is in {}.",
            doc_meta.status
        );
        println!("Comments become visible once the review phase completes.");
        return Ok(());
    }

    let events = audit::read_log(ctx.project, doc_id, &doc.doc_type)?;
    let (filter, label) = match version {
        Some(v) => (Some(v), format!("Comments for {doc_id} v{v}:")),
        None => (
            Some(doc_meta.version.as_str()),
            format!("Comments for {doc_id} (current version {}):", doc_meta.version),
        ),
    };
    let comments = audit::comments(&events, filter);

    println!("{label}");
    println!("{}", "=".repeat(70));
    println!("{}", audit::format_comments(&comments));
    Ok(())
}
