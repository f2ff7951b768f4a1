//! `migrate` - synthesize missing metadata and audit records.
//!
//! One-shot repair for documents that predate the three-tier model. Status
//! and version are inferred from file location: an effective file means
//! `EFFECTIVE`/`1.0`, a draft-only document means `DRAFT`/`0.1`. Missing
//! audit logs are seeded with a `CREATE` event.

use crate::audit::{self, AuditEvent, AuditLog};
use crate::context::CommandContext;
use crate::docio;
use crate::meta::{self, DocMeta};
use crate::project::Project;
use crate::registry::Registry;
use crate::workflow::Status;
use anyhow::Result;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub fn run(ctx: &CommandContext<'_>) -> Result<()> {
    ctx.require_permission("migrate")?;

    let mut migrated_meta = 0usize;
    let mut migrated_audit = 0usize;
    for (doc_id, doc_type) in scan_documents(ctx.project, ctx.registry) {
        let effective = ctx.registry.doc_path(ctx.project, &doc_id, false)?;
        let draft = ctx.registry.doc_path(ctx.project, &doc_id, true)?;
        let executable = ctx
            .registry
            .get(&doc_type)
            .map(|c| c.executable)
            .unwrap_or(false);

        let record = match meta::read(ctx.project, &doc_id, &doc_type)? {
            Some(existing) => existing,
            None => {
                let record = if effective.is_file() {
                    DocMeta::legacy(&doc_id, &doc_type, executable, "1.0", Status::Effective)
                } else {
                    DocMeta::legacy(&doc_id, &doc_type, executable, "0.1", Status::Draft)
                };
                meta::write(ctx.project, &record)?;
                migrated_meta += 1;
                println!("  meta: {doc_id} ({} v{})", record.status, record.version);
                record
            }
        };

        if audit::read_log(ctx.project, &doc_id, &doc_type)?.is_empty() {
            let source = if draft.is_file() { &draft } else { &effective };
            let title = docio::read_document(source)
                .ok()
                .and_then(|(fm, _)| docio::get_str(&fm, "title").map(str::to_string))
                .unwrap_or_default();
            let log = AuditLog::open(ctx.project, &doc_id, &doc_type)?;
            log.append(&AuditEvent::create(&ctx.user, &record.version, &title))?;
            migrated_audit += 1;
            println!("  audit: {doc_id} (seeded CREATE)");
        }
    }

    println!("Migration complete: {migrated_meta} metadata record(s), {migrated_audit} audit log(s) created");
    Ok(())
}

/// Every document on disk as `(doc_id, doc_type)`, discovered by walking the
/// type directories (one level of folder-per-doc nesting).
pub fn scan_documents(project: &Project, registry: &Registry) -> Vec<(String, String)> {
    let mut found = BTreeSet::new();
    let mut dirs: BTreeSet<std::path::PathBuf> = BTreeSet::new();
    for config in registry.types() {
        dirs.insert(project.qms_root().join(&config.path));
    }
    for dir in dirs {
        let Ok(entries) = fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if let Ok(children) = fs::read_dir(&path) {
                    for child in children.flatten() {
                        collect_doc(registry, &child.path(), &mut found);
                    }
                }
            } else {
                collect_doc(registry, &path, &mut found);
            }
        }
    }
    found.into_iter().collect()
}

fn collect_doc(registry: &Registry, path: &Path, found: &mut BTreeSet<(String, String)>) {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    let Some(stem) = name.strip_suffix(".md") else {
        return;
    };
    let doc_id = stem.strip_suffix("-draft").unwrap_or(stem);
    if let Ok(config) = registry.infer_doc_type(doc_id) {
        found.insert((doc_id.to_string(), config.name.clone()));
    }
}
