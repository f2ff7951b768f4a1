//! `create` - allocate a new document from its template.

use crate::audit::{AuditEvent, AuditLog};
use crate::context::CommandContext;
use crate::docio;
use crate::error::QmsError;
use crate::meta::{self, DocMeta};
use crate::project::ensure_dir;
use crate::templates;
use anyhow::{bail, Result};

pub struct CreateArgs {
    pub doc_type: String,
    pub title: Option<String>,
    pub parent: Option<String>,
    pub name: Option<String>,
}

pub fn run(ctx: &CommandContext<'_>, args: &CreateArgs) -> Result<()> {
    ctx.require_permission("create")?;

    let doc_type = args.doc_type.to_uppercase();
    let config = ctx
        .registry
        .get(&doc_type)
        .ok_or_else(|| QmsError::UnknownDocType {
            doc_id: doc_type.clone(),
        })?
        .clone();

    let parent = validate_parent(ctx, &doc_type, args.parent.as_deref())?;
    let doc_id = allocate_id(ctx, &doc_type, parent.as_deref(), args.name.as_deref())?;

    let draft_path = ctx.registry.doc_path(ctx.project, &doc_id, true)?;
    let effective_path = ctx.registry.doc_path(ctx.project, &doc_id, false)?;
    if draft_path.is_file() || effective_path.is_file() {
        return Err(QmsError::DocumentAlreadyExists { doc_id }.into());
    }

    if config.folder_per_doc {
        ensure_dir(&ctx.project.qms_root().join(&config.path).join(&doc_id))?;
    }

    let title = args
        .title
        .clone()
        .unwrap_or_else(|| format!("{doc_type} - [Title]"));
    let (frontmatter, body) =
        templates::load_for_type(ctx.project, ctx.registry, &doc_type, &doc_id, &title)?;

    docio::write_document_minimal(&draft_path, &frontmatter, &body)?;
    let workspace_path = ctx.project.workspace_path(&ctx.user, &doc_id);
    docio::write_document_minimal(&workspace_path, &frontmatter, &body)?;

    let doc_meta = DocMeta::initial(&doc_id, &config.name, config.executable, &ctx.user);
    meta::write(ctx.project, &doc_meta)?;

    let log = AuditLog::open(ctx.project, &doc_id, &config.name)?;
    log.append(&AuditEvent::create(&ctx.user, "0.1", &title))?;

    println!("Created: {doc_id} (v0.1, DRAFT)");
    println!("Location: {}", ctx.project.rel(&draft_path));
    println!("Workspace: {}", ctx.project.rel(&workspace_path));
    println!("Responsible User: {}", ctx.user);
    Ok(())
}

/// TP, ER, and VAR are nested types that require an existing parent of the
/// right kind.
fn validate_parent(
    ctx: &CommandContext<'_>,
    doc_type: &str,
    parent: Option<&str>,
) -> Result<Option<String>> {
    if !matches!(doc_type, "TP" | "ER" | "VAR") {
        return Ok(None);
    }
    let Some(parent_id) = parent else {
        bail!("{doc_type} documents require --parent (e.g. qms create {doc_type} --parent CR-001 --title \"...\")");
    };
    let parent_config = ctx.registry.infer_doc_type(parent_id)?;
    let valid = match doc_type {
        "TP" => parent_config.name == "CR",
        "ER" => parent_config.name == "TP",
        "VAR" => matches!(parent_config.name.as_str(), "CR" | "INV"),
        _ => false,
    };
    if !valid {
        bail!("{doc_type} documents cannot have a {} parent", parent_config.name);
    }
    let parent_draft = ctx.registry.doc_path(ctx.project, parent_id, true)?;
    let parent_effective = ctx.registry.doc_path(ctx.project, parent_id, false)?;
    if !parent_draft.is_file() && !parent_effective.is_file() {
        return Err(QmsError::DocumentNotFound {
            doc_id: parent_id.to_string(),
        }
        .into());
    }
    Ok(Some(parent_id.to_string()))
}

fn allocate_id(
    ctx: &CommandContext<'_>,
    doc_type: &str,
    parent: Option<&str>,
    name: Option<&str>,
) -> Result<String> {
    let config = ctx
        .registry
        .get(doc_type)
        .ok_or_else(|| QmsError::UnknownDocType {
            doc_id: doc_type.to_string(),
        })?;
    if config.singleton {
        return Ok(config.prefix.clone());
    }
    if doc_type == "TEMPLATE" {
        let Some(name) = name else {
            bail!("TEMPLATE documents require --name (e.g. qms create TEMPLATE --name CR --title \"CR Template\")");
        };
        return Ok(format!("TEMPLATE-{}", name.to_uppercase()));
    }
    match (doc_type, parent) {
        ("TP", Some(parent)) => {
            let n = ctx.registry.next_nested_number(ctx.project, parent, "TP")?;
            Ok(format!("{parent}-TP-{n:03}"))
        }
        ("VAR", Some(parent)) => {
            let n = ctx.registry.next_nested_number(ctx.project, parent, "VAR")?;
            Ok(format!("{parent}-VAR-{n:03}"))
        }
        ("ER", Some(parent)) => {
            // ER IDs hang off the owning CR/INV: CR-001-TP-ER-NNN.
            let root = parent
                .split_once("-TP-")
                .map(|(root, _)| root)
                .unwrap_or(parent);
            let n = ctx
                .registry
                .next_nested_number(ctx.project, root, "TP-ER")?;
            Ok(format!("{root}-TP-ER-{n:03}"))
        }
        _ => {
            let n = ctx.registry.next_number(ctx.project, doc_type)?;
            Ok(format!("{}-{n:03}", config.prefix))
        }
    }
}
