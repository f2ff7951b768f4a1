//! Document type registry: the static type table plus the dynamic SDLC
//! namespace overlay.
//!
//! The registry is built once at startup by merging the built-in entries with
//! the persisted `QMS/.meta/sdlc_namespaces.json` map, then passed by
//! reference to everything that needs type information, ID inference, path
//! derivation, or ID allocation.

use crate::error::QmsError;
use crate::project::{ensure_dir, Project};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Built-in SDLC namespaces, always present and never serialized.
pub const BUILTIN_NAMESPACES: &[&str] = &["QMS"];

/// Storage and workflow configuration for one document type.
#[derive(Debug, Clone)]
pub struct TypeConfig {
    /// Type name, e.g. `SOP` or `QMS-RS`.
    pub name: String,
    /// Subdirectory under `QMS/`.
    pub path: String,
    /// ID prefix; for singletons this is the complete fixed ID.
    pub prefix: String,
    pub executable: bool,
    /// Document lives in its own folder (`QMS/<path>/<id>/<id>.md`).
    pub folder_per_doc: bool,
    /// Exactly one instance exists and its ID is `prefix`.
    pub singleton: bool,
    /// Child type stored inside the parent's folder.
    pub parent_type: Option<String>,
}

/// One persisted namespace entry in `sdlc_namespaces.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceEntry {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct Registry {
    types: BTreeMap<String, TypeConfig>,
    namespaces: BTreeMap<String, NamespaceEntry>,
}

fn base_types() -> Vec<TypeConfig> {
    let flat = |name: &str, executable: bool| TypeConfig {
        name: name.to_string(),
        path: name.to_string(),
        prefix: name.to_string(),
        executable,
        folder_per_doc: false,
        singleton: false,
        parent_type: None,
    };
    vec![
        flat("SOP", false),
        TypeConfig {
            folder_per_doc: true,
            ..flat("CR", true)
        },
        TypeConfig {
            folder_per_doc: true,
            ..flat("INV", true)
        },
        TypeConfig {
            parent_type: Some("CR".to_string()),
            ..flat("TP", true)
        },
        TypeConfig {
            parent_type: Some("TP".to_string()),
            ..flat("ER", true)
        },
        TypeConfig {
            parent_type: Some("CR".to_string()),
            ..flat("VAR", true)
        },
        flat("TEMPLATE", false),
    ]
}

fn namespace_types(name: &str, entry: &NamespaceEntry) -> [TypeConfig; 2] {
    let singleton = |suffix: &str| TypeConfig {
        name: format!("{name}-{suffix}"),
        path: entry.path.clone(),
        prefix: format!("SDLC-{name}-{suffix}"),
        executable: false,
        folder_per_doc: false,
        singleton: true,
        parent_type: None,
    };
    [singleton("RS"), singleton("RTM")]
}

impl Registry {
    /// Registry with built-in types and namespaces only (no disk access).
    pub fn builtin() -> Self {
        let mut namespaces = BTreeMap::new();
        for name in BUILTIN_NAMESPACES {
            namespaces.insert(
                name.to_string(),
                NamespaceEntry {
                    path: format!("SDLC-{name}"),
                },
            );
        }
        Self::from_namespaces(namespaces)
    }

    /// Builds the registry, merging persisted namespaces over the built-ins.
    pub fn load(project: &Project) -> Result<Self, QmsError> {
        let mut namespaces = Self::builtin().namespaces;
        let path = project.namespaces_path();
        if path.is_file() {
            let content = fs::read_to_string(&path).map_err(|e| QmsError::storage(&path, e))?;
            let persisted: BTreeMap<String, NamespaceEntry> =
                serde_json::from_str(&content).map_err(|e| QmsError::storage(&path, e))?;
            namespaces.extend(persisted);
        }
        Ok(Self::from_namespaces(namespaces))
    }

    fn from_namespaces(namespaces: BTreeMap<String, NamespaceEntry>) -> Self {
        let mut types = BTreeMap::new();
        for config in base_types() {
            types.insert(config.name.clone(), config);
        }
        for (name, entry) in &namespaces {
            for config in namespace_types(name, entry) {
                types.insert(config.name.clone(), config);
            }
        }
        Self { types, namespaces }
    }

    pub fn get(&self, doc_type: &str) -> Option<&TypeConfig> {
        self.types.get(doc_type)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeConfig> {
        self.types.values()
    }

    pub fn namespaces(&self) -> &BTreeMap<String, NamespaceEntry> {
        &self.namespaces
    }

    /// Registers a new namespace, persisting the custom (non-built-in)
    /// entries and creating the namespace directory.
    pub fn add_namespace(&mut self, project: &Project, name: &str) -> Result<(), QmsError> {
        let name = name.to_uppercase();
        if self.namespaces.contains_key(&name) {
            return Err(QmsError::Storage {
                message: format!("namespace '{name}' already exists"),
            });
        }
        let entry = NamespaceEntry {
            path: format!("SDLC-{name}"),
        };
        ensure_dir(&project.qms_root().join(&entry.path))?;
        self.namespaces.insert(name, entry);

        let custom: BTreeMap<&String, &NamespaceEntry> = self
            .namespaces
            .iter()
            .filter(|(n, _)| !BUILTIN_NAMESPACES.contains(&n.as_str()))
            .collect();
        let path = project.namespaces_path();
        ensure_dir(&project.meta_root())?;
        let content = serde_json::to_string_pretty(&custom)
            .map_err(|e| QmsError::storage(&path, e))?;
        fs::write(&path, content).map_err(|e| QmsError::storage(&path, e))?;

        *self = Self::from_namespaces(self.namespaces.clone());
        Ok(())
    }

    /// Infers the document type from an ID. Total over well-formed IDs;
    /// unknown patterns fail with `UnknownDocType`.
    pub fn infer_doc_type(&self, doc_id: &str) -> Result<&TypeConfig, QmsError> {
        let unknown = || QmsError::UnknownDocType {
            doc_id: doc_id.to_string(),
        };
        for name in self.namespaces.keys() {
            for suffix in ["RS", "RTM"] {
                if doc_id == format!("SDLC-{name}-{suffix}") {
                    let type_name = format!("{name}-{suffix}");
                    return self.types.get(&type_name).ok_or_else(unknown);
                }
            }
        }
        let numbered = |prefix: &str| {
            doc_id
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('-'))
                .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        };
        let name = if numbered("SOP") {
            "SOP"
        } else if doc_id.strip_prefix("TEMPLATE-").is_some_and(|n| !n.is_empty()) {
            "TEMPLATE"
        } else if doc_id.contains("-TP-ER-") {
            "ER"
        } else if doc_id.contains("-TP-") {
            "TP"
        } else if doc_id.contains("-VAR-") {
            "VAR"
        } else if numbered("CR") {
            "CR"
        } else if numbered("INV") {
            "INV"
        } else {
            return Err(unknown());
        };
        self.types.get(name).ok_or_else(unknown)
    }

    /// The leading `CR-NNN` / `INV-NNN` ancestor of a nested document ID.
    fn root_ancestor(doc_id: &str) -> Option<&str> {
        let re = Regex::new(r"^((?:CR|INV)-\d+)").ok()?;
        re.captures(doc_id)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Directory a document's files are stored in.
    fn storage_dir(&self, project: &Project, doc_id: &str) -> Result<PathBuf, QmsError> {
        let config = self.infer_doc_type(doc_id)?;
        let base = project.qms_root().join(&config.path);
        if config.folder_per_doc {
            return Ok(base.join(doc_id));
        }
        if config.parent_type.is_some() {
            let ancestor = Self::root_ancestor(doc_id).ok_or_else(|| QmsError::UnknownDocType {
                doc_id: doc_id.to_string(),
            })?;
            let ancestor_config = self.infer_doc_type(ancestor)?;
            return Ok(project
                .qms_root()
                .join(&ancestor_config.path)
                .join(ancestor));
        }
        Ok(base)
    }

    /// Path of the effective (`<id>.md`) or draft (`<id>-draft.md`) file.
    pub fn doc_path(
        &self,
        project: &Project,
        doc_id: &str,
        draft: bool,
    ) -> Result<PathBuf, QmsError> {
        let dir = self.storage_dir(project, doc_id)?;
        let file = if draft {
            format!("{doc_id}-draft.md")
        } else {
            format!("{doc_id}.md")
        };
        Ok(dir.join(file))
    }

    /// Archive location: `QMS/.archive/<type-path>[/<parent>]/<id>-v<version>.md`.
    pub fn archive_path(
        &self,
        project: &Project,
        doc_id: &str,
        version: &str,
    ) -> Result<PathBuf, QmsError> {
        let config = self.infer_doc_type(doc_id)?;
        let mut dir = project.archive_root();
        if config.parent_type.is_some() {
            let ancestor = Self::root_ancestor(doc_id).ok_or_else(|| QmsError::UnknownDocType {
                doc_id: doc_id.to_string(),
            })?;
            let ancestor_config = self.infer_doc_type(ancestor)?;
            dir = dir.join(&ancestor_config.path).join(ancestor);
        } else {
            dir = dir.join(&config.path);
        }
        Ok(dir.join(format!("{doc_id}-v{version}.md")))
    }

    /// Next free number for a flat or folder-per-doc type (`max + 1`).
    pub fn next_number(&self, project: &Project, doc_type: &str) -> Result<u32, QmsError> {
        let config = self.get(doc_type).ok_or_else(|| QmsError::UnknownDocType {
            doc_id: doc_type.to_string(),
        })?;
        let dir = project.qms_root().join(&config.path);
        Ok(max_entry_number(&dir, &config.prefix) + 1)
    }

    /// Next free number for a nested child, scanning the parent's folder for
    /// `{parent}-{child}-NNN` entries.
    pub fn next_nested_number(
        &self,
        project: &Project,
        parent_id: &str,
        child_type: &str,
    ) -> Result<u32, QmsError> {
        let ancestor = Self::root_ancestor(parent_id).unwrap_or(parent_id);
        let ancestor_config = self.infer_doc_type(ancestor)?;
        let dir = project
            .qms_root()
            .join(&ancestor_config.path)
            .join(ancestor);
        let prefix = format!("{ancestor}-{child_type}");
        Ok(max_entry_number(&dir, &prefix) + 1)
    }
}

/// Highest `{prefix}-NNN` number among a directory's entries (files or
/// folders; `-draft` and `.md` suffixes ignored). Zero when none exist.
fn max_entry_number(dir: &std::path::Path, prefix: &str) -> u32 {
    let mut max = 0;
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let base = name.strip_suffix(".md").unwrap_or(name);
        let base = base.strip_suffix("-draft").unwrap_or(base);
        let Some(rest) = base.strip_prefix(prefix).and_then(|r| r.strip_prefix('-')) else {
            continue;
        };
        if let Ok(n) = rest.parse::<u32>() {
            max = max.max(n);
        }
    }
    max
}
