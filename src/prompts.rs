//! Hierarchical prompt configuration for review and approval tasks.
//!
//! Task content is driven by YAML files under `prompts/`, keyed by
//! `(task type, workflow type, doc type)` with fallback order:
//!
//! 1. `prompts/<task>/<workflow_lower>/<doctype_lower>.yaml`
//! 2. `prompts/<task>/<workflow_lower>/default.yaml`
//! 3. `prompts/<task>/<doctype_lower>.yaml`
//! 4. `prompts/<task>/default.yaml`
//! 5. the embedded default configuration
//!
//! Configs are loaded once per lookup key and cached; the fallback lookup is
//! pure over the cached map.

use crate::project::Project;
use crate::workflow::WorkflowType;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_REVIEW_YAML: &str = include_str!("../prompts/review/default.yaml");
pub const DEFAULT_APPROVAL_YAML: &str = include_str!("../prompts/approval/default.yaml");

/// Kind of task a prompt is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Review,
    Approval,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Review => "REVIEW",
            TaskType::Approval => "APPROVAL",
        }
    }

    fn dir(&self) -> &'static str {
        match self {
            TaskType::Review => "review",
            TaskType::Approval => "approval",
        }
    }

    fn embedded(&self) -> &'static str {
        match self {
            TaskType::Review => DEFAULT_REVIEW_YAML,
            TaskType::Approval => DEFAULT_APPROVAL_YAML,
        }
    }
}

/// A single checklist row in a task prompt.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChecklistItem {
    pub category: String,
    pub item: String,
    #[serde(default)]
    pub evidence_prompt: String,
}

/// An extra free-form section appended to the rendered task.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PromptSection {
    pub title: String,
    pub content: String,
}

/// Configuration driving one task prompt.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PromptConfig {
    #[serde(default)]
    pub checklist_items: Vec<ChecklistItem>,
    #[serde(default)]
    pub critical_reminders: Vec<String>,
    #[serde(default)]
    pub additional_sections: Vec<PromptSection>,
}

/// Cached prompt-config lookup rooted at the project's `prompts/` directory.
pub struct PromptStore {
    dir: PathBuf,
    cache: HashMap<(TaskType, String, String), PromptConfig>,
}

impl PromptStore {
    pub fn new(project: &Project) -> Self {
        PromptStore {
            dir: project.prompts_dir(),
            cache: HashMap::new(),
        }
    }

    /// Resolves the configuration for a task, walking the fallback chain.
    pub fn config(
        &mut self,
        task: TaskType,
        workflow: WorkflowType,
        doc_type: &str,
    ) -> PromptConfig {
        let key = (task, workflow.lower(), doc_type.to_lowercase());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let (_, workflow_lower, doctype_lower) = &key;
        let base = self.dir.join(task.dir());
        let candidates = [
            base.join(workflow_lower).join(format!("{doctype_lower}.yaml")),
            base.join(workflow_lower).join("default.yaml"),
            base.join(format!("{doctype_lower}.yaml")),
            base.join("default.yaml"),
        ];
        let config = candidates
            .iter()
            .find_map(|path| load_file(path))
            .unwrap_or_else(|| embedded_config(task));
        self.cache.insert(key, config.clone());
        config
    }
}

fn load_file(path: &Path) -> Option<PromptConfig> {
    if !path.is_file() {
        return None;
    }
    let content = std::fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping malformed prompt config");
            None
        }
    }
}

fn embedded_config(task: TaskType) -> PromptConfig {
    serde_yaml::from_str(task.embedded())
        .expect("embedded prompt configuration is valid YAML")
}
