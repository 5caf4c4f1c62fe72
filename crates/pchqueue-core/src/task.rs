//! PCH task types.
//!
//! A [`PchTask`] describes one pending precompiled header build. Tasks are
//! keyed by their project part ids: a project task carries exactly one id,
//! a system task carries every project part that shares the same system PCH.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::id::{ProjectPartId, ProjectPartIds, normalize_ids};

/// Source language of a project part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    #[default]
    Cxx,
}

/// A preprocessor definition passed to the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerMacro {
    pub key: String,
    #[serde(default)]
    pub value: String,
    /// Position in the original command line.
    #[serde(default)]
    pub index: usize,
}

/// Where an include search path came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeSearchPathKind {
    #[default]
    User,
    System,
    BuiltIn,
    Framework,
}

/// An include search path with its position in the search order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeSearchPath {
    pub path: PathBuf,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub kind: IncludeSearchPathKind,
}

/// One pending precompiled header build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PchTask {
    /// Sort and dedup key. One id for project tasks, the sharing set for
    /// system tasks.
    pub project_part_ids: ProjectPartIds,
    /// Headers that go into the PCH. Empty means the PCH should be deleted.
    #[serde(default)]
    pub includes: Vec<PathBuf>,
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub compiler_macros: Vec<CompilerMacro>,
    #[serde(default)]
    pub system_include_search_paths: Vec<IncludeSearchPath>,
    #[serde(default)]
    pub project_include_search_paths: Vec<IncludeSearchPath>,
    #[serde(default)]
    pub toolchain_arguments: Vec<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub language_version: Option<String>,
    #[serde(default)]
    pub language_extension: Option<String>,
    /// System PCH a project task builds on. Filled in right before
    /// generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_pch_path: Option<PathBuf>,
    /// Filled in right before generation.
    #[serde(default)]
    pub pre_include_search_path: String,
}

impl PchTask {
    /// Create a task keyed by a single project part.
    pub fn project(id: ProjectPartId, includes: Vec<PathBuf>) -> Self {
        Self::with_ids(vec![id], includes)
    }

    /// Create a task shared by several project parts. The ids are sorted and
    /// deduplicated.
    pub fn system(mut ids: ProjectPartIds, includes: Vec<PathBuf>) -> Self {
        normalize_ids(&mut ids);
        Self::with_ids(ids, includes)
    }

    fn with_ids(project_part_ids: ProjectPartIds, includes: Vec<PathBuf>) -> Self {
        Self {
            project_part_ids,
            includes,
            sources: Vec::new(),
            compiler_macros: Vec::new(),
            system_include_search_paths: Vec::new(),
            project_include_search_paths: Vec::new(),
            toolchain_arguments: Vec::new(),
            language: Language::default(),
            language_version: None,
            language_extension: None,
            system_pch_path: None,
            pre_include_search_path: String::new(),
        }
    }

    /// The key this task is sorted and deduplicated by.
    pub fn key(&self) -> &[ProjectPartId] {
        &self.project_part_ids
    }

    /// The first project part id. For project tasks this is the task's own id.
    pub fn project_part_id(&self) -> Option<ProjectPartId> {
        self.project_part_ids.first().copied()
    }

    /// Whether running this task only deletes the stored PCH.
    pub fn is_deletion(&self) -> bool {
        self.includes.is_empty()
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_compiler_macros(mut self, macros: Vec<CompilerMacro>) -> Self {
        self.compiler_macros = macros;
        self
    }

    pub fn with_toolchain_arguments(mut self, arguments: Vec<String>) -> Self {
        self.toolchain_arguments = arguments;
        self
    }

    pub fn with_language(mut self, language: Language, version: Option<String>) -> Self {
        self.language = language;
        self.language_version = version;
        self
    }
}

/// Pending tasks, sorted ascending by key with unique keys.
pub type PchTasks = Vec<PchTask>;
