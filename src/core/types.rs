//! WG-001: Graph and workspace types.
//!
//! Defines the workspace configuration schema (`wsgraph.yaml`), the
//! project/target node types plugins produce, and the merged graph handed
//! to downstream schedulers. All types derive Serialize/Deserialize so they
//! roundtrip through the cache file and the `graph --json` output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Workspace configuration (wsgraph.yaml)
// ============================================================================

/// Root workspace configuration. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Schema version (must be "1.0")
    #[serde(default = "default_version")]
    pub version: String,

    /// Workspace-wide named input presets (e.g. `default`, `production`)
    #[serde(default)]
    pub named_inputs: IndexMap<String, Vec<String>>,

    /// Directory conventions used for project-type inference
    #[serde(default)]
    pub workspace_layout: WorkspaceLayout,

    /// Plugins in precedence order (earlier wins on merge)
    #[serde(default = "default_plugins")]
    pub plugins: Vec<PluginEntry>,

    /// Inference cache policy
    #[serde(default)]
    pub cache: CachePolicy,

    /// Extra glob patterns excluded from descriptor discovery
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            named_inputs: IndexMap::new(),
            workspace_layout: WorkspaceLayout::default(),
            plugins: default_plugins(),
            cache: CachePolicy::default(),
            exclude: Vec::new(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_plugins() -> Vec<PluginEntry> {
    ["project-json", "package-json", "gradle"]
        .iter()
        .map(|name| PluginEntry {
            plugin: name.to_string(),
            options: serde_json::Value::Null,
        })
        .collect()
}

/// Directory conventions for apps and libraries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceLayout {
    #[serde(default)]
    pub apps_dir: Option<String>,

    #[serde(default)]
    pub libs_dir: Option<String>,
}

/// A registered plugin and its opaque options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginEntry {
    /// Plugin kind (e.g. "package-json")
    pub plugin: String,

    /// Plugin-specific options, passed through untouched
    #[serde(default)]
    pub options: serde_json::Value,
}

/// Inference cache policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory, relative to the workspace root
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> String {
    ".wsgraph/cache".to_string()
}

// ============================================================================
// Projects and targets
// ============================================================================

/// Project classification inferred from path conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Library,
    Application,
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Application => write!(f, "application"),
        }
    }
}

/// An inferred project. Identified by its root path, which is the key of
/// the map that holds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectNode {
    /// Display name, unique across the workspace
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,

    #[serde(default)]
    pub targets: IndexMap<String, TargetSpec>,

    #[serde(default)]
    pub metadata: ProjectMetadata,

    /// Project names this project depends on without a package reference
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implicit_dependencies: Vec<String>,

    /// Declared package dependencies (may name packages outside the workspace)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Free-form project metadata that has merge semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    /// Group label → ordered target names
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub target_groups: IndexMap<String, Vec<String>>,

    /// Tool tags (set semantics)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub technologies: BTreeSet<String>,
}

/// An execution descriptor. Never executed by this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,

    /// Whether outputs may be restored from a task cache
    #[serde(default)]
    pub cache: bool,

    /// Named input references, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,

    /// Output path templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<String>>,

    /// Symbolic dependency tokens (see [`DependsOn`])
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, serde_json::Value>,
}

/// A parsed `dependsOn` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependsOn {
    /// `build` — a target in the same project
    SameProject(String),
    /// `^build` — the same-named target in every direct dependency
    Upstream(String),
    /// `lib-a:build` — an explicit project/target pair
    Project { project: String, target: String },
}

impl DependsOn {
    /// Parse a token. Never fails; an unusual token becomes a same-project
    /// reference that later resolves (or warns) like any other.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if let Some(target) = token.strip_prefix('^') {
            return Self::Upstream(target.to_string());
        }
        if let Some((project, target)) = token.split_once(':') {
            if !project.is_empty() && !target.is_empty() {
                return Self::Project {
                    project: project.to_string(),
                    target: target.to_string(),
                };
            }
        }
        Self::SameProject(token.to_string())
    }
}

impl fmt::Display for DependsOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameProject(t) => write!(f, "{}", t),
            Self::Upstream(t) => write!(f, "^{}", t),
            Self::Project { project, target } => write!(f, "{}:{}", project, target),
        }
    }
}

/// What one plugin inferred from one descriptor file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// Project root → project, rooted at (or near) the descriptor
    #[serde(default)]
    pub projects: IndexMap<String, ProjectNode>,

    /// Synthetic umbrella projects; added only when the root is unclaimed
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parent_projects: IndexMap<String, ProjectNode>,
}

impl Contribution {
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty() && self.parent_projects.is_empty()
    }
}

// ============================================================================
// Merged graph
// ============================================================================

/// A (project name, target name) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId {
    pub project: String,
    pub target: String,
}

impl TargetId {
    pub fn new(project: &str, target: &str) -> Self {
        Self {
            project: project.to_string(),
            target: target.to_string(),
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.target)
    }
}

/// `from` must run after `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetEdge {
    pub from: TargetId,
    pub to: TargetId,
}

/// Project `from` depends on project `to` (by name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectEdge {
    pub from: String,
    pub to: String,
}

/// A non-fatal condition observed during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    PluginFailure {
        plugin: String,
        file: String,
        message: String,
    },
    CacheUnavailable {
        path: String,
        reason: String,
    },
    MergeConflict {
        root: String,
        target: String,
        kept: String,
        dropped: String,
    },
    ParentDropped {
        root: String,
        name: String,
        plugin: String,
    },
    UnresolvedDependency {
        project: String,
        target: String,
        token: String,
        reason: String,
    },
    UnknownProjectDependency {
        project: String,
        dependency: String,
    },
    DuplicateProjectName {
        name: String,
        root: String,
        kept: String,
    },
}

impl Diagnostic {
    /// Warnings are conditions a user may want to fix; the rest are
    /// informational.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::PluginFailure { .. }
                | Self::CacheUnavailable { .. }
                | Self::UnresolvedDependency { .. }
                | Self::UnknownProjectDependency { .. }
                | Self::DuplicateProjectName { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PluginFailure {
                plugin,
                file,
                message,
            } => write!(f, "plugin {} failed on {}: {}", plugin, file, message),
            Self::CacheUnavailable { path, reason } => {
                write!(f, "cache {} unavailable: {}", path, reason)
            }
            Self::MergeConflict {
                root,
                target,
                kept,
                dropped,
            } => write!(
                f,
                "{}: target '{}' from {} kept over {}",
                root, target, kept, dropped
            ),
            Self::ParentDropped { root, name, plugin } => write!(
                f,
                "{}: parent project '{}' from {} dropped (root already claimed)",
                root, name, plugin
            ),
            Self::UnresolvedDependency {
                project,
                target,
                token,
                reason,
            } => write!(
                f,
                "{}:{} dependsOn '{}' unresolved: {}",
                project, target, token, reason
            ),
            Self::UnknownProjectDependency {
                project,
                dependency,
            } => write!(
                f,
                "{}: implicit dependency '{}' is not a known project",
                project, dependency
            ),
            Self::DuplicateProjectName { name, root, kept } => write!(
                f,
                "{}: project name '{}' already used by {}; its dependencies are not resolved",
                root, name, kept
            ),
        }
    }
}

/// Counters for one graph build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub files_matched: u32,
    pub cache_hits: u32,
    pub computed: u32,
    pub failed: u32,
}

/// The fully merged graph handed to downstream schedulers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectGraph {
    /// Project root → project, sorted by root
    pub projects: IndexMap<String, ProjectNode>,
    pub project_edges: Vec<ProjectEdge>,
    pub target_edges: Vec<TargetEdge>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: BuildStats,
}

impl ProjectGraph {
    /// Find a project by display name. Returns (root, node).
    pub fn project_by_name(&self, name: &str) -> Option<(&str, &ProjectNode)> {
        self.projects
            .iter()
            .find(|(_, p)| p.name == name)
            .map(|(root, p)| (root.as_str(), p))
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }
}
