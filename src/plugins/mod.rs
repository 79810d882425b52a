//! WG-006: Inference plugins — contract, registry, shared helpers.
//!
//! A plugin is a set of glob patterns plus a pure inference function.
//! The registry maps the fixed list of plugin kinds to implementations;
//! registration order from `wsgraph.yaml` is merge precedence.

pub mod gradle;
pub mod package_json;
pub mod project_json;

use crate::cache::hasher;
use crate::core::types::*;
use crate::error::{GraphError, GraphResult, PluginError};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

/// Every plugin kind the registry can construct.
pub const PLUGIN_KINDS: &[&str] = &[
    project_json::PLUGIN_NAME,
    package_json::PLUGIN_NAME,
    gradle::PLUGIN_NAME,
];

/// Read-only shared context handed to every inference call.
#[derive(Debug, Clone, Copy)]
pub struct InferenceContext<'a> {
    pub workspace_root: &'a Path,
    pub named_inputs: &'a IndexMap<String, Vec<String>>,
    pub workspace_layout: &'a WorkspaceLayout,
}

impl<'a> InferenceContext<'a> {
    pub fn new(workspace_root: &'a Path, config: &'a WorkspaceConfig) -> Self {
        Self {
            workspace_root,
            named_inputs: &config.named_inputs,
            workspace_layout: &config.workspace_layout,
        }
    }

    /// Workspace directory name, used to name the root project.
    pub fn workspace_name(&self) -> String {
        self.workspace_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "root".to_string())
    }
}

/// The plugin contract.
///
/// `infer_nodes` must be referentially transparent: the same descriptor
/// content, options and context fingerprint must always produce the same
/// contribution. The inference cache relies on this and cannot detect
/// violations.
pub trait InferencePlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Glob patterns (relative to the workspace root) selecting descriptor files.
    fn patterns(&self) -> Vec<String>;

    /// The slice of shared context this plugin's output depends on. Part of
    /// every inference key the plugin produces.
    fn context_fingerprint(&self, ctx: &InferenceContext) -> String {
        default_fingerprint(ctx)
    }

    fn infer_nodes(
        &self,
        rel_path: &str,
        options: &serde_json::Value,
        ctx: &InferenceContext,
    ) -> Result<Contribution, PluginError>;
}

/// A plugin in registration order, with its options.
pub struct RegisteredPlugin {
    pub plugin: Box<dyn InferencePlugin>,
    pub options: serde_json::Value,
}

impl RegisteredPlugin {
    pub fn new(plugin: impl InferencePlugin + 'static, options: serde_json::Value) -> Self {
        Self {
            plugin: Box::new(plugin),
            options,
        }
    }

    pub fn name(&self) -> &str {
        self.plugin.name()
    }
}

impl std::fmt::Debug for RegisteredPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredPlugin")
            .field("name", &self.name())
            .field("options", &self.options)
            .finish()
    }
}

/// Construct the configured plugins in registration order.
pub fn build_plugins(
    config: &WorkspaceConfig,
    workspace_root: &Path,
) -> GraphResult<Vec<RegisteredPlugin>> {
    let mut plugins = Vec::with_capacity(config.plugins.len());
    for entry in &config.plugins {
        let options = entry.options.clone();
        let registered = match entry.plugin.as_str() {
            project_json::PLUGIN_NAME => {
                RegisteredPlugin::new(project_json::ProjectJsonPlugin, options)
            }
            package_json::PLUGIN_NAME => {
                RegisteredPlugin::new(package_json::PackageJsonPlugin, options)
            }
            gradle::PLUGIN_NAME => RegisteredPlugin::new(
                gradle::GradlePlugin::load(workspace_root, &options)?,
                options,
            ),
            other => return Err(GraphError::UnknownPlugin(other.to_string())),
        };
        plugins.push(registered);
    }
    Ok(plugins)
}

/// Fingerprint of the context every plugin may read: named inputs,
/// workspace layout and the workspace directory name (which names a
/// root project that declares no name of its own).
pub fn default_fingerprint(ctx: &InferenceContext) -> String {
    let value = serde_json::json!({
        "named_inputs": ctx.named_inputs,
        "workspace_layout": ctx.workspace_layout,
        "workspace_name": ctx.workspace_name(),
    });
    hasher::hash_string(&hasher::canonical_json(&value))
}

/// Deserialize plugin options; `null` means all defaults.
pub fn parse_options<T: DeserializeOwned + Default>(
    options: &serde_json::Value,
) -> Result<T, PluginError> {
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options.clone())
        .map_err(|e| PluginError::Malformed(format!("invalid options: {}", e)))
}

/// Directory of a descriptor, `"."` for the workspace root.
pub fn project_root_of(rel_path: &str) -> String {
    match rel_path.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => ".".to_string(),
    }
}

/// Last path segment of a project root; the workspace name for `"."`.
pub fn default_project_name(root: &str, ctx: &InferenceContext) -> String {
    if root == "." {
        return ctx.workspace_name();
    }
    root.rsplit('/').next().unwrap_or(root).to_string()
}

/// Read a descriptor file as UTF-8.
pub fn read_descriptor(ctx: &InferenceContext, rel_path: &str) -> Result<String, PluginError> {
    std::fs::read_to_string(ctx.workspace_root.join(rel_path)).map_err(|e| PluginError::Read {
        path: rel_path.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a JSON descriptor into a manifest type.
pub fn parse_json_descriptor<T: DeserializeOwned>(
    rel_path: &str,
    content: &str,
) -> Result<T, PluginError> {
    serde_json::from_str(content).map_err(|e| PluginError::Parse {
        path: rel_path.to_string(),
        reason: e.to_string(),
    })
}

/// Classify a project root against the workspace layout.
///
/// When apps and libs share a directory everything under it is a library;
/// otherwise the apps directory wins over the libs directory.
pub fn infer_project_type(root: &str, layout: &WorkspaceLayout) -> Option<ProjectType> {
    let under = |dir: &str| {
        let dir = dir.trim_end_matches('/');
        dir.is_empty() || root == dir || root.starts_with(&format!("{}/", dir))
    };
    if let (Some(apps), Some(libs)) = (&layout.apps_dir, &layout.libs_dir) {
        if apps == libs {
            return under(libs).then_some(ProjectType::Library);
        }
    }
    if let Some(apps) = layout.apps_dir.as_deref().filter(|d| !d.is_empty()) {
        if under(apps) {
            return Some(ProjectType::Application);
        }
    }
    if let Some(libs) = layout.libs_dir.as_deref().filter(|d| !d.is_empty()) {
        if under(libs) {
            return Some(ProjectType::Library);
        }
    }
    None
}

/// A partial target definition from a descriptor. Fields that are present
/// replace the inferred value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOverride {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub executor: Option<String>,
    #[serde(default)]
    pub cache: Option<bool>,
    #[serde(default)]
    pub inputs: Option<Vec<String>>,
    #[serde(default)]
    pub outputs: Option<Vec<String>>,
    #[serde(default)]
    pub depends_on: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<IndexMap<String, serde_json::Value>>,
}

impl TargetOverride {
    pub fn apply_to(&self, mut base: TargetSpec) -> TargetSpec {
        if let Some(ref command) = self.command {
            base.command = Some(command.clone());
        }
        if let Some(ref executor) = self.executor {
            base.executor = Some(executor.clone());
        }
        if let Some(cache) = self.cache {
            base.cache = cache;
        }
        if let Some(ref inputs) = self.inputs {
            base.inputs = inputs.clone();
        }
        if let Some(ref outputs) = self.outputs {
            base.outputs = Some(outputs.clone());
        }
        if let Some(ref depends_on) = self.depends_on {
            base.depends_on = depends_on.clone();
        }
        if let Some(ref metadata) = self.metadata {
            for (k, v) in metadata {
                base.metadata.insert(k.clone(), v.clone());
            }
        }
        base
    }
}

/// Append items not already present, preserving first-appearance order.
pub fn push_unique(list: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !list.contains(&item) {
            list.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(apps: Option<&str>, libs: Option<&str>) -> WorkspaceLayout {
        WorkspaceLayout {
            apps_dir: apps.map(String::from),
            libs_dir: libs.map(String::from),
        }
    }

    #[test]
    fn test_wg006_project_root_of() {
        assert_eq!(project_root_of("package.json"), ".");
        assert_eq!(project_root_of("packages/lib-b/package.json"), "packages/lib-b");
    }

    #[test]
    fn test_wg006_type_apps_and_libs() {
        let l = layout(Some("apps"), Some("packages"));
        assert_eq!(
            infer_project_type("apps/myapp", &l),
            Some(ProjectType::Application)
        );
        assert_eq!(
            infer_project_type("packages/mylib", &l),
            Some(ProjectType::Library)
        );
        assert_eq!(infer_project_type("tools/x", &l), None);
    }

    #[test]
    fn test_wg006_type_both_empty_is_library() {
        let l = layout(Some(""), Some(""));
        assert_eq!(infer_project_type(".", &l), Some(ProjectType::Library));
    }

    #[test]
    fn test_wg006_type_only_libs() {
        let l = layout(None, Some("packages"));
        assert_eq!(
            infer_project_type("packages/mylib", &l),
            Some(ProjectType::Library)
        );
        assert_eq!(infer_project_type("example", &l), None);
    }

    #[test]
    fn test_wg006_type_prefix_is_path_aware() {
        let l = layout(Some("apps"), None);
        assert_eq!(infer_project_type("apps-legacy/x", &l), None);
    }

    #[test]
    fn test_wg006_no_layout_no_type() {
        assert_eq!(infer_project_type("packages/a", &WorkspaceLayout::default()), None);
    }

    #[test]
    fn test_wg006_override_applies_present_fields() {
        let base = TargetSpec {
            command: Some("run build".to_string()),
            cache: false,
            ..Default::default()
        };
        let ov: TargetOverride =
            serde_json::from_str(r#"{"outputs": ["{projectRoot}/dist"], "cache": true}"#).unwrap();
        let merged = ov.apply_to(base);
        assert_eq!(merged.command.as_deref(), Some("run build"));
        assert!(merged.cache);
        assert_eq!(merged.outputs, Some(vec!["{projectRoot}/dist".to_string()]));
    }

    #[test]
    fn test_wg006_parse_options_null_is_default() {
        #[derive(Debug, Default, Deserialize, PartialEq)]
        struct Opts {
            #[serde(default)]
            flag: bool,
        }
        let o: Opts = parse_options(&serde_json::Value::Null).unwrap();
        assert_eq!(o, Opts::default());
        let err = parse_options::<Opts>(&serde_json::json!({"flag": "nope"})).unwrap_err();
        assert!(matches!(err, PluginError::Malformed(_)));
    }

    #[test]
    fn test_wg006_push_unique() {
        let mut v = vec!["a".to_string()];
        push_unique(&mut v, ["b".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(v, vec!["a", "b"]);
    }

    #[test]
    fn test_wg006_build_plugins_default_order() {
        let dir = tempfile::tempdir().unwrap();
        let plugins = build_plugins(&WorkspaceConfig::default(), dir.path()).unwrap();
        let names: Vec<_> = plugins.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["project-json", "package-json", "gradle"]);
    }

    #[test]
    fn test_wg006_build_plugins_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorkspaceConfig::default();
        config.plugins = vec![PluginEntry {
            plugin: "bazel".to_string(),
            options: serde_json::Value::Null,
        }];
        let err = build_plugins(&config, dir.path()).unwrap_err();
        assert!(matches!(err, GraphError::UnknownPlugin(_)));
    }

    #[test]
    fn test_wg006_fingerprint_tracks_workspace_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkspaceConfig::default();
        let alpha = dir.path().join("alpha");
        let beta = dir.path().join("beta");
        assert_ne!(
            default_fingerprint(&InferenceContext::new(&alpha, &config)),
            default_fingerprint(&InferenceContext::new(&beta, &config))
        );
    }

    #[test]
    fn test_wg006_fingerprint_tracks_named_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorkspaceConfig::default();
        let fp1 = default_fingerprint(&InferenceContext::new(dir.path(), &config));
        config
            .named_inputs
            .insert("production".to_string(), vec!["default".to_string()]);
        let fp2 = default_fingerprint(&InferenceContext::new(dir.path(), &config));
        assert_ne!(fp1, fp2);
    }
}
