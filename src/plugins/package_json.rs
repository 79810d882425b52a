//! WG-007: package.json plugin — npm scripts become targets.

use super::*;

pub const PLUGIN_NAME: &str = "package-json";

/// Target group listing every script-derived target.
pub const SCRIPTS_GROUP: &str = "NPM Scripts";

/// Plugin options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJsonOptions {
    /// Prefix for script commands, e.g. `npm` → `npm run build`
    #[serde(default)]
    pub package_manager: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    scripts: IndexMap<String, String>,
    #[serde(default)]
    dependencies: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    peer_dependencies: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    nx: Option<NxSection>,
}

/// Graph settings embedded in a package manifest under `nx`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NxSection {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    included_scripts: Option<Vec<String>>,
    #[serde(default)]
    targets: IndexMap<String, TargetOverride>,
    #[serde(default)]
    implicit_dependencies: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    project_type: Option<ProjectType>,
}

/// Infers one project per package manifest.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageJsonPlugin;

impl InferencePlugin for PackageJsonPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn patterns(&self) -> Vec<String> {
        vec!["**/package.json".to_string()]
    }

    fn infer_nodes(
        &self,
        rel_path: &str,
        options: &serde_json::Value,
        ctx: &InferenceContext,
    ) -> Result<Contribution, PluginError> {
        let options: PackageJsonOptions = parse_options(options)?;
        let content = read_descriptor(ctx, rel_path)?;
        let manifest: PackageManifest = parse_json_descriptor(rel_path, &content)?;
        let root = project_root_of(rel_path);
        let project = build_project(&root, manifest, &options, ctx);

        let mut contribution = Contribution::default();
        contribution.projects.insert(root, project);
        Ok(contribution)
    }
}

fn script_command(options: &PackageJsonOptions, script: &str) -> String {
    match options.package_manager.as_deref() {
        Some(pm) if !pm.is_empty() => format!("{} run {}", pm, script),
        _ => format!("run {}", script),
    }
}

fn build_project(
    root: &str,
    manifest: PackageManifest,
    options: &PackageJsonOptions,
    ctx: &InferenceContext,
) -> ProjectNode {
    let nx = manifest.nx.unwrap_or_default();

    let included: Vec<&String> = manifest
        .scripts
        .keys()
        .filter(|script| {
            nx.included_scripts
                .as_ref()
                .is_none_or(|list| list.contains(*script))
        })
        .collect();

    let mut targets = IndexMap::new();
    for script in &included {
        let body = &manifest.scripts[script.as_str()];
        let mut spec = TargetSpec {
            command: Some(script_command(options, script)),
            cache: false,
            ..Default::default()
        };
        spec.metadata.insert(
            "scriptContent".to_string(),
            serde_json::Value::String(body.clone()),
        );
        targets.insert((*script).clone(), spec);
    }

    for (name, ov) in &nx.targets {
        let spec = targets.entry(name.clone()).or_default();
        *spec = ov.apply_to(std::mem::take(spec));
    }

    let mut metadata = ProjectMetadata::default();
    if !included.is_empty() {
        metadata.target_groups.insert(
            SCRIPTS_GROUP.to_string(),
            included.iter().map(|s| (*s).clone()).collect(),
        );
    }
    metadata.technologies.insert("npm".to_string());

    let mut dependencies = Vec::new();
    push_unique(
        &mut dependencies,
        manifest
            .dependencies
            .keys()
            .chain(manifest.dev_dependencies.keys())
            .chain(manifest.peer_dependencies.keys())
            .cloned(),
    );

    let name = nx
        .name
        .or(manifest.name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_project_name(root, ctx));

    ProjectNode {
        name,
        project_type: nx
            .project_type
            .or_else(|| infer_project_type(root, ctx.workspace_layout)),
        targets,
        metadata,
        implicit_dependencies: nx.implicit_dependencies,
        dependencies,
        tags: nx.tags,
    }
}
