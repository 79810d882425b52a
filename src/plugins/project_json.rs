//! WG-009: project.json plugin — explicit project definitions.

use super::*;

pub const PLUGIN_NAME: &str = "project-json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    project_type: Option<ProjectType>,
    #[serde(default)]
    targets: IndexMap<String, TargetOverride>,
    #[serde(default)]
    implicit_dependencies: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    metadata: ManifestMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestMetadata {
    #[serde(default)]
    target_groups: IndexMap<String, Vec<String>>,
    #[serde(default)]
    technologies: Vec<String>,
}

/// Reads `project.json` files verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectJsonPlugin;

impl InferencePlugin for ProjectJsonPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn patterns(&self) -> Vec<String> {
        vec!["**/project.json".to_string()]
    }

    fn infer_nodes(
        &self,
        rel_path: &str,
        _options: &serde_json::Value,
        ctx: &InferenceContext,
    ) -> Result<Contribution, PluginError> {
        let content = read_descriptor(ctx, rel_path)?;
        let manifest: ProjectManifest = parse_json_descriptor(rel_path, &content)?;
        let root = project_root_of(rel_path);

        let targets = manifest
            .targets
            .iter()
            .map(|(name, ov)| (name.clone(), ov.apply_to(TargetSpec::default())))
            .collect();

        let project = ProjectNode {
            name: manifest
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| default_project_name(&root, ctx)),
            project_type: manifest
                .project_type
                .or_else(|| infer_project_type(&root, ctx.workspace_layout)),
            targets,
            metadata: ProjectMetadata {
                target_groups: manifest.metadata.target_groups,
                technologies: manifest.metadata.technologies.into_iter().collect(),
            },
            implicit_dependencies: manifest.implicit_dependencies,
            dependencies: Vec::new(),
            tags: manifest.tags,
        };

        let mut contribution = Contribution::default();
        contribution.projects.insert(root, project);
        Ok(contribution)
    }
}
