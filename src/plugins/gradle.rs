//! WG-008: Gradle plugin — tasks from a precomputed Gradle report.
//!
//! The report is produced by an external Gradle invocation and consumed
//! here as opaque JSON. It is loaded once when the plugin is constructed;
//! its digest is part of the context fingerprint so a new report
//! invalidates every Gradle inference key.

use super::*;
use serde::Serialize;

pub const PLUGIN_NAME: &str = "gradle";

/// Default report location, relative to the workspace root.
pub const DEFAULT_REPORT_FILE: &str = "build/wsgraph/gradle-report.json";

const CACHEABLE_TASK_TYPES: &[&str] = &["Build", "Verification"];

/// Project/task structure exported from Gradle. Paths are relative to the
/// workspace root; Gradle project paths look like `:app`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradleReport {
    /// Build file → Gradle project path
    #[serde(default)]
    pub gradle_file_to_project: IndexMap<String, String>,

    /// Gradle project path → project name
    #[serde(default)]
    pub project_names: IndexMap<String, String>,

    /// Gradle project path → task name → task type
    #[serde(default)]
    pub project_tasks: IndexMap<String, IndexMap<String, String>>,

    /// Build file → task name → output directory
    #[serde(default)]
    pub output_dirs: IndexMap<String, IndexMap<String, String>>,

    /// Sub-project name → parent (settings-level) project name
    #[serde(default)]
    pub sub_project_parents: IndexMap<String, String>,

    /// Project name → settings file declaring it
    #[serde(default)]
    pub settings_files: IndexMap<String, String>,
}

/// Loads the report for a workspace.
pub fn load_report(path: &Path) -> Result<(GradleReport, String), String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let report = serde_json::from_str(&content)
        .map_err(|e| format!("invalid gradle report {}: {}", path.display(), e))?;
    Ok((report, hasher::hash_string(&content)))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GradleSetupOptions {
    #[serde(default)]
    report_file: Option<String>,
}

/// Infers projects from `build.gradle` / `build.gradle.kts`.
#[derive(Debug, Clone)]
pub struct GradlePlugin {
    /// The loaded report and its digest, or why it is unavailable
    report: Result<(GradleReport, String), String>,
}

impl GradlePlugin {
    /// Construct from options. A missing or invalid report is not a setup
    /// failure: each Gradle descriptor reports it individually.
    pub fn load(workspace_root: &Path, options: &serde_json::Value) -> GraphResult<Self> {
        let setup: GradleSetupOptions =
            parse_options(options).map_err(|e| GraphError::PluginSetup {
                plugin: PLUGIN_NAME.to_string(),
                reason: e.to_string(),
            })?;
        let rel = setup
            .report_file
            .unwrap_or_else(|| DEFAULT_REPORT_FILE.to_string());
        Ok(Self {
            report: load_report(&workspace_root.join(rel)),
        })
    }

    /// Construct around an in-memory report.
    pub fn with_report(report: GradleReport) -> Self {
        let digest = serde_json::to_string(&report)
            .map(|s| hasher::hash_string(&s))
            .unwrap_or_default();
        Self {
            report: Ok((report, digest)),
        }
    }
}

impl InferencePlugin for GradlePlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn patterns(&self) -> Vec<String> {
        vec!["**/build.{gradle.kts,gradle}".to_string()]
    }

    fn context_fingerprint(&self, ctx: &InferenceContext) -> String {
        let report = match &self.report {
            Ok((_, digest)) => digest.as_str(),
            Err(_) => "no-report",
        };
        hasher::composite_hash(&[&default_fingerprint(ctx), report])
    }

    fn infer_nodes(
        &self,
        rel_path: &str,
        options: &serde_json::Value,
        ctx: &InferenceContext,
    ) -> Result<Contribution, PluginError> {
        let (report, _) = self
            .report
            .as_ref()
            .map_err(|reason| PluginError::MissingReport(reason.clone()))?;

        let Some(gradle_project) = report.gradle_file_to_project.get(rel_path) else {
            return Ok(Contribution::default());
        };
        let Some(project_name) = report.project_names.get(gradle_project) else {
            return Ok(Contribution::default());
        };

        let root = project_root_of(rel_path);
        let empty = IndexMap::new();
        let tasks = report.project_tasks.get(gradle_project).unwrap_or(&empty);
        let outputs = report.output_dirs.get(rel_path).unwrap_or(&empty);
        let (targets, target_groups) =
            create_targets(tasks, outputs, gradle_project, options, ctx);

        let mut metadata = ProjectMetadata {
            target_groups,
            ..Default::default()
        };
        metadata.technologies.insert(PLUGIN_NAME.to_string());

        let mut contribution = Contribution::default();
        contribution.projects.insert(
            root.clone(),
            ProjectNode {
                name: project_name.clone(),
                project_type: infer_project_type(&root, ctx.workspace_layout),
                targets,
                metadata,
                ..Default::default()
            },
        );

        if let Some((parent_root, parent)) = parent_project(report, project_name) {
            contribution.parent_projects.insert(parent_root, parent);
        }
        Ok(contribution)
    }
}

/// The settings-level umbrella project, when it is not itself a build
/// file project and its settings file is known.
fn parent_project(report: &GradleReport, project_name: &str) -> Option<(String, ProjectNode)> {
    let parent_name = report.sub_project_parents.get(project_name)?;
    if report.project_names.values().any(|n| n == parent_name) {
        return None;
    }
    let settings_file = report.settings_files.get(parent_name)?;
    let mut node = ProjectNode {
        name: parent_name.clone(),
        ..Default::default()
    };
    node.metadata.technologies.insert(PLUGIN_NAME.to_string());
    Some((project_root_of(settings_file), node))
}

fn gradle_exec_file() -> &'static str {
    if cfg!(windows) {
        ".\\gradlew.bat"
    } else {
        "./gradlew"
    }
}

/// Target name for a task, honoring `<task>TargetName` options.
fn target_name(options: &serde_json::Value, task: &str) -> String {
    options
        .get(format!("{}TargetName", task))
        .and_then(serde_json::Value::as_str)
        .unwrap_or(task)
        .to_string()
}

fn depends_on_for(task: &str) -> &'static [&'static str] {
    match task {
        "build" => &["^build", "classes"],
        "test" => &["classes"],
        "classes" => &["^classes"],
        _ => &[],
    }
}

fn inputs_for(task: &str, named_inputs: &IndexMap<String, Vec<String>>) -> Vec<String> {
    let production = named_inputs.contains_key("production");
    let pair = |name: &str| vec![name.to_string(), format!("^{}", name)];
    match (task, production) {
        ("build" | "classes", true) => pair("production"),
        ("build" | "classes", false) => pair("default"),
        ("test", true) => vec!["default".to_string(), "^production".to_string()],
        ("test", false) => pair("default"),
        _ => Vec::new(),
    }
}

type Targets = (IndexMap<String, TargetSpec>, IndexMap<String, Vec<String>>);

fn create_targets(
    tasks: &IndexMap<String, String>,
    outputs: &IndexMap<String, String>,
    gradle_project: &str,
    options: &serde_json::Value,
    ctx: &InferenceContext,
) -> Targets {
    let mut targets = IndexMap::new();
    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    let project_prefix = gradle_project.trim_end_matches(':');

    for (task, task_type) in tasks {
        let name = target_name(options, task);
        // dependsOn tokens follow target renames so `classes` still resolves
        // when exposed under another name.
        let depends_on = depends_on_for(task)
            .iter()
            .map(|token| match token.strip_prefix('^') {
                Some(t) => format!("^{}", target_name(options, t)),
                None => target_name(options, token),
            })
            .collect();
        let command = if gradle_project.is_empty() {
            format!("{} {}", gradle_exec_file(), task)
        } else {
            format!("{} {}:{}", gradle_exec_file(), project_prefix, task)
        };

        let mut spec = TargetSpec {
            command: Some(command),
            cache: CACHEABLE_TASK_TYPES.contains(&task_type.as_str()),
            inputs: inputs_for(task, ctx.named_inputs),
            outputs: outputs.get(task).map(|dir| vec![dir.clone()]),
            depends_on,
            ..Default::default()
        };
        spec.metadata.insert(
            "technologies".to_string(),
            serde_json::json!([PLUGIN_NAME]),
        );
        targets.insert(name.clone(), spec);
        groups.entry(task_type.clone()).or_default().push(name);
    }
    (targets, groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> GradleReport {
        serde_json::from_value(json!({
            "gradle_file_to_project": {
                "app/build.gradle.kts": ":app",
                "lib/build.gradle": ":lib",
                "orphan/build.gradle": ":orphan"
            },
            "project_names": {":app": "app", ":lib": "lib"},
            "project_tasks": {
                ":app": {"build": "Build", "test": "Verification", "classes": "Build", "run": "Application"},
                ":lib": {"build": "Build"}
            },
            "output_dirs": {"app/build.gradle.kts": {"build": "{projectRoot}/build"}},
            "sub_project_parents": {"app": "umbrella", "lib": "umbrella"},
            "settings_files": {"umbrella": "settings.gradle.kts"}
        }))
        .unwrap()
    }

    fn infer(
        plugin: &GradlePlugin,
        config: &WorkspaceConfig,
        rel: &str,
        options: serde_json::Value,
    ) -> Result<Contribution, PluginError> {
        let dir = std::env::temp_dir();
        let ctx = InferenceContext::new(&dir, config);
        plugin.infer_nodes(rel, &options, &ctx)
    }

    #[test]
    fn test_wg008_targets_from_tasks() {
        let plugin = GradlePlugin::with_report(report());
        let c = infer(
            &plugin,
            &WorkspaceConfig::default(),
            "app/build.gradle.kts",
            json!(null),
        )
        .unwrap();
        let p = &c.projects["app"];
        assert_eq!(p.name, "app");
        assert_eq!(p.targets.len(), 4);
        let build = &p.targets["build"];
        if !cfg!(windows) {
            assert_eq!(build.command.as_deref(), Some("./gradlew :app:build"));
        }
        assert!(build.cache);
        assert_eq!(build.depends_on, vec!["^build", "classes"]);
        assert_eq!(build.inputs, vec!["default", "^default"]);
        assert_eq!(build.outputs, Some(vec!["{projectRoot}/build".to_string()]));
        assert!(!p.targets["run"].cache);
        assert_eq!(p.targets["test"].depends_on, vec!["classes"]);
        assert!(p.metadata.technologies.contains("gradle"));
    }

    #[test]
    fn test_wg008_groups_by_task_type() {
        let plugin = GradlePlugin::with_report(report());
        let c = infer(
            &plugin,
            &WorkspaceConfig::default(),
            "app/build.gradle.kts",
            json!(null),
        )
        .unwrap();
        let groups = &c.projects["app"].metadata.target_groups;
        assert_eq!(groups["Build"], vec!["build", "classes"]);
        assert_eq!(groups["Verification"], vec!["test"]);
        assert_eq!(groups["Application"], vec!["run"]);
    }

    #[test]
    fn test_wg008_production_inputs() {
        let plugin = GradlePlugin::with_report(report());
        let mut config = WorkspaceConfig::default();
        config
            .named_inputs
            .insert("production".to_string(), vec!["default".to_string()]);
        let c = infer(&plugin, &config, "app/build.gradle.kts", json!(null)).unwrap();
        let p = &c.projects["app"];
        assert_eq!(p.targets["build"].inputs, vec!["production", "^production"]);
        assert_eq!(p.targets["test"].inputs, vec!["default", "^production"]);
    }

    #[test]
    fn test_wg008_target_rename_option() {
        let plugin = GradlePlugin::with_report(report());
        let c = infer(
            &plugin,
            &WorkspaceConfig::default(),
            "app/build.gradle.kts",
            json!({"classesTargetName": "compile", "testTargetName": "check"}),
        )
        .unwrap();
        let p = &c.projects["app"];
        assert!(p.targets.contains_key("compile"));
        assert!(p.targets.contains_key("check"));
        assert!(!p.targets.contains_key("classes"));
        assert_eq!(p.targets["build"].depends_on, vec!["^build", "compile"]);
        assert_eq!(p.targets["compile"].depends_on, vec!["^compile"]);
        assert_eq!(p.metadata.target_groups["Verification"], vec!["check"]);
    }

    #[test]
    fn test_wg008_parent_project_emitted() {
        let plugin = GradlePlugin::with_report(report());
        let c = infer(&plugin, &WorkspaceConfig::default(), "lib/build.gradle", json!(null)).unwrap();
        let parent = &c.parent_projects["."];
        assert_eq!(parent.name, "umbrella");
        assert!(parent.targets.is_empty());
        assert!(parent.metadata.technologies.contains("gradle"));
    }

    #[test]
    fn test_wg008_parent_skipped_when_known_project() {
        let mut r = report();
        r.project_names.insert(":".to_string(), "umbrella".to_string());
        let plugin = GradlePlugin::with_report(r);
        let c = infer(&plugin, &WorkspaceConfig::default(), "lib/build.gradle", json!(null)).unwrap();
        assert!(c.parent_projects.is_empty());
    }

    #[test]
    fn test_wg008_unknown_build_file_is_empty() {
        let plugin = GradlePlugin::with_report(report());
        let c = infer(&plugin, &WorkspaceConfig::default(), "other/build.gradle", json!(null)).unwrap();
        assert!(c.is_empty());
        let c = infer(&plugin, &WorkspaceConfig::default(), "orphan/build.gradle", json!(null)).unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn test_wg008_missing_report_fails_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = GradlePlugin::load(dir.path(), &json!(null)).unwrap();
        let err = infer(&plugin, &WorkspaceConfig::default(), "app/build.gradle", json!(null)).unwrap_err();
        assert!(matches!(err, PluginError::MissingReport(_)));
    }

    #[test]
    fn test_wg008_load_report_from_option_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("report.json"),
            serde_json::to_string(&report()).unwrap(),
        )
        .unwrap();
        let plugin = GradlePlugin::load(dir.path(), &json!({"reportFile": "report.json"})).unwrap();
        let config = WorkspaceConfig::default();
        let ctx = InferenceContext::new(dir.path(), &config);
        let c = plugin
            .infer_nodes("lib/build.gradle", &json!(null), &ctx)
            .unwrap();
        assert_eq!(c.projects["lib"].name, "lib");
    }

    #[test]
    fn test_wg008_fingerprint_tracks_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkspaceConfig::default();
        let ctx = InferenceContext::new(dir.path(), &config);
        let a = GradlePlugin::with_report(report()).context_fingerprint(&ctx);
        let mut changed = report();
        changed.project_names.insert(":x".to_string(), "x".to_string());
        let b = GradlePlugin::with_report(changed).context_fingerprint(&ctx);
        assert_ne!(a, b);
    }

    #[test]
    fn test_wg008_patterns_cover_both_dsls() {
        use crate::core::matcher::{compile_patterns, matches_any};
        let plugin = GradlePlugin::with_report(GradleReport::default());
        let pats = compile_patterns(&plugin.patterns()).unwrap();
        assert!(matches_any("a/build.gradle", &pats));
        assert!(matches_any("a/build.gradle.kts", &pats));
        assert!(!matches_any("a/settings.gradle", &pats));
    }
}
