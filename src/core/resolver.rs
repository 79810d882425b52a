//! WG-012: Command interpolation and dependency edge resolution.
//!
//! Interpolates `{projectRoot}`, `{projectName}` and `{workspaceRoot}` in
//! target commands. Resolves project dependencies into project edges and
//! `dependsOn` tokens into target edges. Never re-runs inference; the same
//! project map always resolves to the same edges.

use super::types::*;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Replace `{name}` tokens found in `vars`. Unknown or unclosed tokens are
/// left as written.
pub fn interpolate(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find('{') {
        let open = start + open;
        let Some(close) = result[open..].find('}') else {
            break;
        };
        let close = open + close + 1;
        let key = &result[open + 1..close - 1];

        match vars.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => {
                let value = value.to_string();
                result.replace_range(open..close, &value);
                start = open + value.len();
            }
            None => start = open + 1,
        }
    }

    result
}

/// Interpolate every target command in place.
pub fn interpolate_commands(projects: &mut IndexMap<String, ProjectNode>, workspace_root: &Path) {
    let workspace = workspace_root.display().to_string();
    for (root, project) in projects.iter_mut() {
        let vars = [
            ("projectRoot", root.as_str()),
            ("projectName", project.name.as_str()),
            ("workspaceRoot", workspace.as_str()),
        ];
        let commands: Vec<(String, String)> = project
            .targets
            .iter()
            .filter_map(|(name, spec)| {
                spec.command
                    .as_deref()
                    .map(|c| (name.clone(), interpolate(c, &vars)))
            })
            .collect();
        for (name, command) in commands {
            if let Some(spec) = project.targets.get_mut(&name) {
                spec.command = Some(command);
            }
        }
    }
}

/// Read-only lookups built once per build.
#[derive(Debug, Default)]
pub struct ProjectIndex<'a> {
    /// Project name → root. The first root (in sorted order) wins a name.
    by_name: FxHashMap<&'a str, &'a str>,
    /// Project name → direct dependency names, sorted
    deps: FxHashMap<&'a str, Vec<&'a str>>,
}

impl<'a> ProjectIndex<'a> {
    pub fn new(projects: &'a IndexMap<String, ProjectNode>, edges: &'a [ProjectEdge]) -> Self {
        let by_name = name_owners(projects);
        let mut deps: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        for edge in edges {
            deps.entry(edge.from.as_str())
                .or_default()
                .push(edge.to.as_str());
        }
        Self { by_name, deps }
    }

    pub fn root_of(&self, name: &str) -> Option<&'a str> {
        self.by_name.get(name).copied()
    }

    /// Whether `root` is the root that owns `name`.
    pub fn owns(&self, name: &str, root: &str) -> bool {
        self.root_of(name) == Some(root)
    }

    pub fn dependencies_of(&self, name: &str) -> &[&'a str] {
        self.deps.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Project name → first root (in map order) carrying it.
fn name_owners(projects: &IndexMap<String, ProjectNode>) -> FxHashMap<&str, &str> {
    let mut owners = FxHashMap::default();
    for (root, project) in projects {
        owners.entry(project.name.as_str()).or_insert(root.as_str());
    }
    owners
}

/// Project-level edges from implicit and package dependencies.
///
/// Unknown implicit dependencies are reported; unknown package dependencies
/// are external packages and skipped silently. Self edges are never made.
/// A root whose name is already owned by an earlier root is reported once
/// and contributes no edges.
pub fn build_project_edges(
    projects: &IndexMap<String, ProjectNode>,
) -> (Vec<ProjectEdge>, Vec<Diagnostic>) {
    let owners = name_owners(projects);
    let mut edges = Vec::new();
    let mut diagnostics = Vec::new();

    for (root, project) in projects {
        let kept = owners.get(project.name.as_str()).copied().unwrap_or(root.as_str());
        if kept != root.as_str() {
            tracing::warn!(
                "{}: project name '{}' already used by {}",
                root,
                project.name,
                kept
            );
            diagnostics.push(Diagnostic::DuplicateProjectName {
                name: project.name.clone(),
                root: root.clone(),
                kept: kept.to_string(),
            });
            continue;
        }
        for dep in &project.implicit_dependencies {
            if !owners.contains_key(dep.as_str()) {
                tracing::warn!(
                    "{}: implicit dependency '{}' is not a known project",
                    project.name,
                    dep
                );
                diagnostics.push(Diagnostic::UnknownProjectDependency {
                    project: project.name.clone(),
                    dependency: dep.clone(),
                });
                continue;
            }
            if *dep != project.name {
                edges.push(ProjectEdge {
                    from: project.name.clone(),
                    to: dep.clone(),
                });
            }
        }
        for dep in &project.dependencies {
            if owners.contains_key(dep.as_str()) && *dep != project.name {
                edges.push(ProjectEdge {
                    from: project.name.clone(),
                    to: dep.clone(),
                });
            }
        }
    }

    edges.sort();
    edges.dedup();
    (edges, diagnostics)
}

/// Expand every `dependsOn` token into target edges.
pub fn resolve_target_edges(
    projects: &IndexMap<String, ProjectNode>,
    index: &ProjectIndex,
) -> (Vec<TargetEdge>, Vec<Diagnostic>) {
    let mut edges = Vec::new();
    let mut diagnostics = Vec::new();

    for (root, project) in projects {
        if !index.owns(&project.name, root) {
            continue;
        }
        for (target, spec) in &project.targets {
            let from = TargetId::new(&project.name, target);
            for token in &spec.depends_on {
                let unresolved = |reason: String| {
                    tracing::warn!(
                        "{}:{} dependsOn '{}' dropped: {}",
                        project.name,
                        target,
                        token,
                        reason
                    );
                    Diagnostic::UnresolvedDependency {
                        project: project.name.clone(),
                        target: target.clone(),
                        token: token.clone(),
                        reason,
                    }
                };

                match DependsOn::parse(token) {
                    DependsOn::SameProject(name) => {
                        if name == *target {
                            diagnostics.push(unresolved("target depends on itself".to_string()));
                        } else if project.targets.contains_key(&name) {
                            edges.push(TargetEdge {
                                from: from.clone(),
                                to: TargetId::new(&project.name, &name),
                            });
                        } else {
                            diagnostics.push(unresolved(format!(
                                "project '{}' has no target '{}'",
                                project.name, name
                            )));
                        }
                    }
                    DependsOn::Upstream(name) => {
                        for dep in index.dependencies_of(&project.name) {
                            let declares = index
                                .root_of(dep)
                                .and_then(|root| projects.get(root))
                                .is_some_and(|p| p.targets.contains_key(&name));
                            if declares {
                                edges.push(TargetEdge {
                                    from: from.clone(),
                                    to: TargetId::new(dep, &name),
                                });
                            }
                        }
                    }
                    DependsOn::Project {
                        project: other,
                        target: name,
                    } => {
                        let Some(dep) = index.root_of(&other).and_then(|r| projects.get(r)) else {
                            diagnostics
                                .push(unresolved(format!("no project named '{}'", other)));
                            continue;
                        };
                        if !dep.targets.contains_key(&name) {
                            diagnostics.push(unresolved(format!(
                                "project '{}' has no target '{}'",
                                other, name
                            )));
                        } else if other == project.name && name == *target {
                            diagnostics.push(unresolved("target depends on itself".to_string()));
                        } else {
                            edges.push(TargetEdge {
                                from: from.clone(),
                                to: TargetId::new(&other, &name),
                            });
                        }
                    }
                }
            }
        }
    }

    edges.sort();
    edges.dedup();
    (edges, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, targets: &[(&str, &[&str])]) -> ProjectNode {
        let mut p = ProjectNode {
            name: name.to_string(),
            ..Default::default()
        };
        for (t, deps) in targets {
            p.targets.insert(
                t.to_string(),
                TargetSpec {
                    depends_on: deps.iter().map(|d| d.to_string()).collect(),
                    ..Default::default()
                },
            );
        }
        p
    }

    fn edge(from: (&str, &str), to: (&str, &str)) -> TargetEdge {
        TargetEdge {
            from: TargetId::new(from.0, from.1),
            to: TargetId::new(to.0, to.1),
        }
    }

    fn resolve(projects: &IndexMap<String, ProjectNode>) -> (Vec<TargetEdge>, Vec<Diagnostic>) {
        let (project_edges, _) = build_project_edges(projects);
        let index = ProjectIndex::new(projects, &project_edges);
        resolve_target_edges(projects, &index)
    }

    #[test]
    fn test_wg012_interpolate_known_tokens() {
        let vars = [("projectRoot", "libs/a"), ("projectName", "a")];
        assert_eq!(
            interpolate("tsc -p {projectRoot}/tsconfig.json --name {projectName}", &vars),
            "tsc -p libs/a/tsconfig.json --name a"
        );
    }

    #[test]
    fn test_wg012_interpolate_unknown_left_literal() {
        let vars = [("projectRoot", "x")];
        assert_eq!(interpolate("echo {other} {projectRoot}", &vars), "echo {other} x");
        assert_eq!(interpolate("awk '{print $1}'", &vars), "awk '{print $1}'");
        assert_eq!(interpolate("unclosed {projectRoot", &vars), "unclosed {projectRoot");
    }

    #[test]
    fn test_wg012_interpolate_value_not_rescanned() {
        let vars = [("projectName", "{projectName}")];
        assert_eq!(interpolate("{projectName}", &vars), "{projectName}");
    }

    #[test]
    fn test_wg012_interpolate_commands() {
        let mut projects = IndexMap::new();
        let mut p = node("web", &[]);
        p.targets.insert(
            "serve".to_string(),
            TargetSpec {
                command: Some("node {workspaceRoot}/{projectRoot}/main.js".to_string()),
                ..Default::default()
            },
        );
        projects.insert("apps/web".to_string(), p);
        interpolate_commands(&mut projects, Path::new("/ws"));
        assert_eq!(
            projects["apps/web"].targets["serve"].command.as_deref(),
            Some("node /ws/apps/web/main.js")
        );
    }

    #[test]
    fn test_wg012_upstream_fan_out_skips_missing() {
        let mut projects = IndexMap::new();
        let mut p = node("P", &[("build", &["^build"])]);
        p.implicit_dependencies = vec!["D1".to_string(), "D2".to_string()];
        projects.insert("p".to_string(), p);
        projects.insert("d1".to_string(), node("D1", &[("build", &[])]));
        projects.insert("d2".to_string(), node("D2", &[("test", &[])]));
        let (edges, diags) = resolve(&projects);
        assert_eq!(edges, vec![edge(("P", "build"), ("D1", "build"))]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_wg012_unresolved_bare_token() {
        let mut projects = IndexMap::new();
        projects.insert("a".to_string(), node("a", &[("build", &["nonexistent"])]));
        let (edges, diags) = resolve(&projects);
        assert!(edges.is_empty());
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_warning());
    }

    #[test]
    fn test_wg012_same_project_edge() {
        let mut projects = IndexMap::new();
        projects.insert(
            "a".to_string(),
            node("a", &[("test", &["build"]), ("build", &[])]),
        );
        let (edges, diags) = resolve(&projects);
        assert_eq!(edges, vec![edge(("a", "test"), ("a", "build"))]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_wg012_self_reference_warns() {
        let mut projects = IndexMap::new();
        projects.insert("a".to_string(), node("a", &[("build", &["build", "a:build"])]));
        let (edges, diags) = resolve(&projects);
        assert!(edges.is_empty());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_wg012_explicit_project_target() {
        let mut projects = IndexMap::new();
        projects.insert(
            "a".to_string(),
            node("a", &[("deploy", &["b:build", "b:nope", "ghost:build"])]),
        );
        projects.insert("b".to_string(), node("b", &[("build", &[])]));
        let (edges, diags) = resolve(&projects);
        assert_eq!(edges, vec![edge(("a", "deploy"), ("b", "build"))]);
        assert_eq!(diags.len(), 2);
        let reasons: Vec<String> = diags.iter().map(|d| d.to_string()).collect();
        assert!(reasons[0].contains("b:nope"));
        assert!(reasons[1].contains("ghost"));
    }

    #[test]
    fn test_wg012_project_edges_skip_external_and_self() {
        let mut projects = IndexMap::new();
        let mut web = node("web", &[]);
        web.dependencies = vec!["react".to_string(), "lib".to_string(), "web".to_string()];
        web.implicit_dependencies = vec!["lib".to_string(), "missing".to_string()];
        projects.insert("apps/web".to_string(), web);
        projects.insert("libs/lib".to_string(), node("lib", &[]));
        let (edges, diags) = build_project_edges(&projects);
        assert_eq!(
            edges,
            vec![ProjectEdge {
                from: "web".to_string(),
                to: "lib".to_string(),
            }]
        );
        assert_eq!(
            diags,
            vec![Diagnostic::UnknownProjectDependency {
                project: "web".to_string(),
                dependency: "missing".to_string(),
            }]
        );
    }

    #[test]
    fn test_wg012_duplicate_names_reported_and_shadowed_skipped() {
        let mut projects = IndexMap::new();
        projects.insert("a".to_string(), node("x", &[("build", &[])]));
        let mut shadowed = node("x", &[("build", &["test"]), ("test", &[])]);
        shadowed.implicit_dependencies = vec!["c".to_string()];
        projects.insert("b".to_string(), shadowed);
        projects.insert("c".to_string(), node("c", &[("build", &["x:test"])]));

        let (project_edges, project_diags) = build_project_edges(&projects);
        assert!(project_edges.is_empty());
        assert_eq!(
            project_diags,
            vec![Diagnostic::DuplicateProjectName {
                name: "x".to_string(),
                root: "b".to_string(),
                kept: "a".to_string(),
            }]
        );
        assert!(project_diags[0].is_warning());

        let index = ProjectIndex::new(&projects, &project_edges);
        assert_eq!(index.root_of("x"), Some("a"));
        let (edges, diags) = resolve_target_edges(&projects, &index);
        assert!(edges.is_empty());
        assert_eq!(diags.len(), 1);
        assert!(diags[0].to_string().contains("x:test"));
    }

    #[test]
    fn test_wg012_resolution_idempotent() {
        let mut projects = IndexMap::new();
        let mut app = node("app", &[("build", &["^build", "lint"]), ("lint", &[])]);
        app.dependencies = vec!["lib".to_string()];
        projects.insert("app".to_string(), app);
        projects.insert("lib".to_string(), node("lib", &[("build", &[])]));
        assert_eq!(resolve(&projects), resolve(&projects));
        let (edges, _) = resolve(&projects);
        assert_eq!(
            edges,
            vec![
                edge(("app", "build"), ("app", "lint")),
                edge(("app", "build"), ("lib", "build")),
            ]
        );
    }
}
