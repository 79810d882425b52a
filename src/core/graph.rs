//! WG-013: Graph build — matcher → engine → merger → resolver.
//!
//! One synchronous pipeline per build. Inference is the only parallel
//! stage; merge and edge resolution run once all inference has finished.

use super::types::*;
use super::{engine, matcher, merger, parser, resolver};
use crate::cache::store::{cache_file_path, CacheStore};
use crate::error::{GraphError, GraphResult};
use crate::plugins::{self, InferenceContext, RegisteredPlugin};
use std::path::Path;

/// The cache store a build should use under `config`.
pub fn open_cache(workspace_root: &Path, config: &WorkspaceConfig, use_cache: bool) -> CacheStore {
    if use_cache && config.cache.enabled {
        CacheStore::at(cache_file_path(&workspace_root.join(&config.cache.dir)))
    } else {
        CacheStore::disabled()
    }
}

/// Build the project graph for a workspace with the configured plugins.
pub fn build_graph(
    workspace_root: &Path,
    config: &WorkspaceConfig,
    use_cache: bool,
) -> GraphResult<ProjectGraph> {
    let errors = parser::validate_config(config);
    if !errors.is_empty() {
        return Err(GraphError::ConfigInvalid(
            errors.into_iter().map(|e| e.message).collect(),
        ));
    }
    let plugins = plugins::build_plugins(config, workspace_root)?;
    let mut cache = open_cache(workspace_root, config, use_cache);
    build_graph_with(workspace_root, config, &plugins, &mut cache)
}

/// Build the project graph with an explicit plugin list and cache.
pub fn build_graph_with(
    workspace_root: &Path,
    config: &WorkspaceConfig,
    plugins: &[RegisteredPlugin],
    cache: &mut CacheStore,
) -> GraphResult<ProjectGraph> {
    let files = matcher::list_workspace_files(workspace_root, &config.exclude)?;
    let ctx = InferenceContext::new(workspace_root, config);
    let results = engine::run_inference(plugins, &files, &ctx, cache)?;

    let mut graph = ProjectGraph::default();
    graph.diagnostics.extend(cache.load_diagnostic());

    for r in &results {
        graph.stats.files_matched += 1;
        match &r.outcome {
            engine::InferenceOutcome::Cached(_) => graph.stats.cache_hits += 1,
            engine::InferenceOutcome::Computed(_) => graph.stats.computed += 1,
            engine::InferenceOutcome::Failed(e) => {
                graph.stats.failed += 1;
                graph.diagnostics.push(Diagnostic::PluginFailure {
                    plugin: r.plugin.clone(),
                    file: r.file.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    let merged = merger::merge(results.iter().filter_map(|r| {
        r.outcome
            .contribution()
            .map(|c| (r.plugin.as_str(), c))
    }));
    graph.diagnostics.extend(merged.diagnostics);
    graph.projects = merged.projects;
    resolver::interpolate_commands(&mut graph.projects, workspace_root);

    let (project_edges, project_diags) = resolver::build_project_edges(&graph.projects);
    let index = resolver::ProjectIndex::new(&graph.projects, &project_edges);
    let (target_edges, target_diags) = resolver::resolve_target_edges(&graph.projects, &index);
    drop(index);
    graph.diagnostics.extend(project_diags);
    graph.diagnostics.extend(target_diags);
    graph.project_edges = project_edges;
    graph.target_edges = target_edges;

    match cache.save() {
        Ok(saved) if saved > 0 => tracing::debug!("cached {} new inference results", saved),
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("inference cache not saved: {}", e);
            graph.diagnostics.push(Diagnostic::CacheUnavailable {
                path: cache
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                reason: e.to_string(),
            });
        }
    }

    tracing::info!(
        "graph: {} projects, {} target edges ({} files, {} cached, {} computed, {} failed)",
        graph.projects.len(),
        graph.target_edges.len(),
        graph.stats.files_matched,
        graph.stats.cache_hits,
        graph.stats.computed,
        graph.stats.failed
    );
    Ok(graph)
}
