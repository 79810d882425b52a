//! WG-010: Inference engine — memoized, parallel, failure-isolated.
//!
//! For each (plugin, descriptor) pair: hash the descriptor, derive the
//! inference key, consult the cache, and only on a miss invoke the plugin.
//! Invocations are independent and run on the rayon pool. A failing file
//! yields an explicit `Failed` outcome and contributes nothing.

use super::matcher;
use super::types::*;
use crate::cache::hasher;
use crate::cache::store::CacheStore;
use crate::error::{GraphResult, PluginError};
use crate::plugins::{InferenceContext, RegisteredPlugin};
use rayon::prelude::*;
use std::path::{Component, Path};

/// What happened for one descriptor file.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
    /// Served from the cache without invoking the plugin
    Cached(Contribution),
    /// Computed by the plugin on this run
    Computed(Contribution),
    /// The plugin failed; the file contributes nothing
    Failed(PluginError),
}

impl InferenceOutcome {
    pub fn contribution(&self) -> Option<&Contribution> {
        match self {
            Self::Cached(c) | Self::Computed(c) => Some(c),
            Self::Failed(_) => None,
        }
    }
}

/// The outcome for one (plugin, file) pair, tagged for merging.
#[derive(Debug, Clone)]
pub struct FileInference {
    /// Registration index; lower wins on merge
    pub plugin_index: usize,
    pub plugin: String,
    /// Workspace-relative descriptor path
    pub file: String,
    /// `None` when the descriptor could not be hashed
    pub key: Option<String>,
    pub outcome: InferenceOutcome,
}

/// Reject contributions the merger cannot use.
pub fn validate_contribution(contribution: &Contribution) -> Result<(), PluginError> {
    let all = contribution
        .projects
        .iter()
        .chain(contribution.parent_projects.iter());
    for (root, project) in all {
        if root.is_empty() {
            return Err(PluginError::Malformed("empty project root".to_string()));
        }
        let path = Path::new(root);
        if path.is_absolute()
            || path
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::RootDir))
        {
            return Err(PluginError::Malformed(format!(
                "project root '{}' escapes the workspace",
                root
            )));
        }
        if project.name.trim().is_empty() {
            return Err(PluginError::Malformed(format!(
                "project at '{}' has no name",
                root
            )));
        }
        for (target, spec) in &project.targets {
            if target.trim().is_empty() {
                return Err(PluginError::Malformed(format!(
                    "project '{}' has a target with an empty name",
                    project.name
                )));
            }
            if spec.depends_on.iter().any(|t| t.trim().is_empty()) {
                return Err(PluginError::Malformed(format!(
                    "{}:{} has an empty dependsOn token",
                    project.name, target
                )));
            }
        }
    }
    Ok(())
}

/// Infer a single descriptor. Never panics on plugin failure and never
/// writes to the cache; callers persist `Computed` outcomes.
pub fn infer_file(
    registered: &RegisteredPlugin,
    plugin_index: usize,
    rel_path: &str,
    fingerprint: &str,
    ctx: &InferenceContext,
    cache: &CacheStore,
) -> FileInference {
    let plugin = registered.name().to_string();
    let mut result = FileInference {
        plugin_index,
        plugin,
        file: rel_path.to_string(),
        key: None,
        outcome: InferenceOutcome::Computed(Contribution::default()),
    };

    let content_hash = match hasher::hash_file(&ctx.workspace_root.join(rel_path)) {
        Ok(h) => h,
        Err(reason) => {
            result.outcome = InferenceOutcome::Failed(PluginError::Read {
                path: rel_path.to_string(),
                reason,
            });
            return result;
        }
    };
    let key = hasher::inference_key(
        &result.plugin,
        rel_path,
        &content_hash,
        &registered.options,
        fingerprint,
    );

    result.outcome = if let Some(hit) = cache.get(&key) {
        tracing::debug!("cache hit: {} {}", result.plugin, rel_path);
        InferenceOutcome::Cached(hit)
    } else {
        tracing::debug!("cache miss: {} {}", result.plugin, rel_path);
        match registered
            .plugin
            .infer_nodes(rel_path, &registered.options, ctx)
            .and_then(|c| validate_contribution(&c).map(|()| c))
        {
            Ok(c) => InferenceOutcome::Computed(c),
            Err(e) => {
                tracing::warn!("plugin {} failed on {}: {}", result.plugin, rel_path, e);
                InferenceOutcome::Failed(e)
            }
        }
    };
    result.key = Some(key);
    result
}

/// Run every plugin over its matching files. Results are ordered by
/// plugin registration, then by file path, regardless of scheduling.
/// Newly computed contributions are recorded in `cache` (not yet saved).
pub fn run_inference(
    plugins: &[RegisteredPlugin],
    files: &[String],
    ctx: &InferenceContext,
    cache: &mut CacheStore,
) -> GraphResult<Vec<FileInference>> {
    let mut tasks: Vec<(usize, &RegisteredPlugin, String, String)> = Vec::new();
    for (index, registered) in plugins.iter().enumerate() {
        let patterns = matcher::compile_patterns(&registered.plugin.patterns())?;
        let fingerprint = registered.plugin.context_fingerprint(ctx);
        let matched = matcher::match_files(files, &patterns);
        tracing::debug!(
            "plugin {} matched {} descriptor(s)",
            registered.name(),
            matched.len()
        );
        for file in matched {
            tasks.push((index, registered, file, fingerprint.clone()));
        }
    }

    let shared: &CacheStore = cache;
    let results: Vec<FileInference> = tasks
        .par_iter()
        .map(|(index, registered, file, fingerprint)| {
            infer_file(registered, *index, file, fingerprint, ctx, shared)
        })
        .collect();

    for r in &results {
        if let (Some(key), InferenceOutcome::Computed(c)) = (&r.key, &r.outcome) {
            cache.insert(key, c);
        }
    }
    Ok(results)
}
