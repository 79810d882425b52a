//! WG-011: Result merger — union per-file contributions into one project map.
//!
//! Contributions arrive in precedence order (plugin registration order,
//! then descriptor path). Same-root projects merge target-by-target with
//! the earlier contribution winning collisions. Parent projects are only
//! considered once every primary contribution has been placed.

use super::types::*;
use crate::plugins::push_unique;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

/// The merged project map plus what the merge had to resolve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeResult {
    /// Project root → merged node, sorted by root
    pub projects: IndexMap<String, ProjectNode>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Merge contributions given as `(plugin name, contribution)` in
/// precedence order.
pub fn merge<'a, I>(contributions: I) -> MergeResult
where
    I: IntoIterator<Item = (&'a str, &'a Contribution)>,
{
    let contributions: Vec<(&str, &Contribution)> = contributions.into_iter().collect();
    let mut projects: IndexMap<String, ProjectNode> = IndexMap::new();
    let mut owners: FxHashMap<String, &str> = FxHashMap::default();
    let mut diagnostics = Vec::new();

    for (plugin, contribution) in &contributions {
        for (root, node) in &contribution.projects {
            match projects.get_mut(root) {
                Some(existing) => {
                    let kept = owners.get(root).copied().unwrap_or_default();
                    merge_into(existing, node, root, kept, plugin, &mut diagnostics);
                }
                None => {
                    owners.insert(root.clone(), *plugin);
                    projects.insert(root.clone(), node.clone());
                }
            }
        }
    }

    let mut parents: FxHashSet<&str> = FxHashSet::default();
    for (plugin, contribution) in &contributions {
        for (root, node) in &contribution.parent_projects {
            if parents.contains(root.as_str()) {
                continue;
            }
            if projects.contains_key(root) {
                tracing::info!(
                    "parent project '{}' from {} dropped: {} already claimed",
                    node.name,
                    plugin,
                    root
                );
                diagnostics.push(Diagnostic::ParentDropped {
                    root: root.clone(),
                    name: node.name.clone(),
                    plugin: plugin.to_string(),
                });
                continue;
            }
            parents.insert(root);
            projects.insert(root.clone(), node.clone());
        }
    }
    projects.sort_keys();
    MergeResult {
        projects,
        diagnostics,
    }
}

fn merge_into(
    existing: &mut ProjectNode,
    incoming: &ProjectNode,
    root: &str,
    kept: &str,
    dropped: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, spec) in &incoming.targets {
        if existing.targets.contains_key(name) {
            if existing.targets[name] != *spec {
                tracing::info!(
                    "{}: target '{}' from {} kept over {}",
                    root,
                    name,
                    kept,
                    dropped
                );
                diagnostics.push(Diagnostic::MergeConflict {
                    root: root.to_string(),
                    target: name.clone(),
                    kept: kept.to_string(),
                    dropped: dropped.to_string(),
                });
            }
            continue;
        }
        existing.targets.insert(name.clone(), spec.clone());
    }

    existing
        .metadata
        .technologies
        .extend(incoming.metadata.technologies.iter().cloned());
    for (group, names) in &incoming.metadata.target_groups {
        let list = existing
            .metadata
            .target_groups
            .entry(group.clone())
            .or_default();
        push_unique(list, names.iter().cloned());
    }

    if existing.project_type.is_none() {
        existing.project_type = incoming.project_type;
    }
    push_unique(
        &mut existing.implicit_dependencies,
        incoming.implicit_dependencies.iter().cloned(),
    );
    push_unique(
        &mut existing.dependencies,
        incoming.dependencies.iter().cloned(),
    );
    push_unique(&mut existing.tags, incoming.tags.iter().cloned());
}
