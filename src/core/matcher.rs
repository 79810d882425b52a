//! WG-003: Descriptor file discovery.
//!
//! Walks the workspace once (gitignore-aware) and matches the file list
//! against each plugin's glob patterns. Patterns from one plugin are a union.
//! `{a,b}` alternation is expanded before compiling since `glob` has no
//! brace support.

use crate::error::{GraphError, GraphResult};
use ignore::WalkBuilder;
use std::path::Path;

/// Directories never descended into.
const ALWAYS_SKIPPED: &[&str] = &[".git", "node_modules"];

/// Expand `{a,b}` alternations. Groups may repeat but not nest.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close) = pattern[open..].find('}').map(|c| open + c) else {
        return vec![pattern.to_string()];
    };
    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    pattern[open + 1..close]
        .split(',')
        .flat_map(|alt| expand_braces(&format!("{}{}{}", prefix, alt, suffix)))
        .collect()
}

/// Compile declarative patterns into glob matchers.
pub fn compile_patterns(patterns: &[String]) -> GraphResult<Vec<glob::Pattern>> {
    let mut compiled = Vec::new();
    for pattern in patterns {
        for expanded in expand_braces(pattern) {
            let p = glob::Pattern::new(&expanded).map_err(|e| GraphError::Pattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            compiled.push(p);
        }
    }
    Ok(compiled)
}

fn match_options() -> glob::MatchOptions {
    glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// True if the relative path matches any of the patterns.
pub fn matches_any(rel_path: &str, patterns: &[glob::Pattern]) -> bool {
    let opts = match_options();
    patterns.iter().any(|p| p.matches_with(rel_path, opts))
}

/// List every file under the workspace root as a sorted, `/`-separated
/// path relative to the root. Paths matching `exclude` are dropped.
pub fn list_workspace_files(root: &Path, exclude: &[String]) -> GraphResult<Vec<String>> {
    std::fs::read_dir(root)
        .map_err(|e| GraphError::io(format!("reading workspace root {}", root.display()), e))?;
    let exclude = compile_patterns(exclude)?;

    let mut files: Vec<String> = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !ALWAYS_SKIPPED.contains(&name))
        })
        .build()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter_map(|entry| relative_path(root, entry.path()))
        .filter(|rel| !matches_any(rel, &exclude))
        .collect();

    files.sort();
    Ok(files)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Select files matching any pattern. Input order is preserved.
pub fn match_files(files: &[String], patterns: &[glob::Pattern]) -> Vec<String> {
    files
        .iter()
        .filter(|f| matches_any(f, patterns))
        .cloned()
        .collect()
}
