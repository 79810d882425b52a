//! WG-005: Inference cache store — lazy load, merge-on-save (atomic).
//!
//! The cache file holds two buckets keyed by inference key: primary
//! project contributions and synthetic parent contributions. Values are
//! pure functions of their keys, so concurrent writers that race on a key
//! always agree and last-write-wins is safe.

use crate::core::types::{Contribution, Diagnostic, ProjectNode};
use crate::error::{GraphError, GraphResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Bucket type: inference key → project root → project.
pub type Bucket = IndexMap<String, IndexMap<String, ProjectNode>>;

/// Layout version of the cache file. Bump whenever the serialized form of
/// a project changes; files carrying any other version are discarded.
pub const CACHE_FORMAT: u32 = 2;

/// On-disk cache layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheFile {
    #[serde(default)]
    pub format: u32,

    #[serde(default)]
    pub projects: Bucket,

    #[serde(default)]
    pub parent_projects: Bucket,
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            format: CACHE_FORMAT,
            projects: Bucket::default(),
            parent_projects: Bucket::default(),
        }
    }
}

impl CacheFile {
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Fetch the contribution stored under a key. A key is present iff it
    /// has a primary bucket entry (possibly an empty project map).
    pub fn get(&self, key: &str) -> Option<Contribution> {
        let projects = self.projects.get(key)?;
        Some(Contribution {
            projects: projects.clone(),
            parent_projects: self.parent_projects.get(key).cloned().unwrap_or_default(),
        })
    }

    pub fn insert(&mut self, key: &str, contribution: &Contribution) {
        self.projects
            .insert(key.to_string(), contribution.projects.clone());
        if contribution.parent_projects.is_empty() {
            self.parent_projects.shift_remove(key);
        } else {
            self.parent_projects
                .insert(key.to_string(), contribution.parent_projects.clone());
        }
    }

    /// Overlay every key of `other` onto `self`.
    pub fn merge_from(&mut self, other: &CacheFile) {
        for (key, projects) in &other.projects {
            self.projects.insert(key.clone(), projects.clone());
        }
        for (key, parents) in &other.parent_projects {
            self.parent_projects.insert(key.clone(), parents.clone());
        }
    }
}

/// Derive the cache file path within the cache directory.
pub fn cache_file_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("inference.json")
}

/// Read a cache file. A missing file, or one written in another format
/// version, is an empty cache; an unreadable or unparsable one is reported
/// as `Err` so the caller can surface it.
pub fn read_cache_file(path: &Path) -> Result<CacheFile, String> {
    if !path.exists() {
        return Ok(CacheFile::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let cache: CacheFile = serde_json::from_str(&content)
        .map_err(|e| format!("invalid cache {}: {}", path.display(), e))?;
    if cache.format != CACHE_FORMAT {
        tracing::debug!(
            "discarding cache {} (format {}, expected {})",
            path.display(),
            cache.format,
            CACHE_FORMAT
        );
        return Ok(CacheFile::default());
    }
    Ok(cache)
}

/// Write a cache file atomically (write to temp, then rename). The temp
/// name is per-process so concurrent writers never share one.
pub fn write_cache_file(path: &Path, cache: &CacheFile) -> GraphResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| GraphError::io(format!("creating {}", parent.display()), e))?;
    }

    let json = serde_json::to_string(cache).map_err(|e| GraphError::Serialize(e.to_string()))?;

    let tmp_path = path.with_extension(format!("json.tmp.{}", std::process::id()));
    std::fs::write(&tmp_path, &json)
        .map_err(|e| GraphError::io(format!("writing {}", tmp_path.display()), e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        GraphError::io(
            format!("renaming {} → {}", tmp_path.display(), path.display()),
            e,
        )
    })?;
    Ok(())
}

/// Explicit cache context handed to the inference engine.
///
/// Lifecycle: the persisted table is read at most once, on first lookup.
/// Newly computed entries are held separately and merged into whatever is
/// on disk at save time, so entries written by other processes survive.
#[derive(Debug, Default)]
pub struct CacheStore {
    path: Option<PathBuf>,
    loaded: OnceLock<(CacheFile, Option<Diagnostic>)>,
    fresh: CacheFile,
}

impl CacheStore {
    /// A store backed by the file at `path`. Nothing is read yet.
    pub fn at(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            loaded: OnceLock::new(),
            fresh: CacheFile::default(),
        }
    }

    /// A store that never reads or writes; every lookup misses.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persisted(&self) -> &(CacheFile, Option<Diagnostic>) {
        self.loaded.get_or_init(|| match &self.path {
            None => (CacheFile::default(), None),
            Some(path) => match read_cache_file(path) {
                Ok(file) => {
                    tracing::debug!("loaded {} cached inference entries", file.len());
                    (file, None)
                }
                Err(reason) => {
                    tracing::warn!("inference cache unavailable, starting empty: {}", reason);
                    let diag = Diagnostic::CacheUnavailable {
                        path: path.display().to_string(),
                        reason,
                    };
                    (CacheFile::default(), Some(diag))
                }
            },
        })
    }

    /// Look up a key, loading the persisted table on first use.
    pub fn get(&self, key: &str) -> Option<Contribution> {
        if let Some(hit) = self.fresh.get(key) {
            return Some(hit);
        }
        self.persisted().0.get(key)
    }

    /// Record a newly computed contribution.
    pub fn insert(&mut self, key: &str, contribution: &Contribution) {
        self.fresh.insert(key, contribution);
    }

    /// Number of keys computed in this session.
    pub fn fresh_len(&self) -> usize {
        self.fresh.len()
    }

    /// The load diagnostic, if the persisted table could not be read.
    /// Only meaningful after the first lookup.
    pub fn load_diagnostic(&self) -> Option<Diagnostic> {
        self.loaded.get().and_then(|(_, d)| d.clone())
    }

    /// Read-merge-write: reload what is on disk now, overlay this session's
    /// keys, and write the union back. Returns the number of keys merged.
    pub fn save(&self) -> GraphResult<usize> {
        let Some(path) = &self.path else {
            return Ok(0);
        };
        if self.fresh.is_empty() {
            return Ok(0);
        }
        let mut on_disk = read_cache_file(path).unwrap_or_else(|reason| {
            tracing::warn!("replacing unreadable inference cache: {}", reason);
            CacheFile::default()
        });
        on_disk.merge_from(&self.fresh);
        write_cache_file(path, &on_disk)?;
        tracing::debug!(
            "saved {} new inference entries ({} total)",
            self.fresh.len(),
            on_disk.len()
        );
        Ok(self.fresh.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ProjectNode;

    fn contribution(root: &str, name: &str) -> Contribution {
        let mut c = Contribution::default();
        c.projects.insert(
            root.to_string(),
            ProjectNode {
                name: name.to_string(),
                ..Default::default()
            },
        );
        c
    }

    #[test]
    fn test_wg005_cache_file_path() {
        let p = cache_file_path(Path::new("/ws/.wsgraph/cache"));
        assert_eq!(p, PathBuf::from("/ws/.wsgraph/cache/inference.json"));
    }

    #[test]
    fn test_wg005_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = read_cache_file(&dir.path().join("inference.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_wg005_corrupt_file_is_empty_with_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inference.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = CacheStore::at(path);
        assert!(store.get("blake3:any").is_none());
        assert!(matches!(
            store.load_diagnostic(),
            Some(Diagnostic::CacheUnavailable { .. })
        ));
    }

    #[test]
    fn test_wg005_other_format_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inference.json");
        std::fs::write(
            &path,
            r#"{"projects": {"k1": {".": {"name": "root", "targets":
                {"build": {"depends_on": ["^build"]}}}}}}"#,
        )
        .unwrap();
        let store = CacheStore::at(path.clone());
        assert!(store.get("k1").is_none());
        assert!(store.load_diagnostic().is_none());

        let mut file = CacheFile::default();
        file.insert("k1", &contribution(".", "root"));
        write_cache_file(&path, &file).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["format"], CACHE_FORMAT);
    }

    #[test]
    fn test_wg005_lazy_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inference.json");
        let store = CacheStore::at(path.clone());
        // File written after construction is still seen: nothing was read yet.
        let mut file = CacheFile::default();
        file.insert("k1", &contribution(".", "root"));
        write_cache_file(&path, &file).unwrap();
        assert_eq!(store.get("k1").unwrap(), contribution(".", "root"));
    }

    #[test]
    fn test_wg005_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/inference.json");
        let mut store = CacheStore::at(path.clone());
        store.insert("k1", &contribution("a", "a"));
        assert_eq!(store.save().unwrap(), 1);

        let reloaded = CacheStore::at(path);
        assert_eq!(reloaded.get("k1").unwrap(), contribution("a", "a"));
        assert!(reloaded.get("k2").is_none());
    }

    #[test]
    fn test_wg005_save_merges_with_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inference.json");

        let mut first = CacheStore::at(path.clone());
        let mut second = CacheStore::at(path.clone());
        first.insert("k1", &contribution("a", "a"));
        second.insert("k2", &contribution("b", "b"));
        first.save().unwrap();
        second.save().unwrap();

        let on_disk = read_cache_file(&path).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert!(on_disk.get("k1").is_some());
        assert!(on_disk.get("k2").is_some());
    }

    #[test]
    fn test_wg005_save_overwrites_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inference.json");
        std::fs::write(&path, "garbage").unwrap();
        let mut store = CacheStore::at(path.clone());
        store.insert("k1", &contribution("a", "a"));
        store.save().unwrap();
        assert_eq!(read_cache_file(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_wg005_atomic_write_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inference.json");
        write_cache_file(&path, &CacheFile::default()).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_wg005_parent_bucket_roundtrip() {
        let mut c = contribution("app", "app");
        c.parent_projects.insert(
            ".".to_string(),
            ProjectNode {
                name: "umbrella".to_string(),
                ..Default::default()
            },
        );
        let mut file = CacheFile::default();
        file.insert("k", &c);
        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains("\"parent_projects\""));
        let back: CacheFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("k").unwrap(), c);
    }

    #[test]
    fn test_wg005_empty_contribution_is_a_hit() {
        let mut file = CacheFile::default();
        file.insert("k", &Contribution::default());
        assert_eq!(file.get("k"), Some(Contribution::default()));
    }

    #[test]
    fn test_wg005_disabled_store() {
        let mut store = CacheStore::disabled();
        store.insert("k", &contribution("a", "a"));
        assert_eq!(store.save().unwrap(), 0);
        assert!(store.path().is_none());
    }
}
