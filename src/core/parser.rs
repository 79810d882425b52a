//! WG-002: Workspace configuration parsing and validation.
//!
//! Parses `wsgraph.yaml` and validates structural constraints:
//! - Version must be "1.0"
//! - Plugin kinds must be known and registered at most once
//! - Named input names must be non-empty
//! - Exclude patterns must be valid globs

use super::types::*;
use crate::error::{GraphError, GraphResult};
use crate::plugins;
use std::collections::HashSet;
use std::path::Path;

/// Name of the workspace configuration file.
pub const CONFIG_FILE: &str = "wsgraph.yaml";

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a workspace config file from disk.
pub fn parse_config_file(path: &Path) -> GraphResult<WorkspaceConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| GraphError::io(format!("reading {}", path.display()), e))?;
    parse_config(&content).map_err(|reason| GraphError::ConfigParse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse a workspace config from a string. An empty document yields defaults.
pub fn parse_config(yaml: &str) -> Result<WorkspaceConfig, String> {
    if yaml.trim().is_empty() {
        return Ok(WorkspaceConfig::default());
    }
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Load `wsgraph.yaml` from the workspace root, falling back to defaults
/// when the file does not exist. Invalid configs are a hard error.
pub fn load_workspace_config(workspace_root: &Path) -> GraphResult<WorkspaceConfig> {
    let path = workspace_root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(WorkspaceConfig::default());
    }
    let config = parse_config_file(&path)?;
    let errors = validate_config(&config);
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(GraphError::ConfigInvalid(
            errors.into_iter().map(|e| e.message).collect(),
        ))
    }
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &WorkspaceConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(ValidationError {
            message: format!("version must be \"1.0\", got \"{}\"", config.version),
        });
    }

    let mut seen = HashSet::new();
    for entry in &config.plugins {
        if !plugins::PLUGIN_KINDS.contains(&entry.plugin.as_str()) {
            errors.push(ValidationError {
                message: format!(
                    "unknown plugin '{}' (known: {})",
                    entry.plugin,
                    plugins::PLUGIN_KINDS.join(", ")
                ),
            });
        }
        if !seen.insert(entry.plugin.as_str()) {
            errors.push(ValidationError {
                message: format!("plugin '{}' registered more than once", entry.plugin),
            });
        }
        if !entry.options.is_null() && !entry.options.is_object() {
            errors.push(ValidationError {
                message: format!("plugin '{}' options must be a mapping", entry.plugin),
            });
        }
    }

    for name in config.named_inputs.keys() {
        if name.trim().is_empty() {
            errors.push(ValidationError {
                message: "named input with empty name".to_string(),
            });
        }
    }

    for pattern in &config.exclude {
        if let Err(e) = glob::Pattern::new(pattern) {
            errors.push(ValidationError {
                message: format!("invalid exclude pattern '{}': {}", pattern, e),
            });
        }
    }

    if config.cache.enabled && config.cache.dir.trim().is_empty() {
        errors.push(ValidationError {
            message: "cache.dir must not be empty".to_string(),
        });
    }

    errors
}
