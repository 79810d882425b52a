//! WG-000: Error types.
//!
//! `GraphError` aborts a whole graph build. `PluginError` is scoped to a
//! single descriptor file and never escapes the inference engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for graph construction.
pub type GraphResult<T> = Result<T, GraphError>;

/// Hard failures that abort graph construction.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("invalid workspace configuration: {}", .0.join("; "))]
    ConfigInvalid(Vec<String>),

    #[error("invalid glob pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("plugin '{plugin}' setup failed: {reason}")]
    PluginSetup { plugin: String, reason: String },

    #[error("project not found: {0}")]
    ProjectNotFound(String),
}

impl GraphError {
    /// Wrap an IO error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Failure of one plugin invocation on one descriptor file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("cannot read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("cannot parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("malformed contribution: {0}")]
    Malformed(String),

    #[error("build report not available: {0}")]
    MissingReport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wg000_config_invalid_joins_messages() {
        let e = GraphError::ConfigInvalid(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(e.to_string(), "invalid workspace configuration: a; b");
    }

    #[test]
    fn test_wg000_io_context() {
        let e = GraphError::io(
            "reading cache",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(e.to_string().contains("reading cache"));
        assert!(e.to_string().contains("gone"));
    }

    #[test]
    fn test_wg000_plugin_error_display() {
        let e = PluginError::Parse {
            path: "package.json".to_string(),
            reason: "expected value".to_string(),
        };
        assert_eq!(e.to_string(), "cannot parse package.json: expected value");
    }
}
