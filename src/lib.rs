//! wsgraph — project and task graph inference for multi-project workspaces.
//!
//! Plugins turn build descriptors (package manifests, project files, build
//! tool reports) into partial project graphs. Results are memoized by
//! BLAKE3 content keys, merged by plugin precedence, and resolved into
//! project and target edges for a downstream scheduler.

pub mod cache;
pub mod cli;
pub mod core;
pub mod error;
pub mod plugins;
