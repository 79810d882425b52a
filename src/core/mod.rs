//! Core graph logic — types, config, matching, inference, merge, resolution.

pub mod engine;
pub mod graph;
pub mod matcher;
pub mod merger;
pub mod parser;
pub mod resolver;
pub mod types;
