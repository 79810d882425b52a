//! Inference cache — content-addressed keys and the persisted key table.

pub mod hasher;
pub mod store;
