//! CLI command implementations.

pub mod cache;
pub mod common;
pub mod layers;
pub mod publish;
pub mod reload;
pub mod stores;
pub mod styles;
pub mod validate;
pub mod workspaces;
