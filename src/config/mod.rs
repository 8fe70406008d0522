// src/config/mod.rs

//! Configuration loading and validation for recipeshard.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//! - Load recipe blacklists (`blacklist.rs`).

pub mod blacklist;
pub mod loader;
pub mod model;
pub mod validate;

pub use blacklist::{parse_blacklist, Blacklist};
pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ContainerSection, IndexSection, IndexSource, RawConfigFile, ToolsSection,
};
