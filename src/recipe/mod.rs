// src/recipe/mod.rs

//! Recipes and their build targets.
//!
//! - [`meta`] loads per-recipe metadata (`meta.toml`).
//! - [`catalog`] discovers recipes below a recipe folder.
//! - [`matrix`] expands the configured environment matrix.
//! - [`targets`] turns recipes x environments into concrete [`Target`]s.

pub mod catalog;
pub mod matrix;
pub mod meta;
pub mod targets;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub use catalog::{discover_recipes, filter_blacklisted, META_FILE};
pub use matrix::EnvMatrix;
pub use meta::{FsMetadataSource, MetadataSource, RecipeMeta, Requirements};
pub use targets::TargetPlanner;

/// Canonical package name type used for graph nodes.
pub type PackageName = String;

/// One build environment: variable name -> value.
pub type Env = BTreeMap<String, String>;

/// Identifier + location of a single recipe.
///
/// `id` is the recipe directory relative to the recipe folder, using `/`
/// separators; blacklists and change detection refer to recipes by `id`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecipeRef {
    id: String,
    path: PathBuf,
}

impl RecipeRef {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the metadata file for this recipe.
    pub fn meta_path(&self) -> PathBuf {
        self.path.join(META_FILE)
    }
}

impl fmt::Display for RecipeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// One environment-variant build unit of a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub recipe: RecipeRef,
    pub env: Env,
    /// Artifact the build is expected to produce.
    pub pkg: PathBuf,
}

impl Target {
    pub fn new(recipe: RecipeRef, env: Env, pkg: impl Into<PathBuf>) -> Self {
        Self {
            recipe,
            env,
            pkg: pkg.into(),
        }
    }

    /// `KEY=value;KEY2=value2`, sorted by key.
    pub fn envstring(&self) -> String {
        self.env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pkg.display())
    }
}
