// src/recipe/meta.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{RecipeshardError, Result};
use crate::fs::FileSystem;
use crate::recipe::RecipeRef;
use crate::types::NoarchKind;

/// Recipe metadata as read from `meta.toml`.
///
/// ```toml
/// [package]
/// name = "samtools"
/// version = "1.9"
///
/// [build]
/// number = 2
///
/// [requirements]
/// build = ["gcc"]
/// host = ["htslib 1.9", "python"]
/// run = ["htslib"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeMeta {
    pub package: PackageSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub requirements: Requirements,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildSection {
    #[serde(default)]
    pub number: u64,

    /// Explicit build string; overrides the computed one.
    #[serde(default)]
    pub string: Option<String>,

    #[serde(default)]
    pub noarch: Option<NoarchKind>,

    #[serde(default)]
    pub skip: bool,
}

/// Requirement specs, e.g. `"htslib >=1.9"`. Only the first token (the
/// package name) matters for dependency resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub build: Vec<String>,
    #[serde(default)]
    pub host: Vec<String>,
    #[serde(default)]
    pub run: Vec<String>,
}

impl Requirements {
    pub fn build_names(&self) -> impl Iterator<Item = &str> {
        self.build.iter().filter_map(|s| dep_name(s))
    }

    pub fn host_names(&self) -> impl Iterator<Item = &str> {
        self.host.iter().filter_map(|s| dep_name(s))
    }

    pub fn run_names(&self) -> impl Iterator<Item = &str> {
        self.run.iter().filter_map(|s| dep_name(s))
    }

    /// Every dependency name across build, host and run.
    pub fn all_names(&self) -> BTreeSet<&str> {
        self.build_names()
            .chain(self.host_names())
            .chain(self.run_names())
            .collect()
    }
}

/// Package name part of a requirement spec (pins stripped).
pub fn dep_name(spec: &str) -> Option<&str> {
    spec.split_whitespace().next()
}

/// Fold `-` to `_` so that `r-base` and the variant key `r_base` compare equal.
pub fn normalize_dep_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Parse metadata for `recipe` from the contents of its `meta.toml`.
pub fn parse_meta(recipe: &RecipeRef, contents: &str) -> Result<RecipeMeta> {
    toml::from_str(contents).map_err(|e| RecipeshardError::render(recipe, e))
}

/// Source of recipe metadata.
pub trait MetadataSource: Send + Sync {
    fn load(&self, recipe: &RecipeRef) -> Result<RecipeMeta>;
}

/// Reads `meta.toml` through a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct FsMetadataSource {
    fs: Arc<dyn FileSystem>,
}

impl FsMetadataSource {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl MetadataSource for FsMetadataSource {
    fn load(&self, recipe: &RecipeRef) -> Result<RecipeMeta> {
        let path = recipe.meta_path();
        debug!(recipe = %recipe, path = ?path, "loading recipe metadata");
        let contents = self
            .fs
            .read_to_string(&path)
            .map_err(|e| RecipeshardError::render(recipe, format!("{e:#}")))?;
        parse_meta(recipe, &contents)
    }
}
