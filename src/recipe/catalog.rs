// src/recipe/catalog.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::Blacklist;
use crate::fs::FileSystem;
use crate::recipe::RecipeRef;

/// File that marks a directory as a recipe.
pub const META_FILE: &str = "meta.toml";

/// Find all recipes below `recipe_folder` whose id matches one of `patterns`.
///
/// A recipe is any directory containing [`META_FILE`]; nested recipes
/// (e.g. `bowtie2/2.2.9`) are found as well. Patterns are globs over the
/// recipe id, `*` selects everything. Results are sorted by id.
pub fn discover_recipes(
    fs: &dyn FileSystem,
    recipe_folder: &Path,
    patterns: &[String],
) -> Result<Vec<RecipeRef>> {
    let selector = build_selector(patterns)?;

    let mut found = Vec::new();
    let mut stack: Vec<PathBuf> = vec![recipe_folder.to_path_buf()];

    while let Some(dir) = stack.pop() {
        if fs.is_file(&dir.join(META_FILE)) && dir != recipe_folder {
            let id = recipe_id(recipe_folder, &dir);
            if selector.is_match(&id) {
                found.push(RecipeRef::new(id, dir.clone()));
            } else {
                debug!(recipe = %id, "recipe not selected by package patterns");
            }
        }

        for entry in fs.read_dir(&dir)? {
            if fs.is_dir(&entry) {
                stack.push(entry);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Drop recipes listed in the blacklist.
pub fn filter_blacklisted(recipes: Vec<RecipeRef>, blacklist: &Blacklist) -> Vec<RecipeRef> {
    recipes
        .into_iter()
        .filter(|recipe| {
            let listed = blacklist.contains(recipe.id());
            if listed {
                debug!(recipe = %recipe, "blacklisted");
            }
            !listed
        })
        .collect()
}

fn build_selector(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    if patterns.is_empty() {
        builder.add(Glob::new("*")?);
    }
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid package pattern {pat:?}"))?;
        builder.add(glob);
    }
    builder.build().context("building package pattern set")
}

/// Relative path from the recipe folder, `/`-separated.
fn recipe_id(recipe_folder: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(recipe_folder).unwrap_or(dir);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
