// src/changes/quick.rs

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info};

use crate::changes::ChangeDetector;
use crate::config::{parse_blacklist, Blacklist, RawConfigFile};
use crate::errors::Result;
use crate::recipe::RecipeRef;

/// Ids of recipes blacklisted at `git_ref` but not any more.
///
/// The config file as it was at `git_ref` names the blacklist files to
/// read, relative to the config's directory; missing files count as empty.
pub async fn newly_unblacklisted(
    detector: &dyn ChangeDetector,
    config_path: &Path,
    current: &Blacklist,
    git_ref: &str,
) -> Result<BTreeSet<String>> {
    let Some(old_config) = detector.file_at_ref(config_path, git_ref).await? else {
        debug!(config = ?config_path, git_ref, "config did not exist at ref");
        return Ok(BTreeSet::new());
    };
    let old_config: RawConfigFile = toml::from_str(&old_config)?;
    let root = config_path.parent().unwrap_or(Path::new(""));

    let mut previous = BTreeSet::new();
    for file in &old_config.blacklists {
        let path = if file.is_absolute() {
            file.clone()
        } else {
            root.join(file)
        };
        if let Some(contents) = detector.file_at_ref(&path, git_ref).await? {
            previous.extend(parse_blacklist(&contents));
        }
    }

    Ok(previous
        .into_iter()
        .filter(|id| !current.contains(id))
        .collect())
}

/// Ids of recipes with files changed since `git_ref`.
pub async fn changed_recipes(
    detector: &dyn ChangeDetector,
    recipe_folder: &Path,
    recipes: &[RecipeRef],
    git_ref: &str,
) -> Result<BTreeSet<String>> {
    let files = detector.changed_files(recipe_folder, git_ref).await?;
    Ok(recipes
        .iter()
        .filter(|recipe| files.iter().any(|f| f.starts_with(recipe.id())))
        .map(|recipe| recipe.id().to_string())
        .collect())
}

/// Keep only recipes that changed or were removed from a blacklist since
/// `git_ref`.
pub async fn quick_filter(
    detector: &dyn ChangeDetector,
    recipes: Vec<RecipeRef>,
    recipe_folder: &Path,
    config_path: &Path,
    blacklist: &Blacklist,
    git_ref: &str,
) -> Result<Vec<RecipeRef>> {
    let unblacklisted = newly_unblacklisted(detector, config_path, blacklist, git_ref).await?;
    debug!(?unblacklisted, "unblacklisted recipes");

    let changed = changed_recipes(detector, recipe_folder, &recipes, git_ref).await?;
    debug!(?changed, "changed recipes");

    let before = recipes.len();
    let kept: Vec<RecipeRef> = recipes
        .into_iter()
        .filter(|r| changed.contains(r.id()) || unblacklisted.contains(r.id()))
        .collect();

    info!(before, after = kept.len(), git_ref, "quick-filtered recipes");
    Ok(kept)
}
