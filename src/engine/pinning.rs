// src/engine/pinning.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::info;

use crate::config::{Blacklist, ConfigFile};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::pinning::{PackageIndex, PinningChecker, PinningState, VariantRenderer};
use crate::recipe::{discover_recipes, filter_blacklisted, RecipeRef};

/// Input of the `pinning` command.
#[derive(Debug, Clone)]
pub struct PinningRequest {
    pub recipe_folder: PathBuf,
    pub config: ConfigFile,
    pub packages: Vec<String>,
    /// Variant keys whose recipes are reported as `SKIP`.
    pub skip_variant_keys: BTreeSet<String>,
}

/// Per-recipe states plus how many recipes carry each flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinningSummary {
    pub results: Vec<(RecipeRef, PinningState)>,
    pub tally: BTreeMap<&'static str, usize>,
}

impl PinningSummary {
    pub fn from_results(results: Vec<(RecipeRef, PinningState)>) -> Self {
        let mut tally: BTreeMap<&'static str, usize> =
            PinningState::all_flag_names().map(|name| (name, 0)).collect();
        for (_, state) in &results {
            for name in state.flag_names() {
                *tally.entry(name).or_default() += 1;
            }
        }
        Self { results, tally }
    }

    /// Recipes that need a build-number bump.
    pub fn needs_bump(&self) -> impl Iterator<Item = &RecipeRef> {
        self.results
            .iter()
            .filter(|(_, state)| state.needs_bump())
            .map(|(recipe, _)| recipe)
    }

    pub fn failed(&self) -> impl Iterator<Item = &RecipeRef> {
        self.results
            .iter()
            .filter(|(_, state)| state.failed())
            .map(|(recipe, _)| recipe)
    }
}

/// Classify every selected recipe against `index` under the configured
/// variants.
pub fn check_recipes(
    request: &PinningRequest,
    fs: &dyn FileSystem,
    renderer: &dyn VariantRenderer,
    index: &dyn PackageIndex,
) -> Result<PinningSummary> {
    let config = &request.config;
    let blacklist_paths: Vec<PathBuf> = config
        .blacklists
        .iter()
        .map(|p| config.resolve(p))
        .collect();
    let blacklist = Blacklist::load(fs, &blacklist_paths)?;

    let recipes = discover_recipes(fs, &request.recipe_folder, &request.packages)?;
    let recipes = filter_blacklisted(recipes, &blacklist);
    info!(recipes = recipes.len(), "checking pinnings");

    let checker = PinningChecker::new(renderer, index).with_platform(config.tools.platform);
    let results = checker.check_all(&recipes, &config.variants, &request.skip_variant_keys)?;

    let summary = PinningSummary::from_results(results);
    info!(tally = ?summary.tally, "pinning check finished");
    Ok(summary)
}
