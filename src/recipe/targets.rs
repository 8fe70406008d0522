// src/recipe/targets.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::Result;
use crate::pinning::index::{IndexQuery, PackageIndex};
use crate::pinning::render::{BuildConfig, MetaRenderer, Variant};
use crate::recipe::{Env, EnvMatrix, MetadataSource, RecipeRef, Target};
use crate::types::Platform;

/// Expands recipes over the env matrix and drops targets that need no build.
pub struct TargetPlanner<'a> {
    metadata: &'a dyn MetadataSource,
    index: &'a dyn PackageIndex,
    output_dir: PathBuf,
    platform: Platform,
    force: bool,
}

impl<'a> TargetPlanner<'a> {
    pub fn new(
        metadata: &'a dyn MetadataSource,
        index: &'a dyn PackageIndex,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            metadata,
            index,
            output_dir: output_dir.into(),
            platform: Platform::Linux,
            force: false,
        }
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Keep targets even when their package is already published.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Targets per recipe. Recipes that end up without targets are left out.
    pub fn plan(
        &self,
        recipes: &[RecipeRef],
        matrix: &EnvMatrix,
    ) -> Result<BTreeMap<RecipeRef, Vec<Target>>> {
        let envs = matrix.expand();
        let mut planned = BTreeMap::new();

        for recipe in recipes {
            let targets = self.targets_for(recipe, &envs)?;
            if targets.is_empty() {
                debug!(recipe = %recipe, "no targets left; dropping recipe");
                continue;
            }
            planned.insert(recipe.clone(), targets);
        }

        info!(
            recipes = planned.len(),
            targets = planned.values().map(Vec::len).sum::<usize>(),
            "planned build targets"
        );
        Ok(planned)
    }

    fn targets_for(&self, recipe: &RecipeRef, envs: &[Env]) -> Result<Vec<Target>> {
        let meta = self.metadata.load(recipe)?;
        let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
        let mut targets = Vec::new();

        for env in envs {
            let config: BuildConfig = env
                .iter()
                .map(|(k, v)| (k.clone(), vec![v.clone()]))
                .collect();
            let variants = MetaRenderer::render_meta(&meta, &config).unwrap_or_default();

            for variant in variants {
                if variant.skip {
                    debug!(recipe = %recipe, env = ?env, "variant skipped by recipe");
                    continue;
                }
                let pkg = self.package_path(&variant);
                // Targets are identified by their artifact.
                if !seen.insert(pkg.clone()) {
                    continue;
                }
                if !self.force && self.is_published(&variant)? {
                    debug!(recipe = %recipe, pkg = ?pkg, "already published; not building");
                    continue;
                }
                targets.push(Target::new(recipe.clone(), env.clone(), pkg));
            }
        }

        Ok(targets)
    }

    /// `<output_dir>/<subdir>/<name>-<version>-<build_string>.tar.bz2`
    pub fn package_path(&self, variant: &Variant) -> PathBuf {
        let platform = if variant.noarch.is_some() {
            Platform::Noarch
        } else {
            self.platform
        };
        package_path(&self.output_dir, platform, variant)
    }

    fn is_published(&self, variant: &Variant) -> Result<bool> {
        let query = IndexQuery::package(&variant.name, &variant.version)
            .build(&variant.build_string)
            .platforms(&[self.platform, Platform::Noarch]);
        Ok(!self.index.query(&query)?.is_empty())
    }
}

pub fn package_path(output_dir: &Path, platform: Platform, variant: &Variant) -> PathBuf {
    output_dir.join(platform.subdir()).join(format!(
        "{}-{}-{}.tar.bz2",
        variant.name, variant.version, variant.build_string
    ))
}

