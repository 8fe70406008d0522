// src/pinning/check.rs

use std::collections::BTreeSet;

use tracing::{debug, error, info};

use crate::errors::Result;
use crate::pinning::index::{IndexQuery, PackageIndex};
use crate::pinning::legacy::legacy_equivalent;
use crate::pinning::render::{BuildConfig, Variant, VariantRenderer};
use crate::pinning::state::PinningState;
use crate::recipe::RecipeRef;
use crate::types::{NoarchKind, Platform};

/// True if the build string is empty or has characters outside
/// `[A-Za-z0-9_.]`.
pub fn has_invalid_build_string(variant: &Variant) -> bool {
    let s = &variant.build_string;
    s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// True if the variant's hash-relevant keys intersect `variant_keys`.
pub fn skip_for_variants(variant: &Variant, variant_keys: &BTreeSet<String>) -> bool {
    !variant.hash_relevant_vars().is_disjoint(variant_keys)
}

/// Classifies recipes against a package index.
pub struct PinningChecker<'a> {
    renderer: &'a dyn VariantRenderer,
    index: &'a dyn PackageIndex,
    native: Platform,
}

impl<'a> PinningChecker<'a> {
    pub fn new(renderer: &'a dyn VariantRenderer, index: &'a dyn PackageIndex) -> Self {
        Self {
            renderer,
            index,
            native: Platform::Linux,
        }
    }

    /// Platform whose builds count alongside `noarch` (default linux-64).
    pub fn with_platform(mut self, native: Platform) -> Self {
        self.native = native;
        self
    }

    fn platforms(&self) -> [Platform; 2] {
        [self.native, Platform::Noarch]
    }

    /// Determine whether `recipe` needs a build-number bump under `config`.
    ///
    /// Render failures yield `FAIL`; only index errors are returned as `Err`.
    pub fn check(
        &self,
        recipe: &RecipeRef,
        config: &BuildConfig,
        skip_variant_keys: &BTreeSet<String>,
    ) -> Result<PinningState> {
        debug!(recipe = %recipe, "rendering recipe");
        let variants = match self.renderer.render(recipe, config) {
            Ok(Some(variants)) => variants,
            Ok(None) => {
                error!(recipe = %recipe, "failed to render: renderer returned nothing");
                return Ok(PinningState::FAIL);
            }
            Err(e) => {
                error!(recipe = %recipe, error = %e, "failed to render");
                return Ok(PinningState::FAIL);
            }
        };

        if variants.iter().any(has_invalid_build_string) {
            error!(
                recipe = %recipe,
                "failed to get valid build strings; recipe probably needs \
                 build/skip instead of a dependency constraint"
            );
            return Ok(PinningState::FAIL);
        }

        let mut state = PinningState::empty();
        for variant in &variants {
            state |= self.classify_variant(variant, skip_variant_keys)?;
        }
        Ok(state)
    }

    /// Check several recipes, preserving input order.
    pub fn check_all(
        &self,
        recipes: &[RecipeRef],
        config: &BuildConfig,
        skip_variant_keys: &BTreeSet<String>,
    ) -> Result<Vec<(RecipeRef, PinningState)>> {
        recipes
            .iter()
            .map(|recipe| Ok((recipe.clone(), self.check(recipe, config, skip_variant_keys)?)))
            .collect()
    }

    /// Exactly one flag for a single variant; first matching rule wins.
    pub fn classify_variant(
        &self,
        variant: &Variant,
        skip_variant_keys: &BTreeSet<String>,
    ) -> Result<PinningState> {
        if variant.skip || skip_for_variants(variant, skip_variant_keys) {
            return Ok(PinningState::SKIP);
        }
        if self.have_noarch_python_build_number(variant)? {
            return Ok(PinningState::HAVE_NOARCH_VARIANT);
        }
        if self.have_variant(variant)? {
            return Ok(PinningState::HAVE);
        }
        if self.will_build_variant(variant)? {
            return Ok(PinningState::BUMPED);
        }
        info!(
            "Package {}={}={} missing!",
            variant.name, variant.version, variant.build_string
        );
        Ok(PinningState::BUMP)
    }

    /// `noarch: python` and the same version + build number is published for
    /// noarch.
    pub fn have_noarch_python_build_number(&self, variant: &Variant) -> Result<bool> {
        if variant.noarch != Some(NoarchKind::Python) {
            return Ok(false);
        }
        let query = IndexQuery::package(&variant.name, &variant.version)
            .build_number(variant.build_number)
            .platforms(&[Platform::Noarch]);
        let found = !self.index.query(&query)?.is_empty();
        if found {
            debug!(
                "Package {}={}[build_number={}, subdir=noarch] exists",
                variant.name, variant.version, variant.build_number
            );
        }
        Ok(found)
    }

    /// Exact name/version/build-string match, or a same-build-number build
    /// whose string matches after legacy prefix normalisation.
    pub fn have_variant(&self, variant: &Variant) -> Result<bool> {
        let platforms = self.platforms();
        let exact = IndexQuery::package(&variant.name, &variant.version)
            .build(&variant.build_string)
            .platforms(&platforms);
        if !self.index.query(&exact)?.is_empty() {
            debug!(
                "Package {}={}={} exists",
                variant.name, variant.version, variant.build_string
            );
            return Ok(true);
        }

        let build_deps = variant.build_host_names();
        let same_number = IndexQuery::package(&variant.name, &variant.version)
            .build_number(variant.build_number)
            .platforms(&platforms);
        for record in self.index.query(&same_number)? {
            if legacy_equivalent(&record.build, &variant.build_string, &build_deps) {
                debug!(
                    "Package {}={}={} exists",
                    variant.name, variant.version, record.build
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Every published build of this name/version has a lower build number.
    pub fn will_build_variant(&self, variant: &Variant) -> Result<bool> {
        let query =
            IndexQuery::package(&variant.name, &variant.version).platforms(&self.platforms());
        let numbers: Vec<u64> = self
            .index
            .query(&query)?
            .into_iter()
            .map(|rec| rec.build_number)
            .collect();
        let res = numbers.iter().all(|n| *n < variant.build_number);
        if res {
            debug!(
                "Package {}={} will be built already because {} < {}",
                variant.name,
                variant.version,
                numbers
                    .iter()
                    .max()
                    .map_or_else(|| "N/A".to_string(), u64::to_string),
                variant.build_number
            );
        }
        Ok(res)
    }
}
