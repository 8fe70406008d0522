// src/pinning/render.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use blake3::Hasher;
use tracing::debug;

use crate::errors::Result;
use crate::pinning::legacy::LEGACY_TAGS;
use crate::recipe::meta::normalize_dep_name;
use crate::recipe::{MetadataSource, RecipeMeta, RecipeRef, Requirements};
use crate::types::NoarchKind;

/// Build configuration: variant key -> candidate values.
///
/// ```toml
/// [variants]
/// python = ["3.8", "3.9"]
/// htslib = ["1.15"]
/// ```
pub type BuildConfig = BTreeMap<String, Vec<String>>;

/// One rendered configuration of a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub version: String,
    pub build_number: u64,
    pub build_string: String,
    pub noarch: Option<NoarchKind>,
    /// Variant keys this rendering depends on.
    pub used_vars: BTreeSet<String>,
    pub requirements: Requirements,
    pub skip: bool,
}

impl Variant {
    /// Build + host requirement names, `-` folded to `_`.
    pub fn build_host_names(&self) -> Vec<String> {
        self.requirements
            .build_names()
            .chain(self.requirements.host_names())
            .map(normalize_dep_name)
            .collect()
    }

    /// Used variant keys minus keys that only show up as build-time
    /// requirements; the set that feeds into the build hash.
    pub fn hash_relevant_vars(&self) -> BTreeSet<String> {
        let runtime: BTreeSet<String> = self
            .requirements
            .host_names()
            .chain(self.requirements.run_names())
            .map(normalize_dep_name)
            .collect();
        let build: BTreeSet<String> = self
            .requirements
            .build_names()
            .map(normalize_dep_name)
            .collect();

        self.used_vars
            .iter()
            .filter(|key| {
                let key = normalize_dep_name(key);
                runtime.contains(&key) || !build.contains(&key)
            })
            .cloned()
            .collect()
    }
}

/// Renders a recipe into its variants under a build configuration.
///
/// `Ok(None)` means the renderer produced nothing usable for the recipe.
pub trait VariantRenderer: Send + Sync {
    fn render(&self, recipe: &RecipeRef, config: &BuildConfig) -> Result<Option<Vec<Variant>>>;
}

/// Renderer over `meta.toml` metadata.
///
/// Variant keys are matched against requirement names; every combination of
/// the used keys' values becomes one variant.
#[derive(Clone)]
pub struct MetaRenderer {
    source: Arc<dyn MetadataSource>,
}

impl MetaRenderer {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Render already loaded metadata. `None` if a used key has no values.
    pub fn render_meta(meta: &RecipeMeta, config: &BuildConfig) -> Option<Vec<Variant>> {
        let deps: BTreeSet<String> = meta
            .requirements
            .all_names()
            .into_iter()
            .map(normalize_dep_name)
            .collect();

        let used: BTreeMap<&String, &Vec<String>> = config
            .iter()
            .filter(|(key, _)| deps.contains(&normalize_dep_name(key)))
            .collect();

        if let Some((key, _)) = used.iter().find(|(_, values)| values.is_empty()) {
            debug!(package = %meta.package.name, key = %key, "variant key has no values");
            return None;
        }

        let mut assignments = vec![BTreeMap::<String, String>::new()];
        for (key, values) in &used {
            assignments = assignments
                .into_iter()
                .flat_map(|assignment| {
                    values.iter().map(move |value| {
                        let mut next = assignment.clone();
                        next.insert((*key).clone(), value.clone());
                        next
                    })
                })
                .collect();
        }

        let used_vars: BTreeSet<String> = used.keys().map(|k| (*k).clone()).collect();
        let variants = assignments
            .into_iter()
            .map(|assignment| {
                let mut variant = Variant {
                    name: meta.package.name.clone(),
                    version: meta.package.version.clone(),
                    build_number: meta.build.number,
                    build_string: String::new(),
                    noarch: meta.build.noarch,
                    used_vars: used_vars.clone(),
                    requirements: meta.requirements.clone(),
                    skip: meta.build.skip,
                };
                variant.build_string = match &meta.build.string {
                    Some(explicit) => explicit.clone(),
                    None => compute_build_string(&variant, &assignment),
                };
                variant
            })
            .collect();

        Some(variants)
    }
}

impl VariantRenderer for MetaRenderer {
    fn render(&self, recipe: &RecipeRef, config: &BuildConfig) -> Result<Option<Vec<Variant>>> {
        let meta = self.source.load(recipe)?;
        Ok(Self::render_meta(&meta, config))
    }
}

/// `<legacy tags><h + 7 hex>_<number>`, or just `<number>` when there is
/// neither a tag nor anything to hash.
fn compute_build_string(variant: &Variant, assignment: &BTreeMap<String, String>) -> String {
    let runtime: BTreeSet<String> = variant
        .requirements
        .host_names()
        .chain(variant.requirements.run_names())
        .map(normalize_dep_name)
        .collect();

    let mut prefix = String::new();
    let mut tagged: BTreeSet<String> = BTreeSet::new();
    if variant.noarch == Some(NoarchKind::Python) {
        prefix.push_str("py");
        tagged.insert("python".to_string());
    } else {
        for tag in LEGACY_TAGS.iter() {
            if !runtime.contains(tag.dependency) {
                continue;
            }
            let value = assignment
                .iter()
                .find(|(key, _)| normalize_dep_name(key) == tag.dependency)
                .map(|(_, value)| value);
            if let Some(rendered) = value.and_then(|v| tag.render(v)) {
                prefix.push_str(&rendered);
                tagged.insert(tag.dependency.to_string());
            }
        }
    }

    let hashed: Vec<String> = variant
        .hash_relevant_vars()
        .into_iter()
        .filter(|key| !tagged.contains(&normalize_dep_name(key)))
        .filter_map(|key| assignment.get(&key).map(|value| format!("{key}={value}")))
        .collect();

    let hash = if hashed.is_empty() {
        String::new()
    } else {
        let mut hasher = Hasher::new();
        hasher.update(hashed.join(";").as_bytes());
        format!("h{}", &hasher.finalize().to_hex()[..7])
    };

    if prefix.is_empty() && hash.is_empty() {
        variant.build_number.to_string()
    } else {
        format!("{prefix}{hash}_{}", variant.build_number)
    }
}
