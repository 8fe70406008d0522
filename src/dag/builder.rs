// src/dag/builder.rs

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::Blacklist;
use crate::dag::graph::DependencyGraph;
use crate::errors::Result;
use crate::recipe::{MetadataSource, PackageName, RecipeRef};

/// Dependency graph over the selected recipes plus the mapping between
/// package names and the recipes that produce them.
#[derive(Debug, Clone, Default)]
pub struct RecipeGraph {
    pub graph: DependencyGraph,
    name_to_recipes: BTreeMap<PackageName, Vec<RecipeRef>>,
    recipe_names: BTreeMap<RecipeRef, PackageName>,
}

impl RecipeGraph {
    /// Package name `recipe` builds, if it is part of the graph.
    pub fn name_of(&self, recipe: &RecipeRef) -> Option<&str> {
        self.recipe_names.get(recipe).map(|s| s.as_str())
    }

    /// Recipes contributing `name`, in the order they were given.
    pub fn recipes_for(&self, name: &str) -> &[RecipeRef] {
        self.name_to_recipes
            .get(name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn name_to_recipes(&self) -> &BTreeMap<PackageName, Vec<RecipeRef>> {
        &self.name_to_recipes
    }
}

/// Build the dependency graph for `recipes`.
///
/// Every non-blacklisted recipe becomes (part of) the node for its package
/// name. Requirements naming another node add an edge; names outside the
/// selection and a package depending on itself are ignored. A cycle is
/// reported as [`RecipeshardError::DagCycle`](crate::errors::RecipeshardError).
pub fn build_dependency_graph(
    recipes: &[RecipeRef],
    metadata: &dyn MetadataSource,
    blacklist: &Blacklist,
) -> Result<RecipeGraph> {
    let mut out = RecipeGraph::default();
    let mut requirements: Vec<(PackageName, Vec<String>)> = Vec::new();

    for recipe in recipes {
        if blacklist.contains(recipe.id()) {
            debug!(recipe = %recipe, "blacklisted, not adding to graph");
            continue;
        }

        let meta = metadata.load(recipe)?;
        let name = meta.package.name.clone();

        out.graph.add_package(&name);
        out.name_to_recipes
            .entry(name.clone())
            .or_default()
            .push(recipe.clone());
        out.recipe_names.insert(recipe.clone(), name.clone());

        let deps = meta
            .requirements
            .all_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        requirements.push((name, deps));
    }

    // Nodes are complete only after the first pass; edges need both ends.
    for (name, deps) in requirements {
        for dep in deps {
            if dep == name || !out.graph.contains(&dep) {
                continue;
            }
            out.graph.add_dependency(&dep, &name);
        }
    }

    // Fail early on cycles rather than at scheduling time.
    out.graph.topological_order()?;

    info!(
        packages = out.graph.len(),
        recipes = out.recipe_names.len(),
        "dependency graph built"
    );

    Ok(out)
}
