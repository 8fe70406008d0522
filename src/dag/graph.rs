// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::Dfs;
use petgraph::Direction;

use crate::errors::{RecipeshardError, Result};
use crate::recipe::PackageName;

/// Directed graph over package names.
///
/// Edge direction: dependency -> dependent. For a package `B` that lists
/// `A` in its requirements we add the edge `A -> B`, so `A` builds first.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<PackageName, ()>,
    nodes: BTreeMap<PackageName, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node for `name` if it is not there yet.
    pub fn add_package(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.nodes.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), idx);
        idx
    }

    /// Record that `dependent` depends on `dependency`. Both nodes are
    /// created on demand; repeated edges are collapsed.
    pub fn add_dependency(&mut self, dependency: &str, dependent: &str) {
        let from = self.add_package(dependency);
        let to = self.add_package(dependent);
        self.graph.update_edge(from, to, ());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All package names, sorted.
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Direct dependencies of `name` (sorted).
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Direct dependents of `name` (sorted).
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    fn neighbors(&self, name: &str, dir: Direction) -> Vec<&str> {
        let Some(idx) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .neighbors_directed(*idx, dir)
            .map(|n| self.graph[n].as_str())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Every package transitively depending on `name`, excluding `name`.
    pub fn descendants(&self, name: &str) -> BTreeSet<PackageName> {
        let Some(start) = self.nodes.get(name) else {
            return BTreeSet::new();
        };

        let mut dfs = Dfs::new(&self.graph, *start);
        let mut out = BTreeSet::new();
        while let Some(nx) = dfs.next(&self.graph) {
            if nx != *start {
                out.insert(self.graph[nx].clone());
            }
        }
        out
    }

    /// Dependency order over all packages.
    ///
    /// Among packages that are ready at the same time the lexicographically
    /// smallest goes first, so the order only depends on the graph contents.
    pub fn topological_order(&self) -> Result<Vec<PackageName>> {
        if let Err(cycle) = toposort(&self.graph, None) {
            let node = &self.graph[cycle.node_id()];
            return Err(RecipeshardError::DagCycle(format!(
                "cycle detected in dependency graph involving package '{}'",
                node
            )));
        }

        let mut in_degree: BTreeMap<&str, usize> = self
            .packages()
            .map(|name| (name, self.dependencies_of(name).len()))
            .collect();

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());
            for dependent in self.dependents_of(name) {
                if let Some(deg) = in_degree.get_mut(dependent) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        Ok(order)
    }

    /// Weakly connected components. Members are sorted, and the components
    /// are sorted by their member lists.
    pub fn connected_components(&self) -> Vec<Vec<PackageName>> {
        let mut sets = UnionFind::<usize>::new(self.graph.node_count());
        for edge in self.graph.raw_edges() {
            sets.union(edge.source().index(), edge.target().index());
        }

        let mut groups: BTreeMap<usize, Vec<PackageName>> = BTreeMap::new();
        for (name, idx) in &self.nodes {
            let root = sets.find_mut(idx.index());
            groups.entry(root).or_default().push(name.clone());
        }

        // `nodes` iterates in name order, so every group is already sorted.
        let mut components: Vec<Vec<PackageName>> = groups.into_values().collect();
        components.sort();
        components
    }

    /// Subgraph induced by `names`. Unknown names are ignored.
    pub fn subgraph<'a, I>(&self, names: I) -> DependencyGraph
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keep: BTreeSet<&str> = names
            .into_iter()
            .filter(|name| self.contains(name))
            .collect();

        let mut sub = DependencyGraph::new();
        for name in &keep {
            sub.add_package(name);
        }
        for name in &keep {
            for dependent in self.dependents_of(name) {
                if keep.contains(dependent) {
                    sub.add_dependency(name, dependent);
                }
            }
        }
        sub
    }
}
