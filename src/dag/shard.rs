// src/dag/shard.rs

//! Static partitioning of the dependency graph into shards.
//!
//! Partitioning is a pure function of the graph, the shard count, the shard
//! index and the test-only flag: independently launched processes that
//! agree on those inputs agree on the partition.

use crate::dag::graph::DependencyGraph;
use crate::errors::{RecipeshardError, Result};
use crate::recipe::PackageName;

/// Shard count and selected shard index, `index < count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSpec {
    count: usize,
    index: usize,
}

impl ShardSpec {
    pub fn new(count: usize, index: usize) -> Result<Self> {
        if count == 0 {
            return Err(RecipeshardError::ConfigError(
                "SUBDAGS must be at least 1".to_string(),
            ));
        }
        if index >= count {
            return Err(RecipeshardError::ConfigError(format!(
                "SUBDAG={index} (zero-based) but only SUBDAGS={count} subdags are available"
            )));
        }
        Ok(Self { count, index })
    }

    /// The whole graph as one shard.
    pub fn single() -> Self {
        Self { count: 1, index: 0 }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl Default for ShardSpec {
    fn default() -> Self {
        Self::single()
    }
}

/// Atomic units of partitioning, sorted.
///
/// In test-only mode each package is its own unit; otherwise a unit is a
/// weakly connected component.
pub fn partition_units(graph: &DependencyGraph, test_only: bool) -> Vec<Vec<PackageName>> {
    if test_only {
        graph.packages().map(|name| vec![name.to_string()]).collect()
    } else {
        graph.connected_components()
    }
}

/// Group sorted units into at most `count` buckets.
///
/// With fewer buckets than units, unit `k` goes to bucket `k % count`.
/// Otherwise every unit is its own bucket and there are fewer buckets than
/// `count`.
pub fn assign_buckets(units: Vec<Vec<PackageName>>, count: usize) -> Vec<Vec<PackageName>> {
    if count == 0 || count >= units.len() {
        return units;
    }

    let mut buckets: Vec<Vec<PackageName>> = vec![Vec::new(); count];
    for (k, unit) in units.into_iter().enumerate() {
        buckets[k % count].extend(unit);
    }
    buckets
}

/// Subgraph to execute for `spec`. May be empty.
pub fn select_shard(graph: &DependencyGraph, spec: &ShardSpec, test_only: bool) -> DependencyGraph {
    let units = partition_units(graph, test_only);
    let buckets = assign_buckets(units, spec.count());

    match buckets.get(spec.index()) {
        Some(members) => graph.subgraph(members.iter().map(|s| s.as_str())),
        None => DependencyGraph::new(),
    }
}
