use std::collections::BTreeSet;

use proptest::prelude::*;
use recipeshard::dag::{partition_units, select_shard, DependencyGraph, ShardSpec};
use recipeshard::errors::RecipeshardError;
use recipeshard_test_utils::builders::graph_of;

fn names(graph: &DependencyGraph) -> Vec<String> {
    graph.packages().map(|s| s.to_string()).collect()
}

#[test]
fn components_are_distributed_round_robin() {
    let graph = graph_of(&["A", "B", "C", "D"], &[("B", "C")]);

    assert_eq!(
        partition_units(&graph, false),
        vec![
            vec!["A".to_string()],
            vec!["B".to_string(), "C".to_string()],
            vec!["D".to_string()],
        ]
    );

    let shard0 = select_shard(&graph, &ShardSpec::new(2, 0).unwrap(), false);
    let shard1 = select_shard(&graph, &ShardSpec::new(2, 1).unwrap(), false);

    assert_eq!(names(&shard0), vec!["A", "D"]);
    assert_eq!(names(&shard1), vec!["B", "C"]);
    assert_eq!(shard1.dependents_of("B"), vec!["C"]);
}

#[test]
fn shard_index_must_be_below_count() {
    assert!(matches!(
        ShardSpec::new(2, 2),
        Err(RecipeshardError::ConfigError(_))
    ));
    assert!(matches!(
        ShardSpec::new(0, 0),
        Err(RecipeshardError::ConfigError(_))
    ));
    assert!(ShardSpec::new(2, 1).is_ok());
}

#[test]
fn more_shards_than_units_leaves_trailing_shards_empty() {
    let graph = graph_of(&["A", "B", "C", "D"], &[("B", "C")]);

    let shard = select_shard(&graph, &ShardSpec::new(5, 1).unwrap(), false);
    assert_eq!(names(&shard), vec!["B", "C"]);

    let empty = select_shard(&graph, &ShardSpec::new(5, 4).unwrap(), false);
    assert!(empty.is_empty());
}

#[test]
fn test_only_splits_every_package() {
    let graph = graph_of(&["A", "B", "C", "D"], &[("B", "C")]);

    let shard0 = select_shard(&graph, &ShardSpec::new(2, 0).unwrap(), true);
    let shard1 = select_shard(&graph, &ShardSpec::new(2, 1).unwrap(), true);

    assert_eq!(names(&shard0), vec!["A", "C"]);
    assert_eq!(names(&shard1), vec!["B", "D"]);
    assert!(shard1.dependents_of("B").is_empty());
}

#[test]
fn single_shard_is_the_whole_graph() {
    let graph = graph_of(&["x", "y", "z"], &[("x", "y"), ("y", "z")]);
    let shard = select_shard(&graph, &ShardSpec::single(), false);

    assert_eq!(names(&shard), names(&graph));
    assert_eq!(shard.topological_order().unwrap(), vec!["x", "y", "z"]);
}

/// Random DAG over `p0..pN`: edges only go from lower to higher index.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = DependencyGraph> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec((0..n, 0..n), 0..(2 * n)).prop_map(move |pairs| {
            let nodes: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
            let mut graph = DependencyGraph::new();
            for node in &nodes {
                graph.add_package(node);
            }
            for (a, b) in pairs {
                if a < b {
                    graph.add_dependency(&nodes[a], &nodes[b]);
                }
            }
            graph
        })
    })
}

proptest! {
    #[test]
    fn shards_partition_the_graph(
        graph in dag_strategy(12),
        count in 1..6usize,
        test_only in any::<bool>(),
    ) {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for index in 0..count {
            let spec = ShardSpec::new(count, index).unwrap();
            let shard = select_shard(&graph, &spec, test_only);
            for name in shard.packages() {
                prop_assert!(seen.insert(name.to_string()), "{} in two shards", name);
            }
        }
        let all: BTreeSet<String> = graph.packages().map(|s| s.to_string()).collect();
        prop_assert_eq!(seen, all);
    }

    #[test]
    fn connected_packages_share_a_shard(
        graph in dag_strategy(12),
        count in 1..6usize,
    ) {
        for index in 0..count {
            let spec = ShardSpec::new(count, index).unwrap();
            let shard = select_shard(&graph, &spec, false);
            for name in shard.packages() {
                for dep in graph.dependencies_of(name) {
                    prop_assert!(shard.contains(dep));
                }
                for dependent in graph.dependents_of(name) {
                    prop_assert!(shard.contains(dependent));
                }
            }
        }
    }

    #[test]
    fn partitioning_is_deterministic(
        graph in dag_strategy(10),
        count in 1..4usize,
    ) {
        for index in 0..count {
            let spec = ShardSpec::new(count, index).unwrap();
            let first = select_shard(&graph, &spec, false);
            let second = select_shard(&graph.clone(), &spec, false);
            prop_assert_eq!(names(&first), names(&second));
        }
    }
}
