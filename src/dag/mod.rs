// src/dag/mod.rs

//! Dependency graph, sharding and scheduling.
//!
//! - [`graph`] holds the directed graph over package names.
//! - [`builder`] derives that graph from recipe metadata.
//! - [`shard`] splits the graph into statically assigned shards.
//! - [`ledger`] tracks packages blocked by failed dependencies.
//! - [`report`] aggregates the outcome of a run.
//! - [`scheduler`] runs one shard in dependency order.

pub mod builder;
pub mod graph;
pub mod ledger;
pub mod report;
pub mod scheduler;
pub mod shard;

pub use builder::{build_dependency_graph, RecipeGraph};
pub use graph::DependencyGraph;
pub use ledger::SkipLedger;
pub use report::{BuildReport, FailedTarget, FailedUpload};
pub use scheduler::BuildScheduler;
pub use shard::{assign_buckets, partition_units, select_shard, ShardSpec};
