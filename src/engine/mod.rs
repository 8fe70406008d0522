// src/engine/mod.rs

//! End-to-end pipelines behind the CLI commands.
//!
//! - [`build`]: discover, filter, plan, graph, shard, schedule.
//! - [`pinning`]: classify recipes after a pinning change.

pub mod build;
pub mod pinning;

pub use build::{build_recipes, BuildRequest, BuildServices};
pub use pinning::{check_recipes, PinningRequest, PinningSummary};
