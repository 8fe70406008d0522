// src/pinning/mod.rs

//! Freshness classification: which recipes are stale after a pinning change.
//!
//! - [`state`] holds the [`PinningState`] flag set.
//! - [`legacy`] normalises legacy build-string prefixes.
//! - [`index`] is the package index query service.
//! - [`render`] turns recipes into variants under a build config.
//! - [`check`] classifies each variant and combines the result per recipe.

pub mod check;
pub mod index;
pub mod legacy;
pub mod render;
pub mod state;

pub use check::{has_invalid_build_string, skip_for_variants, PinningChecker};
pub use index::{IndexQuery, PackageIndex, PackageRecord, RepoData};
pub use render::{BuildConfig, MetaRenderer, Variant, VariantRenderer};
pub use state::PinningState;
