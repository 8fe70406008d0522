// src/changes/mod.rs

//! Version-control based recipe pre-filtering (`--quick`).

pub mod git;
pub mod quick;

use std::path::{Path, PathBuf};

use crate::exec::BoxFuture;

pub use git::GitChangeDetector;
pub use quick::{changed_recipes, newly_unblacklisted, quick_filter};

/// Reference compared against when none is given.
pub const DEFAULT_GIT_REF: &str = "origin/master";

/// Version-control diff service.
pub trait ChangeDetector: Send + Sync {
    /// Files below `folder` changed since `git_ref`, relative to `folder`.
    fn changed_files<'a>(
        &'a self,
        folder: &'a Path,
        git_ref: &'a str,
    ) -> BoxFuture<'a, Vec<PathBuf>>;

    /// Contents of `path` at `git_ref`, or `None` if it did not exist.
    fn file_at_ref<'a>(
        &'a self,
        path: &'a Path,
        git_ref: &'a str,
    ) -> BoxFuture<'a, Option<String>>;
}
