// src/dag/report.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{error, info};

use crate::recipe::{PackageName, RecipeRef, Target};

/// One failed (recipe, target) attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTarget {
    pub recipe: RecipeRef,
    pub target: Target,
}

/// An upload that did not go through. The artifact itself is fine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedUpload {
    Artifact(PathBuf),
    Image(String),
}

impl fmt::Display for FailedUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedUpload::Artifact(pkg) => write!(f, "{}", pkg.display()),
            FailedUpload::Image(image) => write!(f, "image {image}"),
        }
    }
}

/// Outcome of one scheduling run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Recipes whose targets all succeeded.
    pub built: Vec<RecipeRef>,
    /// Recipes not attempted because a dependency failed.
    pub skipped: Vec<RecipeRef>,
    pub failed: Vec<FailedTarget>,
    /// Skip ledger at the end of the run.
    pub skip_reasons: BTreeMap<PackageName, Vec<RecipeRef>>,
    pub failed_uploads: Vec<FailedUpload>,
    /// Number of recipes in the shard.
    pub total: usize,
    pub success: bool,
}

impl BuildReport {
    /// Report for a run with nothing to do.
    pub fn empty() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Fix `success` from the collected failures.
    pub fn finalize(mut self) -> Self {
        self.success = self.failed.is_empty() && self.failed_uploads.is_empty();
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Distinct recipes with at least one failed target, in failure order.
    pub fn failed_recipes(&self) -> Vec<&RecipeRef> {
        let mut out: Vec<&RecipeRef> = Vec::new();
        for failure in &self.failed {
            if !out.contains(&&failure.recipe) {
                out.push(&failure.recipe);
            }
        }
        out
    }

    /// Emit the end-of-run summary.
    pub fn log_summary(&self) {
        if self.success {
            info!(
                "BUILD SUMMARY: successfully built {} of {} recipes",
                self.built.len(),
                self.total
            );
            return;
        }

        error!(
            "BUILD SUMMARY: of {} recipes, {} failed and {} were skipped. \
             Details of recipes and environments follow.",
            self.total,
            self.failed_recipes().len(),
            self.skipped.len()
        );

        if !self.built.is_empty() {
            error!(
                "BUILD SUMMARY: while the entire build failed, \
                 the following recipes were built successfully:\n{}",
                join_lines(self.built.iter())
            );
        }

        for failure in &self.failed {
            error!(
                "BUILD SUMMARY: FAILED recipe {}, environment {}",
                failure.target,
                failure.target.envstring()
            );
        }

        for (name, blockers) in &self.skip_reasons {
            error!(
                "BUILD SUMMARY: SKIPPED recipe {} due to failed dependencies {}",
                name,
                blockers
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        if !self.failed_uploads.is_empty() {
            error!(
                "UPLOAD SUMMARY: the following packages failed to upload:\n{}",
                join_lines(self.failed_uploads.iter())
            );
        }
    }
}

fn join_lines<T: fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join("\n")
}
