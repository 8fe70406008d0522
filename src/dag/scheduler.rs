// src/dag/scheduler.rs

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::dag::builder::RecipeGraph;
use crate::dag::graph::DependencyGraph;
use crate::dag::ledger::SkipLedger;
use crate::dag::report::{BuildReport, FailedTarget, FailedUpload};
use crate::errors::Result;
use crate::exec::{ArtifactUploader, BuildOutcome, ImageUploader, TargetBuilder, Workspace};
use crate::recipe::{PackageName, RecipeRef, Target};

struct ArtifactUpload {
    uploader: Box<dyn ArtifactUploader>,
    label: Option<String>,
}

struct ImageUpload {
    uploader: Box<dyn ImageUploader>,
    target: String,
}

/// Runs the recipes of one shard in dependency order.
///
/// Targets run strictly one after another: they share a single local
/// workspace which is purged after every attempt.
pub struct BuildScheduler {
    builder: Box<dyn TargetBuilder>,
    workspace: Box<dyn Workspace>,
    artifact_upload: Option<ArtifactUpload>,
    image_upload: Option<ImageUpload>,
    test_only: bool,
}

impl BuildScheduler {
    pub fn new(builder: Box<dyn TargetBuilder>, workspace: Box<dyn Workspace>) -> Self {
        Self {
            builder,
            workspace,
            artifact_upload: None,
            image_upload: None,
            test_only: false,
        }
    }

    /// Upload every successfully built artifact.
    pub fn with_artifact_upload(
        mut self,
        uploader: Box<dyn ArtifactUploader>,
        label: Option<String>,
    ) -> Self {
        self.artifact_upload = Some(ArtifactUpload { uploader, label });
        self
    }

    /// Push test images to `target`.
    pub fn with_image_upload(mut self, uploader: Box<dyn ImageUploader>, target: String) -> Self {
        self.image_upload = Some(ImageUpload { uploader, target });
        self
    }

    /// Only re-test recipes; nothing gets uploaded.
    pub fn test_only(mut self, test_only: bool) -> Self {
        self.test_only = test_only;
        self
    }

    /// Recipes of `shard` in execution order, each with its package name.
    pub fn build_order(
        shard: &DependencyGraph,
        recipes: &RecipeGraph,
    ) -> Result<Vec<(PackageName, RecipeRef)>> {
        let mut order = Vec::new();
        for name in shard.topological_order()? {
            for recipe in recipes.recipes_for(&name) {
                order.push((name.clone(), recipe.clone()));
            }
        }
        Ok(order)
    }

    /// Execute `shard`.
    ///
    /// Build and test failures are recorded and block every descendant
    /// package in the shard; they never abort the run. Upload failures are
    /// recorded but block nothing. A recipe without targets is neither built
    /// nor failed. An `Err` from the builder or the workspace aborts the run
    /// once the workspace has been purged.
    pub async fn schedule(
        &mut self,
        shard: &DependencyGraph,
        recipes: &RecipeGraph,
        targets: &BTreeMap<RecipeRef, Vec<Target>>,
    ) -> Result<BuildReport> {
        if shard.is_empty() {
            info!("Nothing to be done.");
            return Ok(BuildReport::empty());
        }

        let order = Self::build_order(shard, recipes)?;
        let mut report = BuildReport {
            total: order.len(),
            ..BuildReport::default()
        };
        let mut ledger = SkipLedger::new();

        for (name, recipe) in &order {
            if let Some(blockers) = ledger.blockers(name) {
                info!(
                    "BUILD SKIP: skipping {} because it depends on {} which had a failed build.",
                    recipe,
                    join_recipes(blockers)
                );
                report.skipped.push(recipe.clone());
                continue;
            }

            let recipe_targets = match targets.get(recipe) {
                Some(list) if !list.is_empty() => list,
                _ => {
                    warn!(recipe = %recipe, "no targets planned, not building");
                    continue;
                }
            };
            let mut recipe_success = true;

            for target in recipe_targets {
                let attempt = self.attempt(target).await;
                let purged = self.workspace.purge().await;
                let (outcome, failed_uploads) = attempt?;
                purged?;

                report.failed_uploads.extend(failed_uploads);

                if !outcome.success {
                    recipe_success = false;
                    report.failed.push(FailedTarget {
                        recipe: recipe.clone(),
                        target: target.clone(),
                    });
                    for descendant in shard.descendants(name) {
                        debug!(package = %descendant, blocker = %recipe, "blocking dependent");
                        ledger.block(&descendant, recipe);
                    }
                }
            }

            if recipe_success {
                report.built.push(recipe.clone());
            }
        }

        report.skip_reasons = ledger.into_entries();
        Ok(report.finalize())
    }

    /// Build one target and, on success, run the uploads.
    async fn attempt(&mut self, target: &Target) -> Result<(BuildOutcome, Vec<FailedUpload>)> {
        let outcome = self.builder.build(target).await?;
        let mut failed_uploads = Vec::new();

        if !outcome.success || self.test_only {
            return Ok((outcome, failed_uploads));
        }

        if let Some(upload) = self.artifact_upload.as_mut() {
            let uploaded = upload
                .uploader
                .upload(&target.pkg, upload.label.as_deref())
                .await;
            if !upload_ok(uploaded, &target.to_string()) {
                failed_uploads.push(FailedUpload::Artifact(target.pkg.clone()));
            }
        }

        if let (Some(upload), Some(image)) = (self.image_upload.as_mut(), &outcome.test_image) {
            let pushed = upload.uploader.upload(image, &upload.target).await;
            if !upload_ok(pushed, image) {
                failed_uploads.push(FailedUpload::Image(image.clone()));
            }
        }

        Ok((outcome, failed_uploads))
    }
}

fn upload_ok(result: Result<bool>, what: &str) -> bool {
    match result {
        Ok(true) => true,
        Ok(false) => {
            warn!(artifact = %what, "upload failed");
            false
        }
        Err(err) => {
            error!(artifact = %what, error = %err, "upload errored");
            false
        }
    }
}

fn join_recipes(recipes: &[RecipeRef]) -> String {
    recipes
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
