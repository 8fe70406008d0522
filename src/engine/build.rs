// src/engine/build.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::changes::{quick_filter, ChangeDetector, GitChangeDetector, DEFAULT_GIT_REF};
use crate::config::{Blacklist, ConfigFile};
use crate::dag::{build_dependency_graph, select_shard, BuildReport, BuildScheduler, ShardSpec};
use crate::errors::{RecipeshardError, Result};
use crate::exec::{
    ArtifactUploader, CommandArtifactUploader, CommandImageUploader, CommandPackageTester,
    CommandRecipeBuilder, CommandWorkspace, ImageUploader, TargetBuilder, TargetRunner, Workspace,
};
use crate::fs::FileSystem;
use crate::pinning::{PackageIndex, RepoData};
use crate::recipe::{
    discover_recipes, filter_blacklisted, EnvMatrix, FsMetadataSource, MetadataSource,
    TargetPlanner,
};

/// Everything the `build` command was asked to do.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub recipe_folder: PathBuf,
    pub config: ConfigFile,
    /// Path `config` was loaded from; needed by `quick`.
    pub config_path: Option<PathBuf>,
    /// Globs over recipe ids.
    pub packages: Vec<String>,
    pub test_only: bool,
    pub force: bool,
    /// Test built packages in a minimal container.
    pub package_test: bool,
    /// Build inside `[tools.container]`.
    pub use_container: bool,
    pub upload: bool,
    pub label: Option<String>,
    pub image_upload_target: Option<String>,
    /// Overrides the configured check channels.
    pub check_channels: Option<Vec<String>>,
    pub quick: bool,
    pub git_ref: String,
    /// Forward host env vars into the build container.
    pub forward_env: bool,
    pub shard: ShardSpec,
}

impl BuildRequest {
    pub fn new(recipe_folder: impl Into<PathBuf>, config: ConfigFile) -> Self {
        Self {
            recipe_folder: recipe_folder.into(),
            config,
            config_path: None,
            packages: vec!["*".to_string()],
            test_only: false,
            force: false,
            package_test: false,
            use_container: false,
            upload: false,
            label: None,
            image_upload_target: None,
            check_channels: None,
            quick: false,
            git_ref: DEFAULT_GIT_REF.to_string(),
            forward_env: true,
            shard: ShardSpec::single(),
        }
    }

    pub fn check_channels(&self) -> Vec<String> {
        self.config
            .effective_check_channels(self.check_channels.as_deref())
    }
}

/// Collaborators used by [`build_recipes`].
pub struct BuildServices {
    pub fs: Arc<dyn FileSystem>,
    pub metadata: Arc<dyn MetadataSource>,
    pub index: Box<dyn PackageIndex>,
    pub changes: Box<dyn ChangeDetector>,
    pub builder: Box<dyn TargetBuilder>,
    pub workspace: Box<dyn Workspace>,
    pub artifact_uploader: Option<Box<dyn ArtifactUploader>>,
    pub image_uploader: Option<Box<dyn ImageUploader>>,
}

impl BuildServices {
    /// Process-backed collaborators configured from `request`.
    pub fn from_request(request: &BuildRequest, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let config = &request.config;
        let tools = &config.tools;

        let index_paths = config.index_paths_for(&request.check_channels());
        let index = RepoData::load(fs.as_ref(), &index_paths)?;
        debug!(packages = index.len(), "package index loaded");

        let mut recipe_builder =
            CommandRecipeBuilder::new(fs.clone(), tools, &config.channels, request.test_only);
        if request.use_container {
            let section = tools.container.clone().ok_or_else(|| {
                RecipeshardError::ConfigError(
                    "building in a container needs a [tools.container] section".to_string(),
                )
            })?;
            recipe_builder = recipe_builder.in_container(
                section,
                config.resolve(&tools.output_dir),
                request.forward_env,
            );
        }

        let mut runner = TargetRunner::new(Box::new(recipe_builder));
        if request.package_test {
            runner = runner.with_package_test(Box::new(CommandPackageTester::new(tools)));
        }

        let artifact_uploader: Option<Box<dyn ArtifactUploader>> = if request.upload {
            Some(Box::new(CommandArtifactUploader::new(tools.upload.clone())))
        } else {
            None
        };
        let image_uploader: Option<Box<dyn ImageUploader>> = match request.image_upload_target {
            Some(_) => Some(Box::new(CommandImageUploader::new(tools.image_upload.clone()))),
            None => None,
        };

        Ok(Self {
            metadata: Arc::new(FsMetadataSource::new(fs.clone())),
            fs,
            index: Box::new(index),
            changes: Box::new(GitChangeDetector::new()),
            builder: Box::new(runner),
            workspace: Box::new(CommandWorkspace::new(tools.purge.clone())),
            artifact_uploader,
            image_uploader,
        })
    }
}

/// Build the selected shard of the recipes below `request.recipe_folder`.
///
/// Returns the run's report; `Err` only for configuration problems and
/// unexpected collaborator errors.
pub async fn build_recipes(request: &BuildRequest, services: BuildServices) -> Result<BuildReport> {
    let BuildServices {
        fs,
        metadata,
        index,
        changes,
        builder,
        workspace,
        artifact_uploader,
        image_uploader,
    } = services;
    let config = &request.config;

    let blacklist_paths: Vec<PathBuf> = config
        .blacklists
        .iter()
        .map(|p| config.resolve(p))
        .collect();
    let blacklist = Blacklist::load(fs.as_ref(), &blacklist_paths)?;
    info!(
        "blacklist: {}",
        blacklist.iter().collect::<Vec<_>>().join(", ")
    );

    let recipes = discover_recipes(fs.as_ref(), &request.recipe_folder, &request.packages)?;
    let mut recipes = filter_blacklisted(recipes, &blacklist);
    if recipes.is_empty() {
        info!("Nothing to be done.");
        return Ok(BuildReport::empty());
    }
    debug!(count = recipes.len(), "selected recipes");

    if request.quick {
        let config_path = request.config_path.as_deref().ok_or_else(|| {
            RecipeshardError::ConfigError(
                "quick filtering needs the path of the config file \
                 to compare it against the git reference"
                    .to_string(),
            )
        })?;
        recipes = quick_filter(
            changes.as_ref(),
            recipes,
            &request.recipe_folder,
            config_path,
            &blacklist,
            &request.git_ref,
        )
        .await?;
    }

    info!("Filtering recipes");
    let output_dir = config.resolve(&config.tools.output_dir);
    let targets = TargetPlanner::new(metadata.as_ref(), index.as_ref(), output_dir)
        .platform(config.tools.platform)
        .force(request.force)
        .plan(&recipes, &EnvMatrix::new(config.env_matrix.clone()))?;
    let planned: Vec<_> = targets.keys().cloned().collect();

    let graph = build_dependency_graph(&planned, metadata.as_ref(), &blacklist)?;
    if graph.graph.is_empty() {
        info!("Nothing to be done.");
        return Ok(BuildReport::empty());
    }
    info!("Building and testing {} recipes in total", graph.graph.len());
    info!(
        "Recipes to build: \n{}",
        graph.graph.packages().collect::<Vec<_>>().join("\n")
    );

    let shard = select_shard(&graph.graph, &request.shard, request.test_only);
    if shard.is_empty() {
        info!("Nothing to be done.");
        return Ok(BuildReport::empty());
    }

    let shard_recipes: usize = shard
        .packages()
        .map(|name| graph.recipes_for(name).len())
        .sum();
    info!(
        "Building and testing subdag {} of {} ({} recipes)",
        request.shard.index() + 1,
        request.shard.count(),
        shard_recipes
    );

    let mut scheduler = BuildScheduler::new(builder, workspace).test_only(request.test_only);
    if let Some(uploader) = artifact_uploader {
        scheduler = scheduler.with_artifact_upload(uploader, request.label.clone());
    }
    if let (Some(uploader), Some(target)) = (image_uploader, request.image_upload_target.clone()) {
        scheduler = scheduler.with_image_upload(uploader, target);
    }

    let report = scheduler.schedule(&shard, &graph, &targets).await?;
    report.log_summary();
    Ok(report)
}
