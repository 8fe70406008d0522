// src/lib.rs

pub mod changes;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pinning;
pub mod recipe;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::cli::{BuildArgs, CliArgs, Command, PinningArgs};
use crate::config::load_and_validate;
use crate::dag::ShardSpec;
use crate::engine::{build_recipes, check_recipes, BuildRequest, BuildServices, PinningRequest};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pinning::{MetaRenderer, RepoData};
use crate::recipe::FsMetadataSource;

/// High-level entry point used by `main.rs`.
///
/// Returns whether the command succeeded; `Err` is reserved for
/// configuration problems and unexpected failures.
pub async fn run(args: CliArgs) -> Result<bool> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    match args.command {
        Command::Build(build) => run_build(build, fs).await,
        Command::Pinning(pinning) => run_pinning(pinning, fs),
    }
}

async fn run_build(args: BuildArgs, fs: Arc<dyn FileSystem>) -> Result<bool> {
    let config = load_and_validate(fs.as_ref(), &args.config)?;
    let shard = ShardSpec::new(args.subdags, args.subdag)?;

    let request = BuildRequest {
        recipe_folder: args.recipe_folder,
        config,
        config_path: Some(args.config),
        packages: args.packages,
        test_only: args.testonly,
        force: args.force,
        package_test: args.package_test,
        use_container: args.container,
        upload: args.upload,
        label: args.label,
        image_upload_target: args.image_upload_target,
        check_channels: args.check_channels,
        quick: args.quick,
        git_ref: args.git_ref,
        forward_env: !args.disable_env_forwarding,
        shard,
    };
    debug!(?request, "build request");

    let services = BuildServices::from_request(&request, fs)?;
    let report = build_recipes(&request, services).await?;
    Ok(report.is_success())
}

fn run_pinning(args: PinningArgs, fs: Arc<dyn FileSystem>) -> Result<bool> {
    let config = load_and_validate(fs.as_ref(), &args.config)?;
    let index = RepoData::load(fs.as_ref(), &config.all_index_paths())?;
    let renderer = MetaRenderer::new(Arc::new(FsMetadataSource::new(fs.clone())));

    let request = PinningRequest {
        recipe_folder: args.recipe_folder,
        config,
        packages: args.packages,
        skip_variant_keys: args.skip_variants.into_iter().collect(),
    };
    let summary = check_recipes(&request, fs.as_ref(), &renderer, &index)?;

    for (recipe, state) in &summary.results {
        println!("{recipe}\t{state}");
    }
    println!();
    for (flag, count) in &summary.tally {
        println!("{flag}: {count}");
    }

    Ok(true)
}
