// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::changes::DEFAULT_GIT_REF;

/// Command-line arguments for `recipeshard`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "recipeshard",
    version,
    about = "Build interdependent package recipes in dependency order, one shard at a time.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RECIPESHARD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build, test and optionally upload recipes.
    Build(BuildArgs),
    /// Report which recipes need a build-number bump after a pinning change.
    Pinning(PinningArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    /// Directory containing (possibly nested) recipes.
    #[arg(value_name = "RECIPE_FOLDER")]
    pub recipe_folder: PathBuf,

    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "recipeshard.toml")]
    pub config: PathBuf,

    /// Globs over recipe paths selecting what to build.
    #[arg(long, value_name = "GLOB", num_args = 1.., default_value = "*")]
    pub packages: Vec<String>,

    /// Only run the recipes' tests; nothing is uploaded.
    #[arg(long)]
    pub testonly: bool,

    /// Build even if the package already exists in a check channel.
    #[arg(long)]
    pub force: bool,

    /// Test built packages in a minimal container.
    #[arg(long)]
    pub package_test: bool,

    /// Build inside the container image from `[tools.container]`.
    #[arg(long)]
    pub container: bool,

    /// Do not pass host env vars matching the forwarded prefixes into the
    /// build container.
    #[arg(long)]
    pub disable_env_forwarding: bool,

    /// Upload built packages.
    #[arg(long)]
    pub upload: bool,

    /// Label to upload packages under.
    #[arg(long, value_name = "LABEL")]
    pub label: Option<String>,

    /// Push package-test images to this target.
    #[arg(long, value_name = "TARGET")]
    pub image_upload_target: Option<String>,

    /// Channels checked for existing packages (comma separated). Empty
    /// disables the check. Defaults to the first configured channel.
    #[arg(long, value_name = "CHANNELS", value_delimiter = ',')]
    pub check_channels: Option<Vec<String>>,

    /// Only consider recipes changed or unblacklisted since `--git-ref`.
    #[arg(long)]
    pub quick: bool,

    #[arg(long, value_name = "REF", default_value = DEFAULT_GIT_REF)]
    pub git_ref: String,

    /// Total number of shards.
    #[arg(long, env = "SUBDAGS", value_name = "N", default_value_t = 1)]
    pub subdags: usize,

    /// Zero-based shard to run.
    #[arg(long, env = "SUBDAG", value_name = "I", default_value_t = 0)]
    pub subdag: usize,
}

#[derive(Debug, Clone, Args)]
pub struct PinningArgs {
    /// Directory containing (possibly nested) recipes.
    #[arg(value_name = "RECIPE_FOLDER")]
    pub recipe_folder: PathBuf,

    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "recipeshard.toml")]
    pub config: PathBuf,

    /// Globs over recipe paths selecting what to check.
    #[arg(long, value_name = "GLOB", num_args = 1.., default_value = "*")]
    pub packages: Vec<String>,

    /// Report recipes using this variant key as SKIP. Repeatable.
    #[arg(long = "skip-variant", value_name = "KEY")]
    pub skip_variants: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
