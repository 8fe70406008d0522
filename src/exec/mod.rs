// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the collaborator traits the scheduler uses.
//! - [`command`] runs a single external command via `tokio::process`.
//! - [`builder`] invokes the build tool, on the host or in a container.
//! - [`tester`] runs the package test and names the resulting image.
//! - [`upload`] uploads artifacts and test images.
//! - [`workspace`] purges the local build workspace.
//! - [`target_runner`] combines build and package test into one outcome.

pub mod backend;
pub mod builder;
pub mod command;
pub mod target_runner;
pub mod tester;
pub mod upload;
pub mod workspace;

pub use backend::{
    ArtifactUploader, BoxFuture, BuildOutcome, ImageUploader, PackageTester, RecipeBuilder,
    TargetBuilder, TestResult, Workspace,
};
pub use builder::CommandRecipeBuilder;
pub use command::{run_command, CommandOutput};
pub use target_runner::TargetRunner;
pub use tester::{image_name_for, CommandPackageTester};
pub use upload::{CommandArtifactUploader, CommandImageUploader};
pub use workspace::CommandWorkspace;
