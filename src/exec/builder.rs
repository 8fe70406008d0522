// src/exec/builder.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::{ContainerSection, ToolsSection};
use crate::exec::backend::{BoxFuture, RecipeBuilder};
use crate::exec::command::run_command;
use crate::fs::FileSystem;
use crate::recipe::Target;

/// Mount point of the recipe directory inside the build container.
const CONTAINER_RECIPE_DIR: &str = "/opt/recipe";

/// Runs the configured build tool, either on the host or in a container.
#[derive(Debug)]
pub struct CommandRecipeBuilder {
    fs: Arc<dyn FileSystem>,
    build: Vec<String>,
    extra_args: Vec<String>,
    channels: Vec<String>,
    container: Option<ContainerBuild>,
}

#[derive(Debug, Clone)]
struct ContainerBuild {
    section: ContainerSection,
    /// Host directory mounted at `section.output_mount`.
    output_dir: PathBuf,
    forward_env: Vec<(String, String)>,
}

impl CommandRecipeBuilder {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        tools: &ToolsSection,
        channels: &[String],
        test_only: bool,
    ) -> Self {
        let extra_args = if test_only {
            tools.test_only_args.clone()
        } else {
            tools.build_args.clone()
        };
        Self {
            fs,
            build: tools.build.clone(),
            extra_args,
            channels: channels.to_vec(),
            container: None,
        }
    }

    /// Build inside `section.image`.
    ///
    /// Host env vars whose names start with one of the section's prefixes
    /// are passed into the container unless `forward_env` is false.
    pub fn in_container(
        mut self,
        section: ContainerSection,
        output_dir: impl Into<PathBuf>,
        forward_env: bool,
    ) -> Self {
        let forwarded = if forward_env {
            std::env::vars()
                .filter(|(k, _)| {
                    section
                        .forward_env_prefixes
                        .iter()
                        .any(|prefix| k.starts_with(prefix.as_str()))
                })
                .collect()
        } else {
            Vec::new()
        };
        self.container = Some(ContainerBuild {
            section,
            output_dir: output_dir.into(),
            forward_env: forwarded,
        });
        self
    }

    fn tool_line(&self) -> Vec<String> {
        let mut tool = self.build.clone();
        tool.extend(self.extra_args.iter().cloned());
        for channel in &self.channels {
            tool.push("--channel".to_string());
            tool.push(channel.clone());
        }
        tool
    }

    /// Full command line for `target`.
    pub fn command_line(&self, target: &Target) -> Vec<String> {
        let mut tool = self.tool_line();

        let Some(container) = &self.container else {
            tool.push(target.recipe.path().display().to_string());
            return tool;
        };

        let mut argv = vec![
            container.section.runtime.clone(),
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!(
                "{}:{}",
                absolute(target.recipe.path()).display(),
                CONTAINER_RECIPE_DIR
            ),
            "-v".to_string(),
            format!(
                "{}:{}",
                absolute(&container.output_dir).display(),
                container.section.output_mount.display()
            ),
        ];

        let target_env = target.env.iter().map(|(k, v)| format!("{k}={v}"));
        let forwarded = container.forward_env.iter().map(|(k, v)| format!("{k}={v}"));
        for pair in target_env.chain(forwarded) {
            argv.push("-e".to_string());
            argv.push(pair);
        }

        argv.push(container.section.image.clone());
        argv.append(&mut tool);
        argv.push(CONTAINER_RECIPE_DIR.to_string());
        argv
    }
}

impl RecipeBuilder for CommandRecipeBuilder {
    fn build<'a>(&'a mut self, target: &'a Target) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let argv = self.command_line(target);
            // Containers get the target env through `-e`.
            let envs: Vec<(String, String)> = if self.container.is_some() {
                Vec::new()
            } else {
                target
                    .env
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            };

            let output = run_command(&argv, &envs).await?;
            if !output.success() {
                debug!(recipe = %target.recipe, output = %output.output, "build output");
                return Ok(false);
            }

            if self.container.is_some() && !self.fs.exists(&target.pkg) {
                error!(
                    "BUILD FAILED: the built package {} cannot be found",
                    target.pkg.display()
                );
                return Ok(false);
            }

            Ok(true)
        })
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
