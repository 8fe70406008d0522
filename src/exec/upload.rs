// src/exec/upload.rs

use std::path::Path;

use tracing::{error, info};

use crate::exec::backend::{ArtifactUploader, BoxFuture, ImageUploader};
use crate::exec::command::run_command;

/// Uploads artifacts with the configured upload command.
#[derive(Debug, Clone)]
pub struct CommandArtifactUploader {
    argv: Vec<String>,
}

impl CommandArtifactUploader {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    pub fn command_line(&self, pkg: &Path, label: Option<&str>) -> Vec<String> {
        let mut argv = self.argv.clone();
        if let Some(label) = label {
            argv.push("--label".to_string());
            argv.push(label.to_string());
        }
        argv.push(pkg.display().to_string());
        argv
    }
}

impl ArtifactUploader for CommandArtifactUploader {
    fn upload<'a>(&'a mut self, pkg: &'a Path, label: Option<&'a str>) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let output = run_command(&self.command_line(pkg, label), &[]).await?;
            if output.success() {
                info!(pkg = %pkg.display(), "UPLOAD SUCCESS");
            } else {
                error!(pkg = %pkg.display(), output = %output.output, "UPLOAD FAILED");
            }
            Ok(output.success())
        })
    }
}

/// Pushes test images with the configured image-upload command.
#[derive(Debug, Clone)]
pub struct CommandImageUploader {
    argv: Vec<String>,
}

impl CommandImageUploader {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl ImageUploader for CommandImageUploader {
    fn upload<'a>(&'a mut self, image: &'a str, target: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let mut argv = self.argv.clone();
            argv.push(image.to_string());
            argv.push(target.to_string());
            let output = run_command(&argv, &[]).await?;
            if !output.success() {
                error!(
                    image = %image,
                    target = %target,
                    output = %output.output,
                    "image upload failed"
                );
            }
            Ok(output.success())
        })
    }
}
