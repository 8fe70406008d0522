// src/changes/git.rs

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::debug;

use crate::changes::ChangeDetector;
use crate::exec::{run_command, BoxFuture};

/// [`ChangeDetector`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitChangeDetector {
    git: String,
}

impl GitChangeDetector {
    pub fn new() -> Self {
        Self {
            git: "git".to_string(),
        }
    }

    /// Use a different `git` executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            git: program.into(),
        }
    }

    fn in_dir(&self, dir: &Path) -> Vec<String> {
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        vec![
            self.git.clone(),
            "-C".to_string(),
            dir.display().to_string(),
        ]
    }
}

impl Default for GitChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeDetector for GitChangeDetector {
    fn changed_files<'a>(
        &'a self,
        folder: &'a Path,
        git_ref: &'a str,
    ) -> BoxFuture<'a, Vec<PathBuf>> {
        Box::pin(async move {
            let mut argv = self.in_dir(folder);
            argv.extend(
                ["diff", "--name-only", "--relative", git_ref, "--", "."]
                    .iter()
                    .map(|s| s.to_string()),
            );

            let output = run_command(&argv, &[]).await?;
            if !output.success() {
                return Err(anyhow!(
                    "git diff against '{}' failed: {}",
                    git_ref,
                    output.output.trim()
                )
                .into());
            }

            let files: Vec<PathBuf> = output
                .output
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(PathBuf::from)
                .collect();
            debug!(count = files.len(), git_ref, "changed files");
            Ok(files)
        })
    }

    fn file_at_ref<'a>(
        &'a self,
        path: &'a Path,
        git_ref: &'a str,
    ) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("not a file path: {:?}", path))?;
            let mut argv = self.in_dir(path.parent().unwrap_or(Path::new(".")));
            argv.push("show".to_string());
            argv.push(format!("{}:./{}", git_ref, file_name.to_string_lossy()));

            let output = run_command(&argv, &[]).await?;
            if output.success() {
                Ok(Some(output.output))
            } else {
                debug!(path = ?path, git_ref, "file not present at ref");
                Ok(None)
            }
        })
    }
}
