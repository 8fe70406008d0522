// src/exec/workspace.rs

use anyhow::anyhow;

use crate::exec::backend::{BoxFuture, Workspace};
use crate::exec::command::run_command;

/// Purges the local build workspace with the configured purge command.
/// A non-zero exit is an error.
#[derive(Debug, Clone)]
pub struct CommandWorkspace {
    argv: Vec<String>,
}

impl CommandWorkspace {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl Workspace for CommandWorkspace {
    fn purge(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let output = run_command(&self.argv, &[]).await?;
            if !output.success() {
                return Err(anyhow!(
                    "purge command {:?} exited with {}: {}",
                    self.argv,
                    output.code,
                    output.output.trim()
                )
                .into());
            }
            Ok(())
        })
    }
}
