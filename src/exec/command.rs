// src/exec/command.rs

use std::process::Stdio;

use anyhow::{anyhow, Context};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::Result;

/// Exit status and combined output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    /// stdout lines followed by stderr lines.
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Run `argv` to completion, streaming its output to the debug log.
///
/// A non-zero exit is returned as a value; failing to start or wait for the
/// process is an error.
pub async fn run_command(argv: &[String], envs: &[(String, String)]) -> Result<CommandOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("empty command line"))?;

    debug!(cmd = ?argv, "running command");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning '{}'", program))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (out, err) = tokio::join!(collect_lines(stdout, "stdout"), collect_lines(stderr, "stderr"));

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for '{}'", program))?;

    let code = status.code().unwrap_or(-1);
    info!(program = %program, exit_code = code, "command exited");

    let mut output = out;
    output.push_str(&err);
    Ok(CommandOutput { code, output })
}

async fn collect_lines<R>(stream: Option<R>, label: &'static str) -> String
where
    R: AsyncRead + Unpin,
{
    let mut collected = String::new();
    let Some(stream) = stream else {
        return collected;
    };

    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("{label}: {}", line);
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}
