// src/exec/tester.rs

use std::path::Path;

use crate::config::ToolsSection;
use crate::exec::backend::{BoxFuture, PackageTester, TestResult};
use crate::exec::command::run_command;

const ARTIFACT_SUFFIXES: [&str; 2] = [".tar.bz2", ".conda"];

/// Image name the package test produces for an artifact:
/// `<namespace>/<name>:<version>--<build_string>`.
///
/// Returns `None` if the file name is not `<name>-<version>-<build>` plus a
/// known artifact suffix.
pub fn image_name_for(namespace: &str, pkg: &Path) -> Option<String> {
    let file_name = pkg.file_name()?.to_str()?;
    let stem = ARTIFACT_SUFFIXES
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix))?;

    // Names may contain '-', versions and build strings may not.
    let mut parts = stem.rsplitn(3, '-');
    let build = parts.next()?;
    let version = parts.next()?;
    let name = parts.next()?;
    if name.is_empty() || version.is_empty() || build.is_empty() {
        return None;
    }

    Some(format!(
        "{}/{}:{}--{}",
        namespace.trim_end_matches('/'),
        name,
        version,
        build
    ))
}

/// Runs the configured package-test command with the artifact appended.
#[derive(Debug, Clone)]
pub struct CommandPackageTester {
    argv: Vec<String>,
    namespace: String,
}

impl CommandPackageTester {
    pub fn new(tools: &ToolsSection) -> Self {
        Self {
            argv: tools.package_test.clone(),
            namespace: tools.image_namespace.clone(),
        }
    }
}

impl PackageTester for CommandPackageTester {
    fn test<'a>(&'a mut self, pkg: &'a Path) -> BoxFuture<'a, TestResult> {
        Box::pin(async move {
            let mut argv = self.argv.clone();
            argv.push(pkg.display().to_string());
            let output = run_command(&argv, &[]).await?;
            Ok(TestResult {
                returncode: output.code,
                output: output.output,
            })
        })
    }

    fn image_name(&self, pkg: &Path) -> Option<String> {
        image_name_for(&self.namespace, pkg)
    }
}
