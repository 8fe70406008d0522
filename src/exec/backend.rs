// src/exec/backend.rs

//! Collaborator traits the scheduler talks to.
//!
//! The scheduler never spawns processes itself. It goes through these
//! traits instead, so tests can swap in fakes (see `recipeshard-test-utils`)
//! while production wires the command-backed implementations from the
//! sibling modules.
//!
//! Error convention: an expected failure (non-zero exit of the build tool,
//! a failing package test, a rejected upload) is a *value*. An `Err` means
//! something unexpected happened and aborts the whole run.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::errors::Result;
use crate::recipe::Target;

/// Boxed future returned by collaborator methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Result of building (and optionally testing) one target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildOutcome {
    pub success: bool,
    /// Image produced by the package test, if any.
    pub test_image: Option<String>,
}

impl BuildOutcome {
    pub fn success(test_image: Option<String>) -> Self {
        Self {
            success: true,
            test_image,
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            test_image: None,
        }
    }
}

/// Builds one target end to end (the scheduler's `buildFn`).
pub trait TargetBuilder: Send {
    fn build<'a>(&'a mut self, target: &'a Target) -> BoxFuture<'a, BuildOutcome>;
}

/// Runs the build tool for one target. `Ok(false)` is a build failure.
pub trait RecipeBuilder: Send {
    fn build<'a>(&'a mut self, target: &'a Target) -> BoxFuture<'a, bool>;
}

/// Output of a package test.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestResult {
    pub returncode: i32,
    /// stdout and stderr, interleaved.
    pub output: String,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.returncode == 0
    }
}

/// Tests a built artifact in a minimal environment.
pub trait PackageTester: Send {
    fn test<'a>(&'a mut self, pkg: &'a Path) -> BoxFuture<'a, TestResult>;

    /// Image the test produces for `pkg`, if it can be named.
    fn image_name(&self, pkg: &Path) -> Option<String>;
}

/// Uploads a built artifact under a label. `Ok(false)` is a failed upload.
pub trait ArtifactUploader: Send {
    fn upload<'a>(&'a mut self, pkg: &'a Path, label: Option<&'a str>) -> BoxFuture<'a, bool>;
}

/// Pushes a test image to a registry target. `Ok(false)` is a failed upload.
pub trait ImageUploader: Send {
    fn upload<'a>(&'a mut self, image: &'a str, target: &'a str) -> BoxFuture<'a, bool>;
}

/// Shared local build workspace.
pub trait Workspace: Send {
    /// Clear transient build state. Idempotent.
    fn purge(&mut self) -> BoxFuture<'_, ()>;
}
