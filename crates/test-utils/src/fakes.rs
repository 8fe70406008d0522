#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use recipeshard::changes::ChangeDetector;
use recipeshard::errors::{RecipeshardError, Result};
use recipeshard::exec::{
    ArtifactUploader, BoxFuture, BuildOutcome, ImageUploader, PackageTester, RecipeBuilder,
    TargetBuilder, TestResult, Workspace,
};
use recipeshard::pinning::{BuildConfig, Variant, VariantRenderer};
use recipeshard::recipe::{MetadataSource, RecipeMeta, RecipeRef, Target};

/// One observable collaborator call, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Build(String),
    Test(String),
    Upload(String),
    ImageUpload(String, String),
    Purge,
}

/// Call log shared between fakes so tests can assert on interleaving.
pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

pub fn purge_count(log: &CallLog) -> usize {
    calls(log).iter().filter(|c| **c == Call::Purge).count()
}

/// Artifact paths passed to the builder, in order.
pub fn built(log: &CallLog) -> Vec<String> {
    calls(log)
        .into_iter()
        .filter_map(|c| match c {
            Call::Build(pkg) => Some(pkg),
            _ => None,
        })
        .collect()
}

fn key(path: &Path) -> String {
    path.display().to_string()
}

#[derive(Debug, Clone)]
enum Scripted {
    Fail,
    Image(String),
    Error(String),
}

/// Scripted `TargetBuilder`: succeeds unless told otherwise per artifact.
#[derive(Debug, Clone)]
pub struct FakeTargetBuilder {
    log: CallLog,
    script: HashMap<String, Scripted>,
}

impl FakeTargetBuilder {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            script: HashMap::new(),
        }
    }

    /// Building `pkg` reports a failure.
    pub fn fail(mut self, pkg: &str) -> Self {
        self.script.insert(pkg.to_string(), Scripted::Fail);
        self
    }

    /// Building `pkg` succeeds and produces a test image.
    pub fn image(mut self, pkg: &str, image: &str) -> Self {
        self.script
            .insert(pkg.to_string(), Scripted::Image(image.to_string()));
        self
    }

    /// Building `pkg` returns an unexpected error.
    pub fn error(mut self, pkg: &str, message: &str) -> Self {
        self.script
            .insert(pkg.to_string(), Scripted::Error(message.to_string()));
        self
    }
}

impl TargetBuilder for FakeTargetBuilder {
    fn build<'a>(&'a mut self, target: &'a Target) -> BoxFuture<'a, BuildOutcome> {
        let pkg = key(&target.pkg);
        self.log.lock().unwrap().push(Call::Build(pkg.clone()));
        let scripted = self.script.get(&pkg).cloned();

        Box::pin(async move {
            match scripted {
                None => Ok(BuildOutcome::success(None)),
                Some(Scripted::Fail) => Ok(BuildOutcome::failure()),
                Some(Scripted::Image(image)) => Ok(BuildOutcome::success(Some(image))),
                Some(Scripted::Error(message)) => Err(anyhow!(message).into()),
            }
        })
    }
}

/// Scripted `RecipeBuilder` for exercising `TargetRunner`.
#[derive(Debug, Clone)]
pub struct FakeRecipeBuilder {
    log: CallLog,
    failing: HashSet<String>,
}

impl FakeRecipeBuilder {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failing: HashSet::new(),
        }
    }

    pub fn fail(mut self, pkg: &str) -> Self {
        self.failing.insert(pkg.to_string());
        self
    }
}

impl RecipeBuilder for FakeRecipeBuilder {
    fn build<'a>(&'a mut self, target: &'a Target) -> BoxFuture<'a, bool> {
        let pkg = key(&target.pkg);
        self.log.lock().unwrap().push(Call::Build(pkg.clone()));
        let ok = !self.failing.contains(&pkg);
        Box::pin(async move { Ok(ok) })
    }
}

/// Scripted `PackageTester`; passes unless a return code is set for the
/// artifact.
#[derive(Debug, Clone)]
pub struct FakePackageTester {
    log: CallLog,
    returncodes: HashMap<String, i32>,
    namespace: String,
}

impl FakePackageTester {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            returncodes: HashMap::new(),
            namespace: "quay.io/biocontainers".to_string(),
        }
    }

    pub fn returncode(mut self, pkg: &str, code: i32) -> Self {
        self.returncodes.insert(pkg.to_string(), code);
        self
    }
}

impl PackageTester for FakePackageTester {
    fn test<'a>(&'a mut self, pkg: &'a Path) -> BoxFuture<'a, TestResult> {
        let pkg = key(pkg);
        self.log.lock().unwrap().push(Call::Test(pkg.clone()));
        let returncode = self.returncodes.get(&pkg).copied().unwrap_or(0);
        Box::pin(async move {
            Ok(TestResult {
                returncode,
                output: format!("tested {pkg}"),
            })
        })
    }

    fn image_name(&self, pkg: &Path) -> Option<String> {
        recipeshard::exec::image_name_for(&self.namespace, pkg)
    }
}

/// Records uploads; chosen artifacts fail (or error) to upload.
#[derive(Debug, Clone)]
pub struct RecordingArtifactUploader {
    log: CallLog,
    failing: HashSet<String>,
    erroring: HashSet<String>,
    labels: Arc<Mutex<Vec<Option<String>>>>,
}

impl RecordingArtifactUploader {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failing: HashSet::new(),
            erroring: HashSet::new(),
            labels: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fail(mut self, pkg: &str) -> Self {
        self.failing.insert(pkg.to_string());
        self
    }

    pub fn error(mut self, pkg: &str) -> Self {
        self.erroring.insert(pkg.to_string());
        self
    }

    /// Labels passed to `upload`, shared with clones.
    pub fn labels(&self) -> Arc<Mutex<Vec<Option<String>>>> {
        Arc::clone(&self.labels)
    }
}

impl ArtifactUploader for RecordingArtifactUploader {
    fn upload<'a>(&'a mut self, pkg: &'a Path, label: Option<&'a str>) -> BoxFuture<'a, bool> {
        let pkg = key(pkg);
        self.log.lock().unwrap().push(Call::Upload(pkg.clone()));
        self.labels.lock().unwrap().push(label.map(str::to_string));
        let erroring = self.erroring.contains(&pkg);
        let ok = !self.failing.contains(&pkg);
        Box::pin(async move {
            if erroring {
                return Err(anyhow!("upload transport broke for {pkg}").into());
            }
            Ok(ok)
        })
    }
}

/// Records image pushes; optionally every push fails.
#[derive(Debug, Clone)]
pub struct RecordingImageUploader {
    log: CallLog,
    fail_all: bool,
}

impl RecordingImageUploader {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_all: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }
}

impl ImageUploader for RecordingImageUploader {
    fn upload<'a>(&'a mut self, image: &'a str, target: &'a str) -> BoxFuture<'a, bool> {
        self.log
            .lock()
            .unwrap()
            .push(Call::ImageUpload(image.to_string(), target.to_string()));
        let ok = !self.fail_all;
        Box::pin(async move { Ok(ok) })
    }
}

/// Workspace that only records purges.
#[derive(Debug, Clone)]
pub struct CountingWorkspace {
    log: CallLog,
}

impl CountingWorkspace {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl Workspace for CountingWorkspace {
    fn purge(&mut self) -> BoxFuture<'_, ()> {
        self.log.lock().unwrap().push(Call::Purge);
        Box::pin(async { Ok(()) })
    }
}

/// What a `StaticRenderer` returns for one recipe.
#[derive(Debug, Clone)]
pub enum RenderScript {
    Variants(Vec<Variant>),
    Nothing,
    Fail(String),
}

/// `VariantRenderer` returning canned variants per recipe id.
#[derive(Debug, Clone, Default)]
pub struct StaticRenderer {
    scripts: HashMap<String, RenderScript>,
}

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variants(mut self, recipe: &str, variants: Vec<Variant>) -> Self {
        self.scripts
            .insert(recipe.to_string(), RenderScript::Variants(variants));
        self
    }

    pub fn nothing(mut self, recipe: &str) -> Self {
        self.scripts.insert(recipe.to_string(), RenderScript::Nothing);
        self
    }

    pub fn fail(mut self, recipe: &str, message: &str) -> Self {
        self.scripts
            .insert(recipe.to_string(), RenderScript::Fail(message.to_string()));
        self
    }
}

impl VariantRenderer for StaticRenderer {
    fn render(&self, recipe: &RecipeRef, _config: &BuildConfig) -> Result<Option<Vec<Variant>>> {
        match self.scripts.get(recipe.id()) {
            Some(RenderScript::Variants(v)) => Ok(Some(v.clone())),
            Some(RenderScript::Nothing) | None => Ok(None),
            Some(RenderScript::Fail(message)) => Err(RecipeshardError::render(recipe, message)),
        }
    }
}

/// `MetadataSource` over in-memory metadata keyed by recipe id.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    metas: BTreeMap<String, RecipeMeta>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, recipe: &str, meta: RecipeMeta) -> Self {
        self.metas.insert(recipe.to_string(), meta);
        self
    }
}

impl MetadataSource for StaticMetadata {
    fn load(&self, recipe: &RecipeRef) -> Result<RecipeMeta> {
        self.metas
            .get(recipe.id())
            .cloned()
            .ok_or_else(|| RecipeshardError::render(recipe, "no metadata"))
    }
}

/// In-memory `ChangeDetector`.
#[derive(Debug, Clone, Default)]
pub struct FakeChangeDetector {
    changed: Vec<PathBuf>,
    files: HashMap<PathBuf, String>,
}

impl FakeChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changed(mut self, path: &str) -> Self {
        self.changed.push(PathBuf::from(path));
        self
    }

    /// Contents of `path` at the reference.
    pub fn file(mut self, path: impl AsRef<Path>, contents: &str) -> Self {
        self.files
            .insert(path.as_ref().to_path_buf(), contents.to_string());
        self
    }
}

impl ChangeDetector for FakeChangeDetector {
    fn changed_files<'a>(
        &'a self,
        _folder: &'a Path,
        _git_ref: &'a str,
    ) -> BoxFuture<'a, Vec<PathBuf>> {
        let changed = self.changed.clone();
        Box::pin(async move { Ok(changed) })
    }

    fn file_at_ref<'a>(
        &'a self,
        path: &'a Path,
        _git_ref: &'a str,
    ) -> BoxFuture<'a, Option<String>> {
        let contents = self.files.get(path).cloned();
        Box::pin(async move { Ok(contents) })
    }
}
