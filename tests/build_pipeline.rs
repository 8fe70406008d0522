use std::path::{Path, PathBuf};
use std::sync::Arc;

use recipeshard::config::ConfigFile;
use recipeshard::dag::ShardSpec;
use recipeshard::engine::{
    build_recipes, check_recipes, BuildRequest, BuildServices, PinningRequest,
};
use recipeshard::errors::RecipeshardError;
use recipeshard::fs::mock::MockFileSystem;
use recipeshard::fs::FileSystem;
use recipeshard::pinning::{MetaRenderer, PinningState, RepoData};
use recipeshard::recipe::FsMetadataSource;
use recipeshard::types::Platform;
use recipeshard_test_utils::builders::{add_recipe, record, ConfigFileBuilder, MetaBuilder};
use recipeshard_test_utils::fakes::{
    built, calls, new_log, purge_count, Call, CallLog, CountingWorkspace, FakeChangeDetector,
    FakeTargetBuilder, RecordingArtifactUploader,
};
use recipeshard_test_utils::init_tracing;

const RECIPES: &str = "repo/recipes";

/// `a`, `b` (runs on `a`), `c` (already published), `d` (blacklisted) and
/// `e` (independent).
fn repo() -> MockFileSystem {
    let fs = MockFileSystem::new();
    let root = Path::new(RECIPES);
    add_recipe(&fs, root, "a", &MetaBuilder::new("a", "1.0"));
    add_recipe(&fs, root, "b", &MetaBuilder::new("b", "1.0").run_dep("a"));
    add_recipe(&fs, root, "c", &MetaBuilder::new("c", "1.0"));
    add_recipe(&fs, root, "d", &MetaBuilder::new("d", "1.0").run_dep("a"));
    add_recipe(&fs, root, "e", &MetaBuilder::new("e", "1.0"));
    fs.add_file("repo/build-fail-blacklist", "d\n");
    fs
}

fn config() -> ConfigFile {
    ConfigFileBuilder::new()
        .channel("bioconda")
        .blacklist("build-fail-blacklist")
        .build()
        .with_root("repo")
}

fn pkg(name: &str) -> String {
    format!("repo/conda-bld/linux-64/{name}-1.0-0.tar.bz2")
}

fn services(fs: &MockFileSystem, log: &CallLog, builder: FakeTargetBuilder) -> BuildServices {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    BuildServices {
        metadata: Arc::new(FsMetadataSource::new(fs.clone())),
        fs,
        index: Box::new(RepoData::from_records(vec![record(
            "c",
            "1.0",
            "0",
            0,
            Platform::Linux,
        )])),
        changes: Box::new(FakeChangeDetector::new()),
        builder: Box::new(builder),
        workspace: Box::new(CountingWorkspace::new(log.clone())),
        artifact_uploader: None,
        image_uploader: None,
    }
}

#[tokio::test]
async fn builds_unpublished_recipes_in_order() {
    init_tracing();
    let fs = repo();
    let log = new_log();
    let request = BuildRequest::new(RECIPES, config());

    let report = build_recipes(&request, services(&fs, &log, FakeTargetBuilder::new(log.clone())))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(built(&log), vec![pkg("a"), pkg("b"), pkg("e")]);
    assert_eq!(report.total, 3);
    assert_eq!(purge_count(&log), 3);
}

#[tokio::test]
async fn forced_build_includes_published_recipes() {
    let fs = repo();
    let log = new_log();
    let mut request = BuildRequest::new(RECIPES, config());
    request.force = true;

    let report = build_recipes(&request, services(&fs, &log, FakeTargetBuilder::new(log.clone())))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(built(&log), vec![pkg("a"), pkg("b"), pkg("c"), pkg("e")]);
}

#[tokio::test]
async fn failed_dependency_fails_the_run() {
    let fs = repo();
    let log = new_log();
    let request = BuildRequest::new(RECIPES, config());

    let builder = FakeTargetBuilder::new(log.clone()).fail(&pkg("a"));
    let report = build_recipes(&request, services(&fs, &log, builder))
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(built(&log), vec![pkg("a"), pkg("e")]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id(), "b");
}

#[tokio::test]
async fn shards_split_the_work() {
    let fs = repo();

    // Units are {a, b} and {e}.
    let mut seen = Vec::new();
    for index in 0..2 {
        let log = new_log();
        let mut request = BuildRequest::new(RECIPES, config());
        request.shard = ShardSpec::new(2, index).unwrap();

        let builder = FakeTargetBuilder::new(log.clone());
        let report = build_recipes(&request, services(&fs, &log, builder))
            .await
            .unwrap();
        assert!(report.is_success());
        seen.push(built(&log));
    }

    assert_eq!(seen, vec![vec![pkg("a"), pkg("b")], vec![pkg("e")]]);
}

#[tokio::test]
async fn shard_beyond_the_units_has_nothing_to_do() {
    let fs = repo();
    let log = new_log();
    let mut request = BuildRequest::new(RECIPES, config());
    request.shard = ShardSpec::new(3, 2).unwrap();

    let report = build_recipes(&request, services(&fs, &log, FakeTargetBuilder::new(log.clone())))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.total, 0);
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn no_matching_recipes_is_a_successful_no_op() {
    let fs = repo();
    let log = new_log();
    let mut request = BuildRequest::new(RECIPES, config());
    request.packages = vec!["nothing-*".to_string()];

    let report = build_recipes(&request, services(&fs, &log, FakeTargetBuilder::new(log.clone())))
        .await
        .unwrap();

    assert!(report.is_success());
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn uploads_built_artifacts_with_label() {
    let fs = repo();
    let log = new_log();
    let mut request = BuildRequest::new(RECIPES, config());
    request.packages = vec!["e".to_string()];
    request.label = Some("main".to_string());

    let uploader = RecordingArtifactUploader::new(log.clone());
    let labels = uploader.labels();
    let mut services = services(&fs, &log, FakeTargetBuilder::new(log.clone()));
    services.artifact_uploader = Some(Box::new(uploader));

    let report = build_recipes(&request, services).await.unwrap();

    assert!(report.is_success());
    assert_eq!(
        calls(&log),
        vec![Call::Build(pkg("e")), Call::Upload(pkg("e")), Call::Purge]
    );
    assert_eq!(*labels.lock().unwrap(), vec![Some("main".to_string())]);
}

#[tokio::test]
async fn quick_needs_the_config_path() {
    let fs = repo();
    let log = new_log();
    let mut request = BuildRequest::new(RECIPES, config());
    request.quick = true;

    let result =
        build_recipes(&request, services(&fs, &log, FakeTargetBuilder::new(log.clone()))).await;

    assert!(matches!(result, Err(RecipeshardError::ConfigError(_))));
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn quick_builds_changed_and_unblacklisted_recipes() {
    init_tracing();
    let fs = repo();
    let log = new_log();
    let mut request = BuildRequest::new(RECIPES, config());
    request.quick = true;
    request.config_path = Some(PathBuf::from("repo/recipeshard.toml"));

    let mut services = services(&fs, &log, FakeTargetBuilder::new(log.clone()));
    services.changes = Box::new(
        FakeChangeDetector::new()
            .changed("b/build.sh")
            .file("repo/recipeshard.toml", "blacklists = [\"build-fail-blacklist\"]\n")
            .file("repo/build-fail-blacklist", "d\ne\n"),
    );

    let report = build_recipes(&request, services).await.unwrap();

    // `b` changed, `e` left the blacklist; `a` is untouched and not rebuilt.
    assert!(report.is_success());
    assert_eq!(built(&log), vec![pkg("b"), pkg("e")]);
}

#[test]
fn pinning_check_classifies_the_recipe_folder() {
    init_tracing();
    let fs = MockFileSystem::new();
    let root = Path::new(RECIPES);
    let pysam = MetaBuilder::new("pysam", "0.15")
        .host_dep("python")
        .run_dep("python");
    add_recipe(&fs, root, "pysam", &pysam);
    add_recipe(&fs, root, "plain", &MetaBuilder::new("plain", "1.0"));
    fs.add_file("repo/build-fail-blacklist", "");

    let config = ConfigFileBuilder::new()
        .variant("python", &["3.8", "3.9"])
        .blacklist("build-fail-blacklist")
        .build()
        .with_root("repo");
    let request = PinningRequest {
        recipe_folder: PathBuf::from(RECIPES),
        config,
        packages: vec!["*".to_string()],
        skip_variant_keys: Default::default(),
    };

    let fs: Arc<dyn FileSystem> = Arc::new(fs);
    let renderer = MetaRenderer::new(Arc::new(FsMetadataSource::new(fs.clone())));
    let index = RepoData::from_records(vec![
        record("pysam", "0.15", "py38_0", 0, Platform::Linux),
        record("plain", "1.0", "0", 0, Platform::Linux),
    ]);

    let summary = check_recipes(&request, fs.as_ref(), &renderer, &index).unwrap();

    let states: Vec<(&str, PinningState)> = summary
        .results
        .iter()
        .map(|(r, s)| (r.id(), *s))
        .collect();
    assert_eq!(
        states,
        vec![
            ("plain", PinningState::HAVE),
            ("pysam", PinningState::HAVE | PinningState::BUMP),
        ]
    );
    assert_eq!(summary.tally["HAVE"], 2);
    assert_eq!(summary.tally["BUMP"], 1);
    assert_eq!(summary.tally["FAIL"], 0);
    assert_eq!(summary.needs_bump().map(|r| r.id()).collect::<Vec<_>>(), vec!["pysam"]);
}
