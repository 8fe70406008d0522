use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use recipeshard::config::Blacklist;
use recipeshard::dag::{build_dependency_graph, BuildScheduler, FailedUpload, RecipeGraph};
use recipeshard::errors::RecipeshardError;
use recipeshard::recipe::{RecipeRef, Target};
use recipeshard_test_utils::builders::{recipe, target, MetaBuilder};
use recipeshard_test_utils::fakes::{
    built, calls, new_log, purge_count, Call, CallLog, CountingWorkspace, FakeTargetBuilder,
    RecordingArtifactUploader, RecordingImageUploader, StaticMetadata,
};
use recipeshard_test_utils::init_tracing;

fn pkg(id: &str) -> String {
    format!("out/linux-64/{id}-1.0-0.tar.bz2")
}

/// Recipes named after their ids; `deps` are `(recipe, [run deps])`.
fn setup(deps: &[(&str, &[&str])]) -> (RecipeGraph, BTreeMap<RecipeRef, Vec<Target>>) {
    let mut metadata = StaticMetadata::new();
    let mut recipes = Vec::new();
    let mut targets = BTreeMap::new();

    for (id, run) in deps {
        let mut meta = MetaBuilder::new(id, "1.0");
        for dep in *run {
            meta = meta.run_dep(dep);
        }
        metadata = metadata.with(id, meta.build());

        let r = recipe(id);
        targets.insert(r.clone(), vec![target(&r, &pkg(id))]);
        recipes.push(r);
    }

    let graph = build_dependency_graph(&recipes, &metadata, &Blacklist::new())
        .expect("graph should build");
    (graph, targets)
}

fn scheduler(log: &CallLog, builder: FakeTargetBuilder) -> BuildScheduler {
    BuildScheduler::new(Box::new(builder), Box::new(CountingWorkspace::new(log.clone())))
}

#[tokio::test]
async fn builds_in_dependency_order() {
    init_tracing();

    let (graph, targets) = setup(&[("c", &["b"]), ("b", &["a"]), ("a", &[]), ("d", &[])]);
    let log = new_log();
    let mut sched = scheduler(&log, FakeTargetBuilder::new(log.clone()));

    let report = sched
        .schedule(&graph.graph, &graph, &targets)
        .await
        .expect("schedule should succeed");

    assert!(report.success);
    assert_eq!(built(&log), vec![pkg("a"), pkg("b"), pkg("c"), pkg("d")]);
    assert_eq!(report.built, vec![recipe("a"), recipe("b"), recipe("c"), recipe("d")]);
    assert_eq!(report.total, 4);
    assert_eq!(purge_count(&log), 4);
}

#[tokio::test]
async fn failure_skips_descendants_but_not_independent_recipes() {
    init_tracing();

    let (graph, targets) = setup(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("d", &[])]);
    let log = new_log();
    let mut sched = scheduler(&log, FakeTargetBuilder::new(log.clone()).fail(&pkg("a")));

    let report = sched
        .schedule(&graph.graph, &graph, &targets)
        .await
        .expect("schedule should succeed");

    assert!(!report.success);
    assert_eq!(built(&log), vec![pkg("a"), pkg("d")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].recipe, recipe("a"));
    assert_eq!(report.skipped, vec![recipe("b"), recipe("c")]);
    assert_eq!(report.skip_reasons["b"], vec![recipe("a")]);
    assert_eq!(report.skip_reasons["c"], vec![recipe("a")]);
    assert_eq!(report.built, vec![recipe("d")]);
    assert_eq!(purge_count(&log), 2);
}

#[tokio::test]
async fn failure_of_second_target_keeps_recipe_out_of_built_set() {
    init_tracing();

    let (graph, mut targets) = setup(&[("x", &[])]);
    let x = recipe("x");
    let py = |v: &str| {
        let env = [("CONDA_PY".to_string(), v.to_string())].into();
        Target::new(x.clone(), env, format!("out/x-1.0-py{v}_0.tar.bz2"))
    };
    let (t1, t2) = (py("38"), py("39"));
    targets.insert(x.clone(), vec![t1.clone(), t2.clone()]);

    let log = new_log();
    let builder = FakeTargetBuilder::new(log.clone()).fail("out/x-1.0-py39_0.tar.bz2");
    let mut sched = scheduler(&log, builder);

    let report = sched
        .schedule(&graph.graph, &graph, &targets)
        .await
        .expect("schedule should succeed");

    assert!(!report.success);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].target, t2);
    assert!(report.built.is_empty());
    assert_eq!(
        built(&log),
        vec!["out/x-1.0-py38_0.tar.bz2".to_string(), "out/x-1.0-py39_0.tar.bz2".to_string()]
    );
    assert_eq!(purge_count(&log), 2);
}

#[tokio::test]
async fn upload_failure_is_recorded_and_workspace_still_purged() {
    init_tracing();

    let (graph, targets) = setup(&[("a", &[]), ("b", &["a"])]);
    let log = new_log();
    let uploader = RecordingArtifactUploader::new(log.clone()).fail(&pkg("a"));
    let mut sched = scheduler(&log, FakeTargetBuilder::new(log.clone()))
        .with_artifact_upload(Box::new(uploader), None);

    let report = sched
        .schedule(&graph.graph, &graph, &targets)
        .await
        .expect("schedule should succeed");

    assert!(!report.success);
    assert!(report.failed.is_empty());
    assert!(report.skipped.is_empty());
    assert_eq!(report.built, vec![recipe("a"), recipe("b")]);
    assert_eq!(
        report.failed_uploads,
        vec![FailedUpload::Artifact(pkg("a").into())]
    );
    assert_eq!(
        calls(&log),
        vec![
            Call::Build(pkg("a")),
            Call::Upload(pkg("a")),
            Call::Purge,
            Call::Build(pkg("b")),
            Call::Upload(pkg("b")),
            Call::Purge,
        ]
    );
}

#[tokio::test]
async fn upload_error_counts_as_failed_upload() {
    init_tracing();

    let (graph, targets) = setup(&[("a", &[])]);
    let log = new_log();
    let uploader = RecordingArtifactUploader::new(log.clone()).error(&pkg("a"));
    let mut sched = scheduler(&log, FakeTargetBuilder::new(log.clone()))
        .with_artifact_upload(Box::new(uploader), Some("testing".to_string()));

    let report = sched
        .schedule(&graph.graph, &graph, &targets)
        .await
        .expect("upload errors must not abort the run");

    assert!(!report.success);
    assert_eq!(report.built, vec![recipe("a")]);
    assert_eq!(report.failed_uploads.len(), 1);
    assert_eq!(purge_count(&log), 1);
}

#[tokio::test]
async fn upload_gets_configured_label() {
    init_tracing();

    let (graph, targets) = setup(&[("a", &[])]);
    let log = new_log();
    let uploader = RecordingArtifactUploader::new(log.clone());
    let labels = uploader.labels();
    let mut sched = scheduler(&log, FakeTargetBuilder::new(log.clone()))
        .with_artifact_upload(Box::new(uploader), Some("testing".to_string()));

    let report = sched
        .schedule(&graph.graph, &graph, &targets)
        .await
        .expect("schedule should succeed");

    assert!(report.success);
    assert_eq!(*labels.lock().unwrap(), vec![Some("testing".to_string())]);
}

#[tokio::test]
async fn test_image_is_pushed_and_push_failure_recorded() {
    init_tracing();

    let (graph, targets) = setup(&[("a", &[]), ("b", &[])]);
    let log = new_log();
    let builder =
        FakeTargetBuilder::new(log.clone()).image(&pkg("a"), "quay.io/biocontainers/a:1.0--0");
    let mut sched = scheduler(&log, builder).with_image_upload(
        Box::new(RecordingImageUploader::new(log.clone()).failing()),
        "biocontainers".to_string(),
    );

    let report = sched
        .schedule(&graph.graph, &graph, &targets)
        .await
        .expect("schedule should succeed");

    // `b` produced no image, so only `a` is pushed.
    assert_eq!(
        calls(&log),
        vec![
            Call::Build(pkg("a")),
            Call::ImageUpload(
                "quay.io/biocontainers/a:1.0--0".to_string(),
                "biocontainers".to_string()
            ),
            Call::Purge,
            Call::Build(pkg("b")),
            Call::Purge,
        ]
    );
    assert_eq!(
        report.failed_uploads,
        vec![FailedUpload::Image("quay.io/biocontainers/a:1.0--0".to_string())]
    );
    assert_eq!(report.built, vec![recipe("a"), recipe("b")]);
    assert!(!report.success);
}

#[tokio::test]
async fn test_only_never_uploads() {
    init_tracing();

    let (graph, targets) = setup(&[("a", &[])]);
    let log = new_log();
    let mut sched = scheduler(&log, FakeTargetBuilder::new(log.clone()).image(&pkg("a"), "img"))
        .with_artifact_upload(Box::new(RecordingArtifactUploader::new(log.clone())), None)
        .with_image_upload(Box::new(RecordingImageUploader::new(log.clone())), "t".to_string())
        .test_only(true);

    let report = sched
        .schedule(&graph.graph, &graph, &targets)
        .await
        .expect("schedule should succeed");

    assert!(report.success);
    assert_eq!(calls(&log), vec![Call::Build(pkg("a")), Call::Purge]);
}

#[tokio::test]
async fn empty_shard_is_a_successful_no_op() {
    init_tracing();

    let (graph, targets) = setup(&[("a", &[])]);
    let log = new_log();
    let mut sched = scheduler(&log, FakeTargetBuilder::new(log.clone()));

    let empty = recipeshard::dag::DependencyGraph::new();
    let report = sched
        .schedule(&empty, &graph, &targets)
        .await
        .expect("schedule should succeed");

    assert!(report.success);
    assert_eq!(report.total, 0);
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn unexpected_builder_error_aborts_after_purge() {
    init_tracing();

    let (graph, targets) = setup(&[("a", &[]), ("b", &[])]);
    let log = new_log();
    let builder = FakeTargetBuilder::new(log.clone()).error(&pkg("a"), "docker daemon went away");
    let mut sched = scheduler(&log, builder);

    let result = sched.schedule(&graph.graph, &graph, &targets).await;

    assert!(matches!(result, Err(RecipeshardError::Other(_))));
    assert_eq!(calls(&log), vec![Call::Build(pkg("a")), Call::Purge]);
}

#[tokio::test]
async fn recipes_sharing_a_name_are_all_attempted() {
    init_tracing();

    let metadata = StaticMetadata::new()
        .with("samtools/1.9", MetaBuilder::new("samtools", "1.9").build())
        .with("samtools/1.10", MetaBuilder::new("samtools", "1.10").build())
        .with("bcftools", MetaBuilder::new("bcftools", "1.10").run_dep("samtools").build());
    let recipes = vec![recipe("samtools/1.9"), recipe("samtools/1.10"), recipe("bcftools")];
    let graph = build_dependency_graph(&recipes, &metadata, &Blacklist::new())
        .expect("graph should build");

    let mut targets = BTreeMap::new();
    for r in &recipes {
        let pkg = format!("out/{}.tar.bz2", r.id().replace('/', "-"));
        targets.insert(r.clone(), vec![target(r, &pkg)]);
    }

    let log = new_log();
    let builder = FakeTargetBuilder::new(log.clone()).fail("out/samtools-1.9.tar.bz2");
    let mut sched = scheduler(&log, builder);

    let report = sched
        .schedule(&graph.graph, &graph, &targets)
        .await
        .expect("schedule should succeed");

    assert_eq!(
        built(&log),
        vec!["out/samtools-1.9.tar.bz2".to_string(), "out/samtools-1.10.tar.bz2".to_string()]
    );
    assert_eq!(report.built, vec![recipe("samtools/1.10")]);
    assert_eq!(report.skipped, vec![recipe("bcftools")]);
    assert_eq!(report.skip_reasons["bcftools"], vec![recipe("samtools/1.9")]);
}

#[tokio::test]
async fn recipe_without_targets_is_neither_built_nor_failed() {
    init_tracing();

    let (graph, mut targets) = setup(&[("a", &[]), ("b", &["a"])]);
    targets.insert(recipe("a"), Vec::new());
    let log = new_log();
    let mut sched = scheduler(&log, FakeTargetBuilder::new(log.clone()));

    let report = sched
        .schedule(&graph.graph, &graph, &targets)
        .await
        .expect("schedule should succeed");

    assert!(report.success);
    assert_eq!(built(&log), vec![pkg("b")]);
    assert_eq!(report.built, vec![recipe("b")]);
    assert!(report.failed.is_empty());
    assert_eq!(purge_count(&log), 1);
}

/// Recipe `p{i}` may only depend on recipes `p0..p{i}`, so the graph is a DAG.
fn dag_strategy(max_recipes: usize) -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    (1..=max_recipes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..3), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let deps: BTreeSet<String> = picks
                            .into_iter()
                            .filter(|_| i > 0)
                            .map(|p| format!("p{}", p % i.max(1)))
                            .collect();
                        (format!("p{i}"), deps.into_iter().collect())
                    })
                    .collect()
            },
        )
    })
}

proptest! {
    #[test]
    fn scheduling_respects_dependencies_and_failures(
        recipes in dag_strategy(8),
        failing in proptest::collection::btree_set(0..8usize, 0..3),
    ) {
        let deps: Vec<Vec<&str>> = recipes
            .iter()
            .map(|(_, d)| d.iter().map(String::as_str).collect())
            .collect();
        let spec: Vec<(&str, &[&str])> = recipes
            .iter()
            .zip(&deps)
            .map(|((id, _), d)| (id.as_str(), d.as_slice()))
            .collect();
        let (graph, targets) = setup(&spec);

        let log = new_log();
        let mut builder = FakeTargetBuilder::new(log.clone());
        for i in failing.iter().filter(|i| **i < recipes.len()) {
            builder = builder.fail(&pkg(&format!("p{i}")));
        }
        let mut sched = scheduler(&log, builder);

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let report = runtime
            .block_on(sched.schedule(&graph.graph, &graph, &targets))
            .unwrap();

        // Every dependency that was attempted ran first.
        let attempted = built(&log);
        let position: BTreeMap<String, usize> = attempted
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect();
        for (id, deps) in &recipes {
            if let Some(at) = position.get(&pkg(id)) {
                for dep in deps {
                    let dep_at = position.get(&pkg(dep));
                    prop_assert!(dep_at.is_some(), "{} ran but {} never did", id, dep);
                    prop_assert!(dep_at.unwrap() < at, "{} ran before {}", id, dep);
                }
            }
        }

        // Each failure skips all of its descendants and is named as a blocker.
        for failure in &report.failed {
            for descendant in graph.graph.descendants(failure.recipe.id()) {
                prop_assert!(report.skipped.contains(&recipe(&descendant)));
                prop_assert!(report.skip_reasons[&descendant].contains(&failure.recipe));
            }
        }

        prop_assert_eq!(attempted.len() + report.skipped.len(), recipes.len());
        prop_assert_eq!(purge_count(&log), attempted.len());
        prop_assert_eq!(report.built.len() + report.failed.len(), attempted.len());
        prop_assert_eq!(report.success, report.failed.is_empty());
    }
}
