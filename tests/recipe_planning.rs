use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use recipeshard::config::Blacklist;
use recipeshard::fs::mock::MockFileSystem;
use recipeshard::pinning::RepoData;
use recipeshard::recipe::{
    discover_recipes, filter_blacklisted, EnvMatrix, FsMetadataSource, TargetPlanner,
};
use recipeshard::types::Platform;
use recipeshard_test_utils::builders::{add_recipe, record, MetaBuilder};
use recipeshard_test_utils::init_tracing;

fn ids(recipes: &[recipeshard::recipe::RecipeRef]) -> Vec<&str> {
    recipes.iter().map(|r| r.id()).collect()
}

fn tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    let root = Path::new("recipes");
    add_recipe(&fs, root, "samtools", &MetaBuilder::new("samtools", "1.10"));
    add_recipe(&fs, root, "bowtie2", &MetaBuilder::new("bowtie2", "2.3.0"));
    add_recipe(&fs, root, "bowtie2/2.2.9", &MetaBuilder::new("bowtie2", "2.2.9"));
    add_recipe(&fs, root, "pysam", &MetaBuilder::new("pysam", "0.15"));
    fs.add_file("recipes/README.md", "not a recipe");
    fs
}

#[test]
fn discovery_finds_nested_recipes_sorted() {
    init_tracing();
    let fs = tree();

    let recipes = discover_recipes(&fs, Path::new("recipes"), &["*".to_string()]).unwrap();

    assert_eq!(ids(&recipes), vec!["bowtie2", "bowtie2/2.2.9", "pysam", "samtools"]);
    assert_eq!(recipes[1].path(), Path::new("recipes/bowtie2/2.2.9"));
}

#[test]
fn discovery_honours_package_globs() {
    let fs = tree();

    let recipes = discover_recipes(
        &fs,
        Path::new("recipes"),
        &["bowtie2*".to_string(), "py*".to_string()],
    )
    .unwrap();

    // `*` also matches `/`, so the nested version is selected too.
    assert_eq!(ids(&recipes), vec!["bowtie2", "bowtie2/2.2.9", "pysam"]);
}

#[test]
fn invalid_glob_is_an_error() {
    let fs = tree();
    assert!(discover_recipes(&fs, Path::new("recipes"), &["[".to_string()]).is_err());
}

#[test]
fn blacklisted_recipes_are_filtered() {
    let fs = tree();
    let recipes = discover_recipes(&fs, Path::new("recipes"), &[]).unwrap();
    let blacklist: Blacklist = ["samtools".to_string(), "bowtie2/2.2.9/".to_string()]
        .into_iter()
        .collect();

    let kept = filter_blacklisted(recipes, &blacklist);

    assert_eq!(ids(&kept), vec!["bowtie2", "pysam"]);
}

#[test]
fn env_matrix_is_a_cartesian_product() {
    let mut axes = BTreeMap::new();
    axes.insert("CONDA_PY".to_string(), vec!["38".to_string(), "39".to_string()]);
    axes.insert("CONDA_R".to_string(), vec!["4.1".to_string()]);

    let envs = EnvMatrix::new(axes).expand();

    assert_eq!(envs.len(), 2);
    assert_eq!(envs[0]["CONDA_PY"], "38");
    assert_eq!(envs[1]["CONDA_PY"], "39");
    assert!(envs.iter().all(|e| e["CONDA_R"] == "4.1"));

    assert_eq!(EnvMatrix::default().expand(), vec![BTreeMap::new()]);
}

fn python_matrix() -> EnvMatrix {
    let mut axes = BTreeMap::new();
    axes.insert("python".to_string(), vec!["3.8".to_string(), "3.9".to_string()]);
    EnvMatrix::new(axes)
}

#[test]
fn planner_expands_and_dedupes_targets() {
    init_tracing();
    let fs = MockFileSystem::new();
    let root = Path::new("recipes");
    let meta = MetaBuilder::new("pysam", "0.15")
        .host_dep("python")
        .run_dep("python");
    let pysam = add_recipe(&fs, root, "pysam", &meta);
    let plain = add_recipe(&fs, root, "plain", &MetaBuilder::new("plain", "1.0"));
    let metadata = FsMetadataSource::new(Arc::new(fs));
    let index = RepoData::new();

    let planned = TargetPlanner::new(&metadata, &index, "out")
        .plan(&[pysam.clone(), plain.clone()], &python_matrix())
        .unwrap();

    let pysam_pkgs: Vec<PathBuf> = planned[&pysam].iter().map(|t| t.pkg.clone()).collect();
    assert_eq!(
        pysam_pkgs,
        vec![
            PathBuf::from("out/linux-64/pysam-0.15-py38_0.tar.bz2"),
            PathBuf::from("out/linux-64/pysam-0.15-py39_0.tar.bz2"),
        ]
    );
    assert_eq!(planned[&pysam][0].envstring(), "python=3.8");

    // Independent of python, so both environments produce the same artifact.
    assert_eq!(planned[&plain].len(), 1);
    assert_eq!(planned[&plain][0].pkg, PathBuf::from("out/linux-64/plain-1.0-0.tar.bz2"));
}

#[test]
fn planner_drops_published_targets_unless_forced() {
    let fs = MockFileSystem::new();
    let root = Path::new("recipes");
    let meta = MetaBuilder::new("pysam", "0.15").host_dep("python");
    let pysam = add_recipe(&fs, root, "pysam", &meta);
    let done = add_recipe(&fs, root, "done", &MetaBuilder::new("done", "2.0"));
    let metadata = FsMetadataSource::new(Arc::new(fs));
    let index = RepoData::from_records(vec![
        record("pysam", "0.15", "py38_0", 0, Platform::Linux),
        record("done", "2.0", "0", 0, Platform::Linux),
    ]);

    let planned = TargetPlanner::new(&metadata, &index, "out")
        .plan(&[pysam.clone(), done.clone()], &python_matrix())
        .unwrap();

    assert!(!planned.contains_key(&done));
    assert_eq!(planned[&pysam].len(), 1);
    assert_eq!(planned[&pysam][0].env["python"], "3.9");

    let forced = TargetPlanner::new(&metadata, &index, "out")
        .force(true)
        .plan(&[pysam.clone(), done.clone()], &python_matrix())
        .unwrap();
    assert_eq!(forced[&pysam].len(), 2);
    assert_eq!(forced[&done].len(), 1);
}

#[test]
fn planner_puts_noarch_into_noarch_and_skips_skipped() {
    let fs = MockFileSystem::new();
    let root = Path::new("recipes");
    let pure = add_recipe(&fs, root, "pure", &MetaBuilder::new("pure", "1.0").noarch_generic());
    let skipped = add_recipe(&fs, root, "skipped", &MetaBuilder::new("skipped", "1.0").skip(true));
    let metadata = FsMetadataSource::new(Arc::new(fs));
    let index = RepoData::new();

    let planned = TargetPlanner::new(&metadata, &index, "out")
        .platform(Platform::Osx)
        .plan(&[pure.clone(), skipped.clone()], &EnvMatrix::default())
        .unwrap();

    assert_eq!(planned[&pure][0].pkg, PathBuf::from("out/noarch/pure-1.0-0.tar.bz2"));
    assert!(!planned.contains_key(&skipped));
}

#[test]
fn planner_reports_unreadable_metadata() {
    let fs = MockFileSystem::new();
    fs.add_file("recipes/broken/meta.toml", "[package]\nname = ");
    let metadata = FsMetadataSource::new(Arc::new(fs));
    let index = RepoData::new();
    let broken = recipeshard::recipe::RecipeRef::new("broken", "recipes/broken");

    let err = TargetPlanner::new(&metadata, &index, "out")
        .plan(&[broken], &EnvMatrix::default())
        .unwrap_err();

    assert!(matches!(err, recipeshard::errors::RecipeshardError::Render { .. }));
}
