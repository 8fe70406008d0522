#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use recipeshard::config::{ConfigFile, ContainerSection, IndexSource, RawConfigFile};
use recipeshard::dag::DependencyGraph;
use recipeshard::fs::mock::MockFileSystem;
use recipeshard::pinning::{PackageRecord, Variant};
use recipeshard::recipe::meta::parse_meta;
use recipeshard::recipe::{RecipeMeta, RecipeRef, Requirements, Target, META_FILE};
use recipeshard::types::{NoarchKind, Platform};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn channel(mut self, channel: &str) -> Self {
        self.config.channels.push(channel.to_string());
        self
    }

    pub fn check_channels(mut self, channels: &[&str]) -> Self {
        self.config.check_channels = Some(channels.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn blacklist(mut self, path: &str) -> Self {
        self.config.blacklists.push(PathBuf::from(path));
        self
    }

    pub fn env_axis(mut self, key: &str, values: &[&str]) -> Self {
        self.config
            .env_matrix
            .insert(key.to_string(), values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn variant(mut self, key: &str, values: &[&str]) -> Self {
        self.config
            .variants
            .insert(key.to_string(), values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn output_dir(mut self, dir: &str) -> Self {
        self.config.tools.output_dir = PathBuf::from(dir);
        self
    }

    pub fn container(mut self, image: &str) -> Self {
        self.config.tools.container = Some(ContainerSection {
            image: image.to_string(),
            runtime: "docker".to_string(),
            output_mount: PathBuf::from("/opt/conda/conda-bld"),
            forward_env_prefixes: vec!["TRAVIS".to_string()],
        });
        self
    }

    pub fn index_source(mut self, channel: &str, path: &str) -> Self {
        self.config.index.sources.push(IndexSource {
            channel: channel.to_string(),
            path: PathBuf::from(path),
        });
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `meta.toml` contents.
#[derive(Debug, Clone)]
pub struct MetaBuilder {
    name: String,
    version: String,
    number: u64,
    string: Option<String>,
    noarch: Option<&'static str>,
    skip: bool,
    build: Vec<String>,
    host: Vec<String>,
    run: Vec<String>,
}

impl MetaBuilder {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            number: 0,
            string: None,
            noarch: None,
            skip: false,
            build: Vec::new(),
            host: Vec::new(),
            run: Vec::new(),
        }
    }

    pub fn number(mut self, number: u64) -> Self {
        self.number = number;
        self
    }

    pub fn string(mut self, string: &str) -> Self {
        self.string = Some(string.to_string());
        self
    }

    pub fn noarch_python(mut self) -> Self {
        self.noarch = Some("python");
        self
    }

    pub fn noarch_generic(mut self) -> Self {
        self.noarch = Some("generic");
        self
    }

    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn build_dep(mut self, spec: &str) -> Self {
        self.build.push(spec.to_string());
        self
    }

    pub fn host_dep(mut self, spec: &str) -> Self {
        self.host.push(spec.to_string());
        self
    }

    pub fn run_dep(mut self, spec: &str) -> Self {
        self.run.push(spec.to_string());
        self
    }

    pub fn to_toml(&self) -> String {
        let list = |items: &[String]| {
            items
                .iter()
                .map(|i| format!("{i:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut out = format!(
            "[package]\nname = {:?}\nversion = {:?}\n\n[build]\nnumber = {}\nskip = {}\n",
            self.name, self.version, self.number, self.skip
        );
        if let Some(string) = &self.string {
            out.push_str(&format!("string = {string:?}\n"));
        }
        if let Some(noarch) = self.noarch {
            out.push_str(&format!("noarch = {noarch:?}\n"));
        }
        out.push_str(&format!(
            "\n[requirements]\nbuild = [{}]\nhost = [{}]\nrun = [{}]\n",
            list(&self.build),
            list(&self.host),
            list(&self.run)
        ));
        out
    }

    pub fn build(&self) -> RecipeMeta {
        parse_meta(&RecipeRef::new(&self.name, &self.name), &self.to_toml())
            .expect("MetaBuilder produced invalid meta.toml")
    }
}

/// Write a recipe below `folder` in the mock filesystem.
pub fn add_recipe(fs: &MockFileSystem, folder: &Path, id: &str, meta: &MetaBuilder) -> RecipeRef {
    let dir = folder.join(id);
    fs.add_file(dir.join(META_FILE), meta.to_toml());
    RecipeRef::new(id, dir)
}

/// Recipe reference whose id and path are both `id`.
pub fn recipe(id: &str) -> RecipeRef {
    RecipeRef::new(id, PathBuf::from("recipes").join(id))
}

/// Target with an empty env and the given artifact path.
pub fn target(recipe: &RecipeRef, pkg: &str) -> Target {
    Target::new(recipe.clone(), Default::default(), pkg)
}

/// Builder for rendered variants.
#[derive(Debug, Clone)]
pub struct VariantBuilder {
    variant: Variant,
}

impl VariantBuilder {
    pub fn new(name: &str, version: &str, build_string: &str) -> Self {
        Self {
            variant: Variant {
                name: name.to_string(),
                version: version.to_string(),
                build_number: 0,
                build_string: build_string.to_string(),
                noarch: None,
                used_vars: BTreeSet::new(),
                requirements: Requirements::default(),
                skip: false,
            },
        }
    }

    pub fn number(mut self, number: u64) -> Self {
        self.variant.build_number = number;
        self
    }

    pub fn noarch(mut self, kind: NoarchKind) -> Self {
        self.variant.noarch = Some(kind);
        self
    }

    pub fn build_dep(mut self, spec: &str) -> Self {
        self.variant.requirements.build.push(spec.to_string());
        self
    }

    pub fn host_dep(mut self, spec: &str) -> Self {
        self.variant.requirements.host.push(spec.to_string());
        self
    }

    pub fn run_dep(mut self, spec: &str) -> Self {
        self.variant.requirements.run.push(spec.to_string());
        self
    }

    pub fn used_var(mut self, key: &str) -> Self {
        self.variant.used_vars.insert(key.to_string());
        self
    }

    pub fn skip(mut self) -> Self {
        self.variant.skip = true;
        self
    }

    pub fn build(self) -> Variant {
        self.variant
    }
}

pub fn record(
    name: &str,
    version: &str,
    build: &str,
    number: u64,
    platform: Platform,
) -> PackageRecord {
    PackageRecord {
        name: name.to_string(),
        version: version.to_string(),
        build: build.to_string(),
        build_number: number,
        platform,
    }
}

/// Graph with the given nodes and `(dependency, dependent)` edges.
pub fn graph_of(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for node in nodes {
        graph.add_package(node);
    }
    for (dep, dependent) in edges {
        graph.add_dependency(dep, dependent);
    }
    graph
}
