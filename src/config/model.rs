// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::Platform;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// channels = ["bioconda", "conda-forge", "defaults"]
/// blacklists = ["build-fail-blacklist"]
///
/// [env_matrix]
/// CONDA_PY = ["38", "39"]
///
/// [variants]
/// python = ["3.8", "3.9"]
///
/// [tools]
/// output_dir = "/opt/conda/conda-bld"
///
/// [[index.sources]]
/// channel = "bioconda"
/// path = "repodata/bioconda/linux-64/repodata.json"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Channels passed to the build tool, highest priority first.
    #[serde(default)]
    pub channels: Vec<String>,

    /// Channels checked for already-published targets. `None` means the
    /// first entry of `channels`; an empty list disables the check.
    #[serde(default)]
    pub check_channels: Option<Vec<String>>,

    /// Blacklist files, one recipe id per line.
    #[serde(default)]
    pub blacklists: Vec<PathBuf>,

    #[serde(default)]
    pub env_matrix: BTreeMap<String, Vec<String>>,

    /// Build configuration used by the pinning check.
    #[serde(default)]
    pub variants: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub index: IndexSection,
}

/// `[tools]` section: how external collaborators are invoked.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    #[serde(default = "default_build")]
    pub build: Vec<String>,

    /// Appended to `build` for regular builds.
    #[serde(default = "default_build_args")]
    pub build_args: Vec<String>,

    /// Appended to `build` instead of `build_args` in test-only mode.
    #[serde(default = "default_test_only_args")]
    pub test_only_args: Vec<String>,

    /// Package test in a minimal container; the artifact path is appended.
    #[serde(default = "default_package_test")]
    pub package_test: Vec<String>,

    /// Registry namespace for images produced by the package test.
    #[serde(default = "default_image_namespace")]
    pub image_namespace: String,

    #[serde(default = "default_purge")]
    pub purge: Vec<String>,

    /// Artifact upload; `--label <label>` and the artifact path are appended.
    #[serde(default = "default_upload")]
    pub upload: Vec<String>,

    /// Image upload; the image name and the target are appended.
    #[serde(default = "default_image_upload")]
    pub image_upload: Vec<String>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub platform: Platform,

    #[serde(default)]
    pub container: Option<ContainerSection>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            build: default_build(),
            build_args: default_build_args(),
            test_only_args: default_test_only_args(),
            package_test: default_package_test(),
            image_namespace: default_image_namespace(),
            purge: default_purge(),
            upload: default_upload(),
            image_upload: default_image_upload(),
            output_dir: default_output_dir(),
            platform: Platform::default(),
            container: None,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_build() -> Vec<String> {
    strings(&["conda", "build", "--no-build-id"])
}

fn default_build_args() -> Vec<String> {
    strings(&["--no-anaconda-upload"])
}

fn default_test_only_args() -> Vec<String> {
    strings(&["--test"])
}

fn default_package_test() -> Vec<String> {
    strings(&["mulled-build", "build-and-test", "--package-path"])
}

fn default_image_namespace() -> String {
    "quay.io/biocontainers".to_string()
}

fn default_purge() -> Vec<String> {
    strings(&["conda", "build", "purge"])
}

fn default_upload() -> Vec<String> {
    strings(&["anaconda", "upload"])
}

fn default_image_upload() -> Vec<String> {
    strings(&["mulled-build", "push"])
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("conda-bld")
}

/// `[tools.container]`: run builds inside a container image.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerSection {
    pub image: String,

    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Where `tools.output_dir` is mounted inside the container.
    #[serde(default = "default_container_output")]
    pub output_mount: PathBuf,

    /// Host env vars with these prefixes are passed into the container.
    #[serde(default = "default_forward_env_prefixes")]
    pub forward_env_prefixes: Vec<String>,
}

fn default_runtime() -> String {
    "docker".to_string()
}

fn default_container_output() -> PathBuf {
    PathBuf::from("/opt/conda/conda-bld")
}

fn default_forward_env_prefixes() -> Vec<String> {
    strings(&["TRAVIS"])
}

/// `[index]` section: repodata backing the package index.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSection {
    #[serde(default)]
    pub sources: Vec<IndexSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSource {
    pub channel: String,
    pub path: PathBuf,
}

/// Validated configuration. Construct through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub channels: Vec<String>,
    pub check_channels: Option<Vec<String>>,
    pub blacklists: Vec<PathBuf>,
    pub env_matrix: BTreeMap<String, Vec<String>>,
    pub variants: BTreeMap<String, Vec<String>>,
    pub tools: ToolsSection,
    pub index: IndexSection,
    /// Directory relative paths in the config resolve against.
    root: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            channels: raw.channels,
            check_channels: raw.check_channels,
            blacklists: raw.blacklists,
            env_matrix: raw.env_matrix,
            variants: raw.variants,
            tools: raw.tools,
            index: raw.index,
            root: PathBuf::from("."),
        }
    }

    /// Resolve relative paths against `root` from now on.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Channels to look in for already-published targets.
    pub fn effective_check_channels(&self, overridden: Option<&[String]>) -> Vec<String> {
        match (overridden, &self.check_channels) {
            (Some(channels), _) => channels.to_vec(),
            (None, Some(channels)) => channels.clone(),
            (None, None) => self.channels.iter().take(1).cloned().collect(),
        }
    }

    /// Repodata files for the given channels, resolved.
    pub fn index_paths_for(&self, channels: &[String]) -> Vec<PathBuf> {
        self.index
            .sources
            .iter()
            .filter(|src| channels.contains(&src.channel))
            .map(|src| self.resolve(&src.path))
            .collect()
    }

    /// All configured repodata files, resolved.
    pub fn all_index_paths(&self) -> Vec<PathBuf> {
        self.index
            .sources
            .iter()
            .map(|src| self.resolve(&src.path))
            .collect()
    }
}
