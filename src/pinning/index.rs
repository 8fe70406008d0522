// src/pinning/index.rs

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{RecipeshardError, Result};
use crate::fs::FileSystem;
use crate::types::Platform;

/// One published build in a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub build: String,
    pub build_number: u64,
    pub platform: Platform,
}

/// Filters for [`PackageIndex::query`]. Unset fields match anything; an
/// empty `platforms` list matches every platform.
#[derive(Debug, Clone, Default)]
pub struct IndexQuery {
    pub name: Option<String>,
    pub version: Option<String>,
    pub build: Option<String>,
    pub build_number: Option<u64>,
    pub platforms: Vec<Platform>,
}

impl IndexQuery {
    pub fn package(name: &str, version: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            version: Some(version.to_string()),
            ..Self::default()
        }
    }

    pub fn build(mut self, build: &str) -> Self {
        self.build = Some(build.to_string());
        self
    }

    pub fn build_number(mut self, number: u64) -> Self {
        self.build_number = Some(number);
        self
    }

    pub fn platforms(mut self, platforms: &[Platform]) -> Self {
        self.platforms = platforms.to_vec();
        self
    }

    pub fn matches(&self, rec: &PackageRecord) -> bool {
        self.name.as_deref().is_none_or(|n| n == rec.name)
            && self.version.as_deref().is_none_or(|v| v == rec.version)
            && self.build.as_deref().is_none_or(|b| b == rec.build)
            && self.build_number.is_none_or(|n| n == rec.build_number)
            && (self.platforms.is_empty() || self.platforms.contains(&rec.platform))
    }
}

/// Query service over published packages.
pub trait PackageIndex: Send + Sync {
    fn query(&self, query: &IndexQuery) -> Result<Vec<PackageRecord>>;
}

/// In-memory index, typically loaded from channel `repodata.json` files.
#[derive(Debug, Clone, Default)]
pub struct RepoData {
    records: Vec<PackageRecord>,
}

impl RepoData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<PackageRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add the packages of one `repodata.json` document.
    pub fn add_repodata_json(&mut self, contents: &str) -> Result<usize> {
        let doc: RepodataFile = serde_json::from_str(contents)?;
        let default_subdir = doc.info.and_then(|i| i.subdir);

        let mut added = 0;
        for (file, entry) in doc.packages.into_iter().chain(doc.packages_conda) {
            let Some(subdir) = entry.subdir.as_deref().or(default_subdir.as_deref()) else {
                debug!(file = %file, "repodata entry without subdir; skipping");
                continue;
            };
            let Ok(platform) = subdir.parse::<Platform>() else {
                debug!(file = %file, subdir = %subdir, "unsupported subdir; skipping");
                continue;
            };
            self.records.push(PackageRecord {
                name: entry.name,
                version: entry.version,
                build: entry.build,
                build_number: entry.build_number,
                platform,
            });
            added += 1;
        }
        Ok(added)
    }

    /// Load and merge several `repodata.json` files.
    pub fn load<P: AsRef<Path>>(fs: &dyn FileSystem, paths: &[P]) -> Result<Self> {
        let mut repo = Self::new();
        for path in paths {
            let path = path.as_ref();
            let contents = fs.read_to_string(path)?;
            let added = repo.add_repodata_json(&contents).map_err(|e| {
                warn!(path = ?path, error = %e, "failed to parse repodata");
                RecipeshardError::ConfigError(format!("invalid repodata file {path:?}: {e}"))
            })?;
            debug!(path = ?path, packages = added, "loaded repodata");
        }
        Ok(repo)
    }
}

impl PackageIndex for RepoData {
    fn query(&self, query: &IndexQuery) -> Result<Vec<PackageRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|rec| query.matches(rec))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct RepodataFile {
    #[serde(default)]
    info: Option<RepodataInfo>,
    #[serde(default)]
    packages: BTreeMap<String, RepodataEntry>,
    #[serde(default, rename = "packages.conda")]
    packages_conda: BTreeMap<String, RepodataEntry>,
}

#[derive(Debug, Deserialize)]
struct RepodataInfo {
    #[serde(default)]
    subdir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepodataEntry {
    name: String,
    version: String,
    build: String,
    #[serde(default)]
    build_number: u64,
    #[serde(default)]
    subdir: Option<String>,
}
