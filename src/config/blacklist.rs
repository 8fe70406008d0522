// src/config/blacklist.rs

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;

/// Recipe ids excluded from building.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    entries: BTreeSet<String>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of all given blacklist files.
    pub fn load<P: AsRef<Path>>(fs: &dyn FileSystem, files: &[P]) -> Result<Self> {
        let mut blacklist = Self::new();
        for file in files {
            let file = file.as_ref();
            let contents = fs
                .read_to_string(file)
                .with_context(|| format!("reading blacklist {:?}", file))?;
            let before = blacklist.entries.len();
            blacklist.entries.extend(parse_blacklist(&contents));
            debug!(
                file = ?file,
                added = blacklist.entries.len() - before,
                "loaded blacklist"
            );
        }
        Ok(blacklist)
    }

    pub fn contains(&self, recipe_id: &str) -> bool {
        self.entries.contains(recipe_id.trim_end_matches('/'))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl FromIterator<String> for Blacklist {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// One recipe id per line; `#` starts a comment, blank lines are ignored.
pub fn parse_blacklist(contents: &str) -> BTreeSet<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.trim_end_matches('/').to_string())
        .collect()
}
