// src/dag/ledger.rs

use std::collections::BTreeMap;

use crate::recipe::{PackageName, RecipeRef};

/// Package names that must not be built in this run, with the failed
/// recipes responsible. Entries are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipLedger {
    entries: BTreeMap<PackageName, Vec<RecipeRef>>,
}

impl SkipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `name` is blocked by `blocker`. Duplicates are kept.
    pub fn block(&mut self, name: &str, blocker: &RecipeRef) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .push(blocker.clone());
    }

    /// Blocking recipes for `name`, or `None` if it may be built.
    pub fn blockers(&self, name: &str) -> Option<&[RecipeRef]> {
        self.entries.get(name).map(|v| v.as_slice())
    }

    pub fn into_entries(self) -> BTreeMap<PackageName, Vec<RecipeRef>> {
        self.entries
    }
}
