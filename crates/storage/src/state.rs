// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asset catalog materialized from WAL replay

use bb_core::{Asset, AssetId, Operation};
use std::collections::{BTreeMap, BTreeSet};

/// Current asset records plus the ids retired by deletion
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    assets: BTreeMap<AssetId, Asset>,
    retired: BTreeSet<AssetId>,
}

impl Catalog {
    /// Rebuild a catalog from replayed operations
    pub fn from_ops<'a>(ops: impl IntoIterator<Item = &'a Operation>) -> Self {
        let mut catalog = Self::default();
        for op in ops {
            catalog.apply(op);
        }
        catalog
    }

    /// Apply an operation to update the catalog
    ///
    /// Upserts of retired ids are ignored; the repository rejects them
    /// before they reach the log, so this only matters for hand-edited logs.
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::AssetUpsert { asset } => {
                if !self.retired.contains(&asset.id) {
                    self.assets.insert(asset.id.clone(), asset.clone());
                }
            }
            Operation::AssetRemove { id } => {
                self.assets.remove(id);
                self.retired.insert(id.clone());
            }
        }
    }

    pub fn get(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.assets.contains_key(id)
    }

    /// All assets, ordered by id
    pub fn list(&self) -> Vec<Asset> {
        self.assets.values().cloned().collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &AssetId> {
        self.assets.keys()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn is_retired(&self, id: &AssetId) -> bool {
        self.retired.contains(id)
    }

    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
