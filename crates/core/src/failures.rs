// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consecutive playback failure tracking
//!
//! Counts failures in a row per asset. Once an asset reaches the threshold it
//! is excluded from scheduling until a repository change or its window
//! re-entry clears the count.

use crate::asset::AssetId;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone)]
pub struct FailureLedger {
    threshold: u32,
    counts: BTreeMap<AssetId, u32>,
}

impl FailureLedger {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            counts: BTreeMap::new(),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Count a failure. Returns true when this failure crossed the threshold.
    pub fn record_failure(&mut self, id: &AssetId) -> bool {
        let count = self.counts.entry(id.clone()).or_insert(0);
        *count = count.saturating_add(1);
        *count == self.threshold
    }

    /// A successful play resets the run
    pub fn record_success(&mut self, id: &AssetId) {
        self.counts.remove(id);
    }

    pub fn count(&self, id: &AssetId) -> u32 {
        self.counts.get(id).copied().unwrap_or(0)
    }

    pub fn is_excluded(&self, id: &AssetId) -> bool {
        self.count(id) >= self.threshold
    }

    /// Ids currently excluded from scheduling
    pub fn excluded(&self) -> HashSet<AssetId> {
        self.counts
            .iter()
            .filter(|(_, count)| **count >= self.threshold)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Forget one asset. Returns whether it was excluded.
    pub fn clear(&mut self, id: &AssetId) -> bool {
        let was_excluded = self.is_excluded(id);
        self.counts.remove(id);
        was_excluded
    }

    /// Forget everything. Returns how many exclusions were lifted.
    pub fn clear_all(&mut self) -> usize {
        let lifted = self.excluded().len();
        self.counts.clear();
        lifted
    }

    /// Per-asset counts for diagnostics
    pub fn counts(&self) -> impl Iterator<Item = (&AssetId, u32)> {
        self.counts.iter().map(|(id, count)| (id, *count))
    }
}

#[cfg(test)]
#[path = "failures_tests.rs"]
mod tests;
