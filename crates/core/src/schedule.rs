// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure schedule computation
//!
//! Turns a repository snapshot and a reference time into an ordered list of
//! asset ids plus the next instant at which the answer could change.
//! Same inputs always produce the same output.

use crate::asset::{Asset, AssetId};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};

/// Seed for deterministic shuffling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuffleSeed {
    pub repo_epoch: u64,
    pub round: u64,
}

/// Inputs beyond the asset snapshot
#[derive(Debug, Clone, Copy)]
pub struct ScheduleParams<'a> {
    pub now: DateTime<Utc>,
    /// Assets temporarily excluded after repeated playback failure
    pub excluded: &'a HashSet<AssetId>,
    /// In degraded mode only these assets may be scheduled
    pub available_only: Option<&'a HashSet<AssetId>>,
    pub shuffle: Option<ShuffleSeed>,
}

impl<'a> ScheduleParams<'a> {
    pub fn at(now: DateTime<Utc>, excluded: &'a HashSet<AssetId>) -> Self {
        Self {
            now,
            excluded,
            available_only: None,
            shuffle: None,
        }
    }
}

/// Result of a schedule computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub entries: Vec<AssetId>,
    /// Soonest future window start or end among enabled assets
    pub next_boundary: Option<DateTime<Utc>>,
}

/// Compute the ordered play sequence
pub fn compute(assets: &[Asset], params: ScheduleParams<'_>) -> Schedule {
    let mut eligible: Vec<&Asset> = assets
        .iter()
        .filter(|a| a.is_eligible(params.now))
        .filter(|a| !params.excluded.contains(&a.id))
        .filter(|a| params.available_only.map_or(true, |set| set.contains(&a.id)))
        .collect();

    match params.shuffle {
        None => eligible.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id))),
        Some(seed) => eligible.sort_by_cached_key(|a| (shuffle_key(seed, &a.id), a.id.clone())),
    }

    Schedule {
        entries: eligible.into_iter().map(|a| a.id.clone()).collect(),
        next_boundary: next_boundary(assets, params.now),
    }
}

/// Soonest instant after `now` at which any enabled asset enters or leaves
/// its active window
pub fn next_boundary(assets: &[Asset], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    assets
        .iter()
        .filter(|a| a.enabled)
        .filter_map(|a| a.window.next_boundary_after(now))
        .min()
}

/// Ids of assets whose window and enabled flag admit them at `now`,
/// ignoring failure exclusions
pub fn eligible_ids(assets: &[Asset], now: DateTime<Utc>) -> BTreeSet<AssetId> {
    assets
        .iter()
        .filter(|a| a.is_eligible(now))
        .map(|a| a.id.clone())
        .collect()
}

fn shuffle_key(seed: ShuffleSeed, id: &AssetId) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(seed.repo_epoch.to_be_bytes());
    hasher.update(seed.round.to_be_bytes());
    hasher.update(id.as_str().as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
