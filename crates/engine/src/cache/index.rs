// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache entry index and its on-disk form

use bb_core::{Asset, AssetId, Integrity, PlaybackTarget};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

/// Local materialization of one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub asset_id: AssetId,
    /// URI the content was obtained from
    pub source_uri: String,
    pub target: PlaybackTarget,
    /// Hex SHA-256 of the published file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub size: u64,
    pub validated_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    #[serde(skip)]
    pub fetching: bool,
}

/// Strip weak markers and quotes so `W/"abc"` and `abc` compare equal
fn normalize_etag(tag: &str) -> &str {
    let tag = tag.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    tag.trim_matches('"')
}

pub(crate) fn etags_match(a: &str, b: &str) -> bool {
    normalize_etag(a) == normalize_etag(b)
}

impl CacheEntry {
    /// Published under the cache root, as opposed to played from its URI
    pub fn is_materialized(&self) -> bool {
        matches!(self.target, PlaybackTarget::File(_))
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.validated_at);
        age.to_std().map_or(true, |age| age < ttl)
    }

    /// Whether this copy is the content `asset` currently names
    pub fn matches(&self, asset: &Asset) -> bool {
        if self.source_uri != asset.uri.trim() {
            return false;
        }
        match &asset.integrity {
            Some(Integrity::Sha256(hex)) => self
                .sha256
                .as_deref()
                .is_some_and(|sha| sha.eq_ignore_ascii_case(hex)),
            Some(Integrity::ETag(tag)) => self.etag.as_deref().is_some_and(|e| etags_match(e, tag)),
            None => true,
        }
    }

    /// Usable without contacting the origin.
    ///
    /// A digest pin never goes stale; anything else is revalidated after `ttl`.
    pub fn is_valid_for(&self, asset: &Asset, now: DateTime<Utc>, ttl: Duration) -> bool {
        let pinned = matches!(asset.integrity, Some(Integrity::Sha256(_)));
        self.matches(asset) && (pinned || self.is_fresh(now, ttl)) && self.content_present()
    }

    pub fn content_present(&self) -> bool {
        match &self.target {
            PlaybackTarget::File(path) => path.is_file(),
            PlaybackTarget::Url(_) => true,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    entries: Vec<CacheEntry>,
}

/// Entry index shared by the cache manager and the scheduler
///
/// Reads take the shared lock; only the cache manager writes.
pub struct CacheIndex {
    path: PathBuf,
    entries: RwLock<BTreeMap<AssetId, CacheEntry>>,
    leases: Mutex<HashMap<AssetId, usize>>,
}

impl CacheIndex {
    /// Load `index.json`, dropping entries whose published file is gone.
    /// A missing or unreadable index starts empty.
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<IndexFile>(&text) {
                Ok(file) => file.entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "discarding unreadable cache index");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read cache index");
                Vec::new()
            }
        };

        let total = entries.len();
        let entries: BTreeMap<_, _> = entries
            .into_iter()
            .filter(CacheEntry::content_present)
            .map(|e| (e.asset_id.clone(), e))
            .collect();
        if entries.len() < total {
            tracing::info!(dropped = total - entries.len(), "cache entries without content");
        }

        Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
            leases: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &AssetId) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn list(&self) -> Vec<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Assets with a usable local copy or a reachable origin on record
    pub fn available(&self) -> HashSet<AssetId> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|e| e.content_present())
            .map(|e| e.asset_id.clone())
            .collect()
    }

    /// Bytes held under the cache root
    pub fn total_size(&self) -> u64 {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|e| e.is_materialized())
            .map(|e| e.size)
            .sum()
    }

    pub(crate) fn insert(&self, entry: CacheEntry) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(entry.asset_id.clone(), entry);
    }

    pub(crate) fn remove(&self, id: &AssetId) -> Option<CacheEntry> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
    }

    pub(crate) fn modify(&self, id: &AssetId, f: impl FnOnce(&mut CacheEntry)) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.get_mut(id) {
            Some(entry) => {
                f(entry);
                true
            }
            None => false,
        }
    }

    pub(crate) fn acquire(&self, id: &AssetId) {
        let mut leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        *leases.entry(id.clone()).or_insert(0) += 1;
    }

    pub(crate) fn release(&self, id: &AssetId) {
        let mut leases = self.leases.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(count) = leases.get_mut(id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                leases.remove(id);
            }
        }
    }

    pub fn is_leased(&self, id: &AssetId) -> bool {
        self.leases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    /// Entries to drop, least recently used first, until the materialized
    /// total fits `budget`. Protected and leased entries are never chosen.
    pub fn plan_eviction(&self, budget: u64, protected: &HashSet<AssetId>) -> Vec<AssetId> {
        let mut total = self.total_size();
        if total <= budget {
            return Vec::new();
        }

        let mut candidates: Vec<CacheEntry> = self
            .list()
            .into_iter()
            .filter(|e| e.is_materialized() && !e.fetching)
            .filter(|e| !protected.contains(&e.asset_id) && !self.is_leased(&e.asset_id))
            .collect();
        candidates.sort_by(|a, b| {
            a.last_used
                .cmp(&b.last_used)
                .then_with(|| a.asset_id.cmp(&b.asset_id))
        });

        let mut victims = Vec::new();
        for entry in candidates {
            if total <= budget {
                break;
            }
            total = total.saturating_sub(entry.size);
            victims.push(entry.asset_id);
        }
        victims
    }

    /// Write the index by publishing a temporary sibling over `index.json`
    pub fn persist(&self) -> std::io::Result<()> {
        let file = IndexFile {
            entries: self.list(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(std::io::Error::other)?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
