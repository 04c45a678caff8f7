// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache manager: ensure, fetch, verify, publish, evict

use super::index::{etags_match, CacheEntry, CacheIndex};
use super::CacheError;
use crate::events::EventBus;
use crate::health::HealthBoard;
use bb_adapters::{FetchOutcome, Fetcher};
use bb_core::{Asset, AssetId, AssetSource, Clock, Event, Integrity, PlaybackTarget, Playlist};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};

/// Tunables taken from the `[cache]` config section
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub root: PathBuf,
    pub budget_bytes: u64,
    pub ttl: Duration,
    pub fetch_workers: usize,
}

/// Keeps an entry from being evicted while a session plays it
pub struct CacheLease {
    index: Arc<CacheIndex>,
    asset_id: AssetId,
}

impl CacheLease {
    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }
}

impl Drop for CacheLease {
    fn drop(&mut self) {
        self.index.release(&self.asset_id);
    }
}

/// Flags an entry as mid-fetch for as long as it lives
///
/// Cleared on drop, so a fetch whose task is aborted leaves the entry
/// evictable again.
struct FetchingMark<'a> {
    index: &'a CacheIndex,
    asset_id: &'a AssetId,
}

impl<'a> FetchingMark<'a> {
    fn set(index: &'a CacheIndex, asset_id: &'a AssetId) -> Self {
        index.modify(asset_id, |e| e.fetching = true);
        Self { index, asset_id }
    }
}

impl Drop for FetchingMark<'_> {
    fn drop(&mut self) {
        self.index.modify(self.asset_id, |e| e.fetching = false);
    }
}

pub struct CacheManager<F, C> {
    settings: CacheSettings,
    fetcher: F,
    clock: C,
    index: Arc<CacheIndex>,
    /// One lock per asset; holders are the only fetcher for that id
    in_flight: Mutex<HashMap<AssetId, Arc<tokio::sync::Mutex<()>>>>,
    workers: Semaphore,
    playlist: watch::Receiver<Arc<Playlist>>,
    health: Arc<HealthBoard>,
    events: EventBus,
}

impl<F: Fetcher, C: Clock> CacheManager<F, C> {
    /// Prepare the cache root and clear leftovers from interrupted fetches
    pub fn open(
        settings: CacheSettings,
        index: Arc<CacheIndex>,
        fetcher: F,
        clock: C,
        playlist: watch::Receiver<Arc<Playlist>>,
        health: Arc<HealthBoard>,
        events: EventBus,
    ) -> Result<Self, CacheError> {
        std::fs::create_dir_all(settings.root.join("assets"))?;
        let tmp = settings.root.join("tmp");
        if tmp.exists() {
            std::fs::remove_dir_all(&tmp)?;
        }
        std::fs::create_dir_all(&tmp)?;

        tracing::info!(
            root = %settings.root.display(),
            entries = index.list().len(),
            bytes = index.total_size(),
            budget = settings.budget_bytes,
            "cache opened"
        );

        Ok(Self {
            workers: Semaphore::new(settings.fetch_workers.max(1)),
            settings,
            fetcher,
            clock,
            index,
            in_flight: Mutex::new(HashMap::new()),
            playlist,
            health,
            events,
        })
    }

    pub fn index(&self) -> &Arc<CacheIndex> {
        &self.index
    }

    fn assets_dir(&self) -> PathBuf {
        self.settings.root.join("assets")
    }

    fn tmp_dir(&self) -> PathBuf {
        self.settings.root.join("tmp")
    }

    /// Pin `asset_id` for the lifetime of the returned lease
    pub fn lease(&self, asset_id: &AssetId) -> CacheLease {
        self.index.acquire(asset_id);
        CacheLease {
            index: Arc::clone(&self.index),
            asset_id: asset_id.clone(),
        }
    }

    /// Return something the renderer can load for `asset`, fetching or
    /// revalidating first when the cached copy is missing or stale.
    pub async fn ensure(&self, asset: &Asset) -> Result<PlaybackTarget, CacheError> {
        match asset.source() {
            AssetSource::Local(path) => ensure_local(path).await,
            AssetSource::Remote(uri) if !asset.category.is_materialized() => {
                self.ensure_pass_through(asset, &uri).await
            }
            AssetSource::Remote(uri) => self.ensure_download(asset, &uri).await,
        }
    }

    fn valid_target(&self, asset: &Asset) -> Option<PlaybackTarget> {
        let now = self.clock.utc_now();
        let entry = self.index.get(&asset.id)?;
        if !entry.is_valid_for(asset, now, self.settings.ttl) {
            return None;
        }
        self.index.modify(&asset.id, |e| e.last_used = now);
        Some(entry.target)
    }

    async fn ensure_pass_through(
        &self,
        asset: &Asset,
        uri: &str,
    ) -> Result<PlaybackTarget, CacheError> {
        let target = PlaybackTarget::Url(uri.to_string());
        if asset.skip_integrity_check {
            return Ok(target);
        }
        if let Some(target) = self.valid_target(asset) {
            return Ok(target);
        }

        let result = self.fetcher.probe(uri).await;
        self.health.record_fetch(self.clock.now(), result.is_ok());
        if let Err(e) = result {
            self.events.emit(Event::CacheFetchFailed {
                asset_id: asset.id.clone(),
                reason: e.to_string(),
            });
            return Err(e.into());
        }

        let now = self.clock.utc_now();
        self.index.insert(CacheEntry {
            asset_id: asset.id.clone(),
            source_uri: uri.to_string(),
            target: target.clone(),
            sha256: None,
            etag: None,
            size: 0,
            validated_at: now,
            last_used: now,
            fetching: false,
        });
        self.persist_index();
        Ok(target)
    }

    async fn ensure_download(&self, asset: &Asset, uri: &str) -> Result<PlaybackTarget, CacheError> {
        if let Some(target) = self.valid_target(asset) {
            return Ok(target);
        }

        let flight = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(in_flight.entry(asset.id.clone()).or_default())
        };
        let _flight = flight.lock().await;

        // Whoever held the lock before us may have fetched it already
        if let Some(target) = self.valid_target(asset) {
            return Ok(target);
        }

        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|_| CacheError::Closed)?;

        let result = {
            let _mark = FetchingMark::set(&self.index, &asset.id);
            self.download(asset, uri).await
        };
        self.health.record_fetch(self.clock.now(), result.is_ok());

        match result {
            Ok((target, fetched)) => {
                if let Some(bytes) = fetched {
                    self.events.emit(Event::CacheFetched {
                        asset_id: asset.id.clone(),
                        bytes,
                    });
                }
                self.enforce_budget(&asset.id);
                Ok(target)
            }
            Err(e) => {
                self.events.emit(Event::CacheFetchFailed {
                    asset_id: asset.id.clone(),
                    reason: e.to_string(),
                });
                match self.index.get(&asset.id) {
                    Some(stale) if stale.content_present() => {
                        tracing::warn!(asset_id = %asset.id, error = %e, "serving stale copy");
                        let now = self.clock.utc_now();
                        self.index.modify(&asset.id, |e| e.last_used = now);
                        Ok(stale.target)
                    }
                    _ => Err(e),
                }
            }
        }
    }

    /// Fetch into `tmp/`, verify, then rename into `assets/`.
    /// Returns the published target and the bytes transferred, if any.
    async fn download(
        &self,
        asset: &Asset,
        uri: &str,
    ) -> Result<(PlaybackTarget, Option<u64>), CacheError> {
        let previous = self
            .index
            .get(&asset.id)
            .filter(|e| e.source_uri == uri && e.content_present());
        let validator = previous.as_ref().and_then(|e| e.etag.clone());

        let tmp = tempfile::Builder::new()
            .prefix(&format!("{}.", asset.id))
            .suffix(".part")
            .tempfile_in(self.tmp_dir())?;

        let outcome = self
            .fetcher
            .fetch(uri, tmp.path(), validator.as_deref())
            .await?;
        let now = self.clock.utc_now();

        match (outcome, previous) {
            (FetchOutcome::NotModified, Some(previous)) => {
                if !asset.skip_integrity_check && !previous.matches(asset) {
                    return Err(mismatch(asset, &previous.sha256, &previous.etag));
                }
                self.index.modify(&asset.id, |e| {
                    e.validated_at = now;
                    e.last_used = now;
                });
                self.persist_index();
                tracing::debug!(asset_id = %asset.id, "revalidated");
                Ok((previous.target, None))
            }
            (FetchOutcome::NotModified, None) => Err(CacheError::Io(
                "origin answered not-modified to an unconditional request".to_string(),
            )),
            (FetchOutcome::Downloaded { etag, bytes }, _) => {
                let path = tmp.path().to_path_buf();
                let sha256 = tokio::task::spawn_blocking(move || hash_file(&path))
                    .await
                    .map_err(|e| CacheError::Io(e.to_string()))??;

                if !asset.skip_integrity_check {
                    verify(asset, &sha256, etag.as_deref())?;
                }

                let dest = self.assets_dir().join(asset.id.as_str());
                tmp.persist(&dest).map_err(|e| CacheError::Io(e.error.to_string()))?;

                self.index.insert(CacheEntry {
                    asset_id: asset.id.clone(),
                    source_uri: uri.to_string(),
                    target: PlaybackTarget::File(dest.clone()),
                    sha256: Some(sha256),
                    etag,
                    size: bytes,
                    validated_at: now,
                    last_used: now,
                    fetching: false,
                });
                self.persist_index();
                Ok((PlaybackTarget::File(dest), Some(bytes)))
            }
        }
    }

    /// Evict least-recently-used entries outside the current playlist until
    /// the cache fits its budget
    fn enforce_budget(&self, keep: &AssetId) {
        let mut protected: HashSet<AssetId> =
            self.playlist.borrow().entries.iter().cloned().collect();
        protected.insert(keep.clone());

        let victims = self
            .index
            .plan_eviction(self.settings.budget_bytes, &protected);
        if victims.is_empty() {
            if self.index.total_size() > self.settings.budget_bytes {
                tracing::warn!(
                    bytes = self.index.total_size(),
                    budget = self.settings.budget_bytes,
                    "cache over budget with nothing evictable"
                );
            }
            return;
        }

        for id in victims {
            if let Some(entry) = self.drop_entry(&id) {
                self.events.emit(Event::CacheEvicted {
                    asset_id: id,
                    bytes: entry.size,
                });
            }
        }
        self.persist_index();
    }

    /// Discard the cached copy of a deleted asset
    pub fn forget(&self, id: &AssetId) {
        if self.drop_entry(id).is_some() {
            self.persist_index();
        }
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    fn drop_entry(&self, id: &AssetId) -> Option<CacheEntry> {
        let entry = self.index.remove(id)?;
        if let PlaybackTarget::File(path) = &entry.target {
            if path.starts_with(&self.settings.root) {
                if let Err(e) = std::fs::remove_file(path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(asset_id = %id, error = %e, "failed to remove cached file");
                    }
                }
            }
        }
        Some(entry)
    }

    fn persist_index(&self) {
        if let Err(e) = self.index.persist() {
            tracing::error!(error = %e, "failed to persist cache index");
        }
    }
}

async fn ensure_local(path: PathBuf) -> Result<PlaybackTarget, CacheError> {
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(PlaybackTarget::File(path)),
        _ => Err(CacheError::MissingLocal(path)),
    }
}

fn mismatch(asset: &Asset, sha256: &Option<String>, etag: &Option<String>) -> CacheError {
    let actual = match &asset.integrity {
        Some(Integrity::Sha256(_)) => sha256.clone(),
        _ => etag.clone(),
    };
    CacheError::Integrity {
        expected: asset
            .integrity
            .as_ref()
            .map(|i| i.to_string())
            .unwrap_or_default(),
        actual: actual.unwrap_or_else(|| "none".to_string()),
    }
}

fn verify(asset: &Asset, sha256: &str, etag: Option<&str>) -> Result<(), CacheError> {
    let ok = match &asset.integrity {
        Some(Integrity::Sha256(hex)) => hex.eq_ignore_ascii_case(sha256),
        Some(Integrity::ETag(tag)) => etag.is_some_and(|e| etags_match(e, tag)),
        None => true,
    };
    if ok {
        Ok(())
    } else {
        Err(mismatch(
            asset,
            &Some(format!("sha256:{}", sha256)),
            &etag.map(str::to_string),
        ))
    }
}

fn hash_file(path: &Path) -> Result<String, CacheError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
