// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background prefetch of upcoming playlist content

use super::CacheManager;
use crate::repository::AssetRepository;
use bb_adapters::Fetcher;
use bb_core::{AssetSource, Clock, Playlist};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

impl<F: Fetcher, C: Clock> CacheManager<F, C> {
    /// Warm the cache for every downloadable entry of each published playlist.
    ///
    /// Runs until `cancel` fires. Fetches in progress when a new playlist
    /// arrives are left to finish; the worker semaphore bounds concurrency.
    pub async fn prefetch(
        self: Arc<Self>,
        repo: Arc<AssetRepository>,
        mut playlist: watch::Receiver<Arc<Playlist>>,
        cancel: CancellationToken,
    ) {
        let mut tasks = JoinSet::new();

        loop {
            let current = playlist.borrow_and_update().clone();
            for id in &current.entries {
                let Some(asset) = repo.get(id) else { continue };
                if !asset.category.is_materialized()
                    || !matches!(asset.source(), AssetSource::Remote(_))
                {
                    continue;
                }
                let cache = Arc::clone(&self);
                tasks.spawn(async move {
                    if let Err(e) = cache.ensure(&asset).await {
                        tracing::debug!(asset_id = %asset.id, error = %e, "prefetch failed");
                    }
                });
            }

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tasks.abort_all();
                        return;
                    }
                    changed = playlist.changed() => {
                        if changed.is_err() {
                            tasks.abort_all();
                            return;
                        }
                        break;
                    }
                    Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "prefetch_tests.rs"]
mod tests;
