// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler loop
//!
//! Recomputes the playlist when the repository changes, when a pass over the
//! playlist completes, when an asset is excluded or the degraded flag flips,
//! and at the next active-window boundary. A new playlist is published only
//! when the play sequence actually differs, so the epoch counts real changes.

use crate::cache::CacheIndex;
use crate::events::EventBus;
use crate::repository::AssetRepository;
use bb_core::config::ScheduleConfig;
use bb_core::schedule::{self, ScheduleParams, ShuffleSeed};
use bb_core::{Asset, AssetId, AssetSource, Clock, Event, FailureLedger, Playlist};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;

/// Longest the loop sleeps without re-evaluating, in case the wall clock jumps
const MAX_IDLE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub placeholder: Asset,
    pub shuffle: bool,
    pub reshuffle_every: u64,
    pub failure_threshold: u32,
}

impl From<&ScheduleConfig> for SchedulerSettings {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            placeholder: config.placeholder(),
            shuffle: config.shuffle,
            reshuffle_every: config.reshuffle_every,
            failure_threshold: config.failure_threshold,
        }
    }
}

/// Failure count of one asset, for the operational surface
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FailureRecord {
    pub asset_id: AssetId,
    pub failures: u32,
    pub excluded: bool,
}

struct State {
    failures: FailureLedger,
    degraded: bool,
    passes: u64,
    round: u64,
    repo_epoch: u64,
    /// Assets inside their active window at the last computation
    eligible: BTreeSet<AssetId>,
    next_boundary: Option<DateTime<Utc>>,
}

pub struct Scheduler<C> {
    repo: Arc<AssetRepository>,
    index: Arc<CacheIndex>,
    clock: C,
    settings: SchedulerSettings,
    state: Mutex<State>,
    playlist: watch::Sender<Arc<Playlist>>,
    wake: Notify,
    events: EventBus,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(
        repo: Arc<AssetRepository>,
        index: Arc<CacheIndex>,
        clock: C,
        settings: SchedulerSettings,
        events: EventBus,
    ) -> Self {
        let initial = Playlist::initial(settings.placeholder.clone(), clock.utc_now());
        let (playlist, _) = watch::channel(Arc::new(initial));
        Self {
            state: Mutex::new(State {
                failures: FailureLedger::new(settings.failure_threshold),
                degraded: false,
                passes: 0,
                round: 0,
                repo_epoch: repo.epoch(),
                eligible: BTreeSet::new(),
                next_boundary: None,
            }),
            repo,
            index,
            clock,
            settings,
            playlist,
            wake: Notify::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Playlist>> {
        self.playlist.subscribe()
    }

    pub fn current(&self) -> Arc<Playlist> {
        self.playlist.borrow().clone()
    }

    pub fn placeholder(&self) -> &Asset {
        &self.settings.placeholder
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Assets playable in degraded mode: cached copies, local files and
    /// trusted pages or streams, which are handed to the renderer unprobed.
    fn available(&self, assets: &[Asset]) -> HashSet<AssetId> {
        let mut available = self.index.available();
        available.extend(
            assets
                .iter()
                .filter(|a| match a.source() {
                    AssetSource::Local(_) => true,
                    AssetSource::Remote(_) => {
                        !a.category.is_materialized() && a.skip_integrity_check
                    }
                })
                .map(|a| a.id.clone()),
        );
        available
    }

    /// Compute the playlist from the current snapshot and publish it if the
    /// sequence changed. Returns the playlist now in effect.
    pub fn recompute(&self) -> Arc<Playlist> {
        let snapshot = self.repo.list();
        let now = self.clock.utc_now();
        let mut state = self.lock();

        let eligible = schedule::eligible_ids(&snapshot.assets, now);
        let lifted = if snapshot.epoch != state.repo_epoch {
            state.repo_epoch = snapshot.epoch;
            state.failures.clear_all()
        } else {
            let reentered: Vec<AssetId> = eligible.difference(&state.eligible).cloned().collect();
            reentered
                .iter()
                .filter(|id| state.failures.clear(id))
                .count()
        };
        if lifted > 0 {
            self.events
                .emit(Event::ExclusionsCleared { count: lifted });
        }
        state.eligible = eligible;

        let excluded = state.failures.excluded();
        let available = state.degraded.then(|| self.available(&snapshot.assets));
        let shuffle = self.settings.shuffle.then_some(ShuffleSeed {
            repo_epoch: snapshot.epoch,
            round: state.round,
        });
        let computed = schedule::compute(
            &snapshot.assets,
            ScheduleParams {
                now,
                excluded: &excluded,
                available_only: available.as_ref(),
                shuffle,
            },
        );
        state.next_boundary = computed.next_boundary;

        let (entries, placeholder) = if computed.entries.is_empty() {
            (
                vec![self.settings.placeholder.id.clone()],
                Some(self.settings.placeholder.clone()),
            )
        } else {
            (computed.entries, None)
        };

        let current = self.current();
        let candidate = Playlist {
            epoch: current.epoch + 1,
            repo_epoch: snapshot.epoch,
            computed_at: now,
            entries,
            placeholder,
            next_boundary: computed.next_boundary,
        };
        if candidate.same_sequence(&current) && current.epoch > 0 {
            return current;
        }

        // Published under the state lock so concurrent recomputes never
        // hand out the same epoch twice
        let published = Arc::new(candidate);
        self.playlist.send_replace(Arc::clone(&published));
        drop(state);
        self.events.emit(Event::PlaylistReplaced {
            epoch: published.epoch,
            repo_epoch: published.repo_epoch,
            entries: published.len(),
            placeholder: published.is_placeholder(),
        });
        published
    }

    /// Ask the loop to recompute soon
    pub fn request_recompute(&self) {
        self.wake.notify_one();
    }

    /// Count a playback failure. Returns true if the asset just became excluded.
    pub fn record_failure(&self, id: &AssetId) -> bool {
        if id.is_placeholder() {
            return false;
        }
        let (excluded, failures) = {
            let mut state = self.lock();
            let excluded = state.failures.record_failure(id);
            (excluded, state.failures.count(id))
        };
        if excluded {
            self.events.emit(Event::AssetExcluded {
                asset_id: id.clone(),
                failures,
            });
            self.request_recompute();
        }
        excluded
    }

    pub fn record_success(&self, id: &AssetId) {
        self.lock().failures.record_success(id);
    }

    pub fn failure_count(&self, id: &AssetId) -> u32 {
        self.lock().failures.count(id)
    }

    pub fn failures(&self) -> Vec<FailureRecord> {
        let state = self.lock();
        let threshold = state.failures.threshold();
        state
            .failures
            .counts()
            .map(|(id, failures)| FailureRecord {
                asset_id: id.clone(),
                failures,
                excluded: failures >= threshold,
            })
            .collect()
    }

    /// A pass over the playlist completed. Advances the shuffle round when
    /// due and recomputes right away, returning the playlist the next pass
    /// plays from.
    pub fn record_pass(&self) -> Arc<Playlist> {
        {
            let mut state = self.lock();
            state.passes += 1;
            if self.settings.shuffle
                && self.settings.reshuffle_every > 0
                && state.passes % self.settings.reshuffle_every == 0
            {
                state.round += 1;
                tracing::debug!(round = state.round, "reshuffling");
            }
        }
        self.recompute()
    }

    pub fn set_degraded(&self, degraded: bool) {
        let changed = {
            let mut state = self.lock();
            std::mem::replace(&mut state.degraded, degraded) != degraded
        };
        if changed {
            self.request_recompute();
        }
    }

    fn until_boundary(&self) -> Duration {
        let boundary = self.lock().next_boundary;
        boundary
            .and_then(|at| at.signed_duration_since(self.clock.utc_now()).to_std().ok())
            .map_or(MAX_IDLE, |wait| wait.min(MAX_IDLE))
    }

    /// Run the recompute loop until `cancel` fires
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut changes = self.repo.notifier().subscribe();

        loop {
            self.recompute();
            let idle = self.until_boundary();

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = changes.changed() => match changed {
                    Some(epoch) => tracing::debug!(epoch, "repository changed"),
                    None => break,
                },
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(idle) => {}
            }
        }
        tracing::info!("scheduler stopped");
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
