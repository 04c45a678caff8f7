// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the billboard engine
//!
//! Owns the repository, cache, scheduler, supervisor and watchdog, starts
//! their loops under one cancellation token, and exposes the operations the
//! daemon serves: asset CRUD, playback control and the read-only
//! operational surface.

use crate::cache::{CacheEntry, CacheIndex, CacheManager, CacheSettings};
use crate::error::EngineError;
use crate::events::EventBus;
use crate::health::HealthBoard;
use crate::monitor::{Watchdog, WatchdogSettings};
use crate::repository::{AssetRepository, RepoSnapshot};
use crate::scheduler::{FailureRecord, Scheduler, SchedulerSettings};
use crate::supervisor::{Control, Supervisor, SupervisorDeps, SupervisorSettings};
use bb_adapters::{Fetcher, RendererAdapter, RendererSignal};
use bb_core::{
    Asset, AssetId, Clock, Config, Event, HealthSnapshot, IdGen, Playlist, SessionSnapshot,
};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const CONTROL_BUFFER: usize = 16;

/// Runtime adapter dependencies
pub struct RuntimeDeps<R, F, C, I> {
    pub renderer: R,
    /// Signals the renderer reports on
    pub signals: mpsc::UnboundedReceiver<RendererSignal>,
    pub fetcher: F,
    pub clock: C,
    pub id_gen: I,
}

/// Runtime that coordinates the system
pub struct Runtime<R, F, C, I> {
    repo: Arc<AssetRepository>,
    scheduler: Arc<Scheduler<C>>,
    cache: Arc<CacheManager<F, C>>,
    supervisor: Arc<Supervisor<R, F, C>>,
    board: Arc<HealthBoard>,
    events: EventBus,
    clock: C,
    id_gen: I,
    watchdog: WatchdogSettings,
    controls: mpsc::Sender<Control>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<R, F, C, I> Runtime<R, F, C, I>
where
    R: RendererAdapter,
    F: Fetcher,
    C: Clock,
    I: IdGen,
{
    /// Open durable state and build every component. Nothing runs until
    /// [`Runtime::start`].
    pub fn new(config: &Config, deps: RuntimeDeps<R, F, C, I>) -> Result<Self, EngineError> {
        let state_dir = config.state_dir().map_err(fatal)?;
        let cache_root = config.cache_dir().map_err(fatal)?;
        std::fs::create_dir_all(&state_dir).map_err(fatal)?;
        std::fs::create_dir_all(&cache_root).map_err(fatal)?;

        let clock = deps.clock;
        let events = EventBus::new();
        let repo = Arc::new(AssetRepository::open(&state_dir.join("assets.wal"))?);
        let board = Arc::new(HealthBoard::new(
            clock.now(),
            config.health.fetch_error_window,
        ));
        let index = Arc::new(CacheIndex::load(&cache_root.join("index.json")));

        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&repo),
            Arc::clone(&index),
            clock.clone(),
            SchedulerSettings::from(&config.schedule),
            events.clone(),
        ));

        let cache = CacheManager::open(
            CacheSettings {
                root: cache_root,
                budget_bytes: config.cache.budget_bytes,
                ttl: config.cache.ttl,
                fetch_workers: config.cache.fetch_workers,
            },
            index,
            deps.fetcher,
            clock.clone(),
            scheduler.subscribe(),
            Arc::clone(&board),
            events.clone(),
        )
        .map_err(fatal)?;
        let cache = Arc::new(cache);

        let (controls, controls_rx) = mpsc::channel(CONTROL_BUFFER);
        let supervisor = Arc::new(Supervisor::new(
            SupervisorDeps {
                renderer: deps.renderer,
                signals: deps.signals,
                controls: controls_rx,
                cache: Arc::clone(&cache),
                repo: Arc::clone(&repo),
                scheduler: Arc::clone(&scheduler),
                board: Arc::clone(&board),
                events: events.clone(),
                clock: clock.clone(),
            },
            SupervisorSettings::from(&config.playback),
        ));

        Ok(Self {
            repo,
            scheduler,
            cache,
            supervisor,
            board,
            events,
            clock,
            id_gen: deps.id_gen,
            watchdog: WatchdogSettings::from(&config.health),
            controls,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Publish the first playlist and start the scheduler, prefetch and
    /// watchdog loops
    pub fn start(&self) {
        let playlist = self.scheduler.recompute();
        tracing::info!(
            epoch = playlist.epoch,
            entries = playlist.len(),
            placeholder = playlist.is_placeholder(),
            "runtime starting"
        );

        let watchdog = Watchdog::new(
            Arc::clone(&self.supervisor),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.board),
            self.events.clone(),
            self.clock.clone(),
            self.watchdog.clone(),
        );

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.push(tokio::spawn(
            Arc::clone(&self.scheduler).run(self.cancel.child_token()),
        ));
        tasks.push(tokio::spawn(Arc::clone(&self.cache).prefetch(
            Arc::clone(&self.repo),
            self.scheduler.subscribe(),
            self.cancel.child_token(),
        )));
        tasks.push(tokio::spawn(watchdog.run(self.cancel.child_token())));
    }

    /// Stop every loop and wait for them to finish
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "runtime task ended abnormally");
            }
        }
        tracing::info!("runtime stopped");
    }

    /// Insert or replace an asset, generating an id when none is given.
    /// Returns the new repository epoch and the asset id.
    pub fn upsert_asset(&self, mut asset: Asset) -> Result<(u64, AssetId), EngineError> {
        if asset.id.as_str().is_empty() {
            asset.id = self.id_gen.next();
        }
        let id = asset.id.clone();
        let epoch = self.repo.upsert(asset)?;
        Ok((epoch, id))
    }

    /// Delete an asset and its cached copy. Returns the new epoch.
    pub fn remove_asset(&self, id: &AssetId) -> Result<u64, EngineError> {
        let epoch = self.repo.remove(id)?;
        self.cache.forget(id);
        Ok(epoch)
    }

    pub fn list_assets(&self) -> RepoSnapshot {
        self.repo.list()
    }

    pub fn get_asset(&self, id: &AssetId) -> Result<Asset, EngineError> {
        self.repo
            .get(id)
            .ok_or_else(|| EngineError::AssetNotFound(id.clone()))
    }

    pub fn repo_epoch(&self) -> u64 {
        self.repo.epoch()
    }

    pub fn playlist(&self) -> Arc<Playlist> {
        self.scheduler.current()
    }

    pub fn session(&self) -> Option<SessionSnapshot> {
        self.supervisor.session()
    }

    /// Asset on screen (or being prepared) right now
    pub fn current_asset(&self) -> Option<AssetId> {
        self.session().map(|session| session.asset_id)
    }

    pub fn is_paused(&self) -> bool {
        self.supervisor.is_paused()
    }

    pub fn health(&self) -> HealthSnapshot {
        self.board.snapshot(self.clock.now())
    }

    pub fn failures(&self) -> Vec<FailureRecord> {
        self.scheduler.failures()
    }

    pub fn cache_entries(&self) -> Vec<CacheEntry> {
        self.cache.index().list()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Deliver a playback command. `show` is checked against the repository
    /// first so the caller gets a useful error.
    pub async fn control(&self, control: Control) -> Result<(), EngineError> {
        if let Control::Show { id } = &control {
            let asset = self.get_asset(id)?;
            if !asset.enabled {
                return Err(EngineError::AssetDisabled(id.clone()));
            }
        }
        self.controls
            .send(control)
            .await
            .map_err(|_| EngineError::SupervisorGone)
    }
}

fn fatal(e: impl std::fmt::Display) -> EngineError {
    EngineError::Fatal(e.to_string())
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
