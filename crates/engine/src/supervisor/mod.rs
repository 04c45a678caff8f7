// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Playback supervisor
//!
//! Drives one [`PlaybackSession`](bb_core::PlaybackSession) at a time against
//! the rendering surface. The watchdog may abort a supervisor incarnation at
//! any await point and start a new one on the same [`Supervisor`], so the
//! cursor, the pause flag and the id of the last load handed to the renderer
//! live here rather than in the task.

mod session;

use crate::cache::CacheManager;
use crate::events::EventBus;
use crate::health::HealthBoard;
use crate::repository::AssetRepository;
use crate::scheduler::Scheduler;
use bb_adapters::{Fetcher, LoadId, RendererAdapter, RendererSignal};
use bb_core::config::PlaybackConfig;
use bb_core::{
    Asset, AssetId, Clock, InterruptReason, Playlist, PlaylistCursor, SessionSnapshot,
    SessionTimings,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Pause after a failed session before taking the next asset
const FAILURE_PAUSE: Duration = Duration::from_millis(500);

/// Operator playback commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Control {
    Next,
    Previous,
    /// Play this asset next, once
    Show { id: AssetId },
    Pause,
    Resume,
}

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub timings: SessionTimings,
    pub heartbeat_interval: Duration,
    pub splash: Option<Asset>,
}

impl From<&PlaybackConfig> for SupervisorSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            timings: config.timings(),
            heartbeat_interval: config.heartbeat_interval,
            splash: config.splash(),
        }
    }
}

struct Memory {
    cursor: PlaylistCursor,
    paused: bool,
    pending_show: Option<AssetId>,
    /// Load handed to the renderer and not yet stopped
    current_load: Option<LoadId>,
    splash_done: bool,
}

/// Receivers owned by one incarnation while it runs
pub(crate) struct Inputs<'a> {
    controls: &'a mut mpsc::Receiver<Control>,
    signals: &'a mut mpsc::UnboundedReceiver<RendererSignal>,
    playlist: watch::Receiver<Arc<Playlist>>,
}

/// How a session ended, from the supervisor's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Finished,
    Failed,
    Shutdown,
}

pub struct Supervisor<R, F, C> {
    renderer: R,
    cache: Arc<CacheManager<F, C>>,
    repo: Arc<AssetRepository>,
    scheduler: Arc<Scheduler<C>>,
    board: Arc<HealthBoard>,
    events: EventBus,
    clock: C,
    settings: SupervisorSettings,
    controls: tokio::sync::Mutex<mpsc::Receiver<Control>>,
    signals: tokio::sync::Mutex<mpsc::UnboundedReceiver<RendererSignal>>,
    memory: Mutex<Memory>,
    session: watch::Sender<Option<SessionSnapshot>>,
}

/// Collaborators of a [`Supervisor`]
pub struct SupervisorDeps<R, F, C> {
    pub renderer: R,
    pub signals: mpsc::UnboundedReceiver<RendererSignal>,
    pub controls: mpsc::Receiver<Control>,
    pub cache: Arc<CacheManager<F, C>>,
    pub repo: Arc<AssetRepository>,
    pub scheduler: Arc<Scheduler<C>>,
    pub board: Arc<HealthBoard>,
    pub events: EventBus,
    pub clock: C,
}

impl<R, F, C> Supervisor<R, F, C>
where
    R: RendererAdapter,
    F: Fetcher,
    C: Clock,
{
    pub fn new(deps: SupervisorDeps<R, F, C>, settings: SupervisorSettings) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            renderer: deps.renderer,
            cache: deps.cache,
            repo: deps.repo,
            scheduler: deps.scheduler,
            board: deps.board,
            events: deps.events,
            clock: deps.clock,
            settings,
            controls: tokio::sync::Mutex::new(deps.controls),
            signals: tokio::sync::Mutex::new(deps.signals),
            memory: Mutex::new(Memory {
                cursor: PlaylistCursor::new(),
                paused: false,
                pending_show: None,
                current_load: None,
                splash_done: false,
            }),
            session,
        }
    }

    /// Current session, if one is active
    pub fn session(&self) -> Option<SessionSnapshot> {
        self.session.borrow().clone()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<Option<SessionSnapshot>> {
        self.session.subscribe()
    }

    pub fn is_paused(&self) -> bool {
        self.memory().paused
    }

    fn memory(&self) -> std::sync::MutexGuard<'_, Memory> {
        self.memory.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one incarnation until `cancel` fires or the task is aborted
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut controls = self.controls.lock().await;
        let mut signals = self.signals.lock().await;
        let mut inputs = Inputs {
            controls: &mut controls,
            signals: &mut signals,
            playlist: self.scheduler.subscribe(),
        };

        let now = self.clock.now();
        self.board.update(|health| health.supervisor_started(now));
        self.board.heartbeat(now);
        tracing::info!("supervisor started");

        self.release_stale_load().await;
        self.session.send_replace(None);

        if let Some(splash) = self.take_splash() {
            let outcome = self
                .play(splash, session::Playing::splash(), &mut inputs, &cancel)
                .await;
            if outcome == Outcome::Shutdown {
                tracing::info!("supervisor stopped");
                return;
            }
        }

        while !cancel.is_cancelled() {
            if self.is_paused() {
                self.idle(&mut inputs, &cancel).await;
                continue;
            }

            let latest = inputs.playlist.borrow_and_update().clone();
            let Some((asset, records, playlist)) = self.next_asset(latest) else {
                self.idle(&mut inputs, &cancel).await;
                continue;
            };

            let playing = session::Playing::from_playlist(playlist.epoch, records);
            match self.play(asset, playing, &mut inputs, &cancel).await {
                Outcome::Shutdown => break,
                Outcome::Failed => self.cool_down(&cancel).await,
                Outcome::Finished => {}
            }
        }
        tracing::info!("supervisor stopped");
    }

    /// Stop whatever an aborted incarnation left on the surface
    async fn release_stale_load(&self) {
        let stale = self.memory().current_load.take();
        if let Some(load) = stale {
            tracing::info!(load, "stopping load left by previous supervisor");
            if let Err(e) = self.renderer.stop(load).await {
                tracing::warn!(load, error = %e, "failed to stop stale load");
            }
        }
    }

    fn take_splash(&self) -> Option<Asset> {
        let mut memory = self.memory();
        if memory.splash_done {
            return None;
        }
        memory.splash_done = true;
        self.settings.splash.clone()
    }

    /// Pick the next asset: a pending `show` first, then the cursor.
    /// The flag tells whether the outcome counts toward the failure ledger;
    /// the playlist is the one the asset was taken from.
    fn next_asset(&self, mut playlist: Arc<Playlist>) -> Option<(Asset, bool, Arc<Playlist>)> {
        let mut memory = self.memory();

        if let Some(id) = memory.pending_show.take() {
            match self.repo.get(&id) {
                Some(asset) if asset.enabled => return Some((asset, true, playlist)),
                _ => tracing::warn!(asset_id = %id, "requested asset no longer playable"),
            }
        }

        for _ in 0..playlist.len() {
            // The previous pass ended with the session that just finished,
            // so a reshuffle here replaces nothing on screen
            if memory.cursor.pass_complete() {
                playlist = self.scheduler.record_pass();
            }
            let id = memory.cursor.next(&playlist)?;
            if let Some(placeholder) = &playlist.placeholder {
                if placeholder.id == id {
                    return Some((placeholder.clone(), false, playlist));
                }
            }
            match self.repo.get(&id) {
                Some(asset) => return Some((asset, true, playlist)),
                None => tracing::debug!(asset_id = %id, "skipping removed asset"),
            }
        }
        None
    }

    /// Apply an operator command. Returns how the current session should end,
    /// if it should.
    fn apply_control(&self, control: Control, playlist: &Playlist) -> Option<InterruptReason> {
        tracing::info!(?control, "playback control");
        let mut memory = self.memory();
        match control {
            Control::Next => Some(InterruptReason::Skipped),
            Control::Previous => {
                memory.cursor.step_back(playlist);
                Some(InterruptReason::Skipped)
            }
            Control::Show { id } => {
                memory.pending_show = Some(id);
                Some(InterruptReason::Skipped)
            }
            Control::Pause => {
                memory.paused = true;
                Some(InterruptReason::Paused)
            }
            Control::Resume => {
                memory.paused = false;
                None
            }
        }
    }

    /// Wait for something to do while no session runs
    async fn idle(&self, inputs: &mut Inputs<'_>, cancel: &CancellationToken) {
        self.board.heartbeat(self.clock.now());
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.settings.heartbeat_interval) => {}
            Some(control) = inputs.controls.recv() => {
                let playlist = inputs.playlist.borrow().clone();
                self.apply_control(control, &playlist);
            }
            Some(signal) = inputs.signals.recv() => {
                tracing::debug!(load = signal.load, "ignoring signal while idle");
            }
            _ = inputs.playlist.changed() => {}
        }
    }

    async fn cool_down(&self, cancel: &CancellationToken) {
        self.board.heartbeat(self.clock.now());
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(FAILURE_PAUSE) => {}
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
