// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session driver: feeds events into the state machine and executes effects

use super::{Inputs, Outcome, Supervisor};
use crate::cache::{CacheError, CacheLease};
use bb_adapters::{Fetcher, LoadId, RendererAdapter, SignalKind};
use bb_core::{
    Asset, Clock, Effect, InterruptReason, PlaybackSession, PlaybackTarget, SessionEvent,
    SessionState, TracedEffect,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

type PrepareTask = JoinHandle<Result<PlaybackTarget, CacheError>>;

/// How a session relates to the schedule
#[derive(Debug, Clone, Copy)]
pub(super) struct Playing {
    epoch: u64,
    /// Outcome is reported to the failure ledger
    records: bool,
    /// A newer playlist epoch interrupts the session
    follows_playlist: bool,
}

impl Playing {
    pub(super) fn from_playlist(epoch: u64, records: bool) -> Self {
        Self {
            epoch,
            records,
            follows_playlist: true,
        }
    }

    pub(super) fn splash() -> Self {
        Self {
            epoch: 0,
            records: false,
            follows_playlist: false,
        }
    }
}

/// Resources held by the running session
struct Live {
    session: PlaybackSession,
    asset: Asset,
    load: Option<LoadId>,
    prepare: Option<PrepareTask>,
    lease: Option<CacheLease>,
    queue: VecDeque<SessionEvent>,
    torn_down: bool,
    interrupted: bool,
    failed: bool,
}

impl Live {
    /// Interrupts jump the queue so nothing from a superseded epoch is shown
    fn interrupt(&mut self, reason: InterruptReason) {
        if !self.interrupted {
            self.interrupted = true;
            self.queue.push_front(SessionEvent::Interrupt { reason });
        }
    }
}

impl<R, F, C> Supervisor<R, F, C>
where
    R: RendererAdapter,
    F: Fetcher,
    C: Clock,
{
    /// Play one asset from `Idle` back to `Idle`
    pub(super) async fn play(
        &self,
        asset: Asset,
        playing: Playing,
        inputs: &mut Inputs<'_>,
        cancel: &CancellationToken,
    ) -> Outcome {
        let failures = if playing.records {
            self.scheduler.failure_count(&asset.id)
        } else {
            0
        };
        let session = PlaybackSession::new(
            &asset,
            playing.epoch,
            failures,
            self.settings.timings,
            &self.clock,
        );
        let mut live = Live {
            session,
            asset,
            load: None,
            prepare: None,
            lease: None,
            queue: VecDeque::from([SessionEvent::Begin]),
            torn_down: false,
            interrupted: false,
            failed: false,
        };

        let mut heartbeat = tokio::time::interval(self.settings.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = false;

        loop {
            self.drain(&mut live, playing.records).await;
            if live.torn_down && live.session.state == SessionState::Idle {
                break;
            }
            let wake = live.session.wake_at();

            tokio::select! {
                _ = cancel.cancelled(), if !shutdown => {
                    shutdown = true;
                    live.interrupt(InterruptReason::Shutdown);
                }
                _ = sleep_until(wake) => live.queue.push_back(SessionEvent::Tick),
                _ = heartbeat.tick() => self.board.heartbeat(self.clock.now()),
                Some(signal) = inputs.signals.recv() => {
                    if live.load == Some(signal.load) {
                        live.queue.push_back(match signal.kind {
                            SignalKind::Ready => SessionEvent::RendererReady,
                            SignalKind::Finished => SessionEvent::RendererFinished,
                            SignalKind::Crashed(reason) => SessionEvent::RendererCrashed { reason },
                        });
                    } else {
                        tracing::debug!(load = signal.load, "ignoring signal for stale load");
                    }
                }
                Some(control) = inputs.controls.recv() => {
                    let playlist = inputs.playlist.borrow().clone();
                    if let Some(reason) = self.apply_control(control, &playlist) {
                        live.interrupt(reason);
                    }
                }
                _ = inputs.playlist.changed(), if playing.follows_playlist => {}
                prepared = wait_prepared(&mut live.prepare) => {
                    live.queue.push_back(match prepared {
                        Ok(target) => SessionEvent::Prepared { target },
                        Err(reason) => SessionEvent::PrepareFailed { reason },
                    });
                }
            }

            // Checked after every wake-up so a superseded session never
            // reaches the surface
            if playing.follows_playlist {
                let latest = inputs.playlist.borrow().epoch;
                if latest > live.session.epoch {
                    tracing::info!(
                        asset_id = %live.session.asset_id,
                        epoch = live.session.epoch,
                        latest,
                        "playlist replaced"
                    );
                    live.interrupt(InterruptReason::PlaylistReplaced);
                }
            }
        }

        self.session.send_replace(None);
        if shutdown {
            Outcome::Shutdown
        } else if live.failed {
            Outcome::Failed
        } else {
            Outcome::Finished
        }
    }

    /// Run queued events through the state machine
    async fn drain(&self, live: &mut Live, records: bool) {
        while let Some(event) = live.queue.pop_front() {
            let (next, effects) = live.session.transition(event, &self.clock);
            live.session = next;
            for effect in effects {
                self.execute(effect, live, records).await;
            }

            if live.session.is_ending() && !live.torn_down {
                live.torn_down = true;
                if let Some(task) = live.prepare.take() {
                    task.abort();
                }
                live.lease = None;
                live.queue.push_back(SessionEvent::TornDown);
            }
            self.session.send_replace(Some(live.session.snapshot()));
        }
    }

    async fn execute(&self, effect: Effect, live: &mut Live, records: bool) {
        tracing::debug!(effect = effect.name(), fields = %effect.describe(), "executing");

        match effect {
            Effect::Prepare { asset_id } => {
                live.lease = Some(self.cache.lease(&asset_id));
                let cache = Arc::clone(&self.cache);
                let asset = live.asset.clone();
                live.prepare = Some(tokio::spawn(async move { cache.ensure(&asset).await }));
            }

            Effect::Load {
                target, category, ..
            } => match self.renderer.load(&target, category).await {
                Ok(load) => {
                    live.load = Some(load);
                    self.memory().current_load = Some(load);
                }
                Err(e) => live.queue.push_back(SessionEvent::RendererCrashed {
                    reason: e.to_string(),
                }),
            },

            Effect::Start { .. } => {
                let Some(load) = live.load else { return };
                if let Err(e) = self.renderer.start(load).await {
                    live.queue.push_back(SessionEvent::RendererCrashed {
                        reason: e.to_string(),
                    });
                }
            }

            Effect::Stop { asset_id } => {
                let Some(load) = live.load.take() else { return };
                if let Err(e) = self.renderer.stop(load).await {
                    tracing::warn!(%asset_id, load, error = %e, "stop failed");
                }
                self.memory().current_load = None;
            }

            Effect::Emit(event) => self.events.emit(event),

            Effect::RecordSuccess { asset_id } => {
                if records {
                    self.scheduler.record_success(&asset_id);
                }
            }

            Effect::RecordFailure { asset_id, reason } => {
                live.failed = true;
                tracing::warn!(%asset_id, reason = %reason, "playback failed");
                if records {
                    self.scheduler.record_failure(&asset_id);
                }
            }
        }
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

async fn wait_prepared(task: &mut Option<PrepareTask>) -> Result<PlaybackTarget, String> {
    let Some(handle) = task else {
        return std::future::pending().await;
    };
    let result = handle.await;
    *task = None;
    match result {
        Ok(Ok(target)) => Ok(target),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("prepare task failed: {}", e)),
    }
}
