// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health monitor and supervisor watchdog
//!
//! Runs the playback supervisor as a child task. On every check the
//! watchdog restarts a supervisor that stopped heartbeating or exited,
//! applying the restart backoff, and flips degraded mode from the cache's
//! fetch error rate.

use crate::events::EventBus;
use crate::health::HealthBoard;
use crate::scheduler::Scheduler;
use crate::supervisor::Supervisor;
use bb_adapters::{Fetcher, RendererAdapter};
use bb_core::config::HealthConfig;
use bb_core::{BackoffPolicy, Clock, Event};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Bound on waiting for the supervisor to tear down at shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct WatchdogSettings {
    pub heartbeat_grace: Duration,
    pub check_interval: Duration,
    pub backoff: BackoffPolicy,
    pub fetch_error_threshold: f64,
    pub fetch_error_min_samples: usize,
    pub watchdog_file: Option<PathBuf>,
}

impl From<&HealthConfig> for WatchdogSettings {
    fn from(config: &HealthConfig) -> Self {
        Self {
            heartbeat_grace: config.heartbeat_grace,
            check_interval: config.check_interval,
            backoff: config.backoff(),
            fetch_error_threshold: config.fetch_error_threshold,
            fetch_error_min_samples: config.fetch_error_min_samples,
            watchdog_file: config.watchdog_file.clone(),
        }
    }
}

/// One running supervisor incarnation
struct Child {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Child {
    /// Cancel, then abort if teardown does not finish within `grace`
    async fn stop(mut self, grace: Duration) {
        self.cancel.cancel();
        if tokio::time::timeout(grace, &mut self.handle).await.is_err() {
            tracing::warn!("supervisor did not stop in time, aborting");
            self.handle.abort();
            let _ = self.handle.await;
        }
    }
}

pub struct Watchdog<R, F, C> {
    supervisor: Arc<Supervisor<R, F, C>>,
    scheduler: Arc<Scheduler<C>>,
    board: Arc<HealthBoard>,
    events: EventBus,
    clock: C,
    settings: WatchdogSettings,
    touch_failed: bool,
}

impl<R, F, C> Watchdog<R, F, C>
where
    R: RendererAdapter,
    F: Fetcher,
    C: Clock,
{
    pub fn new(
        supervisor: Arc<Supervisor<R, F, C>>,
        scheduler: Arc<Scheduler<C>>,
        board: Arc<HealthBoard>,
        events: EventBus,
        clock: C,
        settings: WatchdogSettings,
    ) -> Self {
        Self {
            supervisor,
            scheduler,
            board,
            events,
            clock,
            settings,
            touch_failed: false,
        }
    }

    fn spawn_supervisor(&self, cancel: &CancellationToken) -> Child {
        let token = cancel.child_token();
        let handle = tokio::spawn(Arc::clone(&self.supervisor).run(token.clone()));
        Child {
            cancel: token,
            handle,
        }
    }

    /// Supervise until `cancel` fires, then stop the supervisor
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut child = self.spawn_supervisor(&cancel);
        let mut checks = tokio::time::interval(self.settings.check_interval);
        checks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            grace_ms = self.settings.heartbeat_grace.as_millis() as u64,
            "watchdog started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = checks.tick() => {
                    self.check_degraded();
                    let now = self.clock.now();
                    let grace = self.settings.heartbeat_grace;
                    let silence = self.board.update(|health| {
                        health.is_stalled(now, grace).then(|| health.silence(now))
                    });
                    match silence {
                        Some(silence) => {
                            tracing::error!(
                                silence_ms = silence.as_millis() as u64,
                                "supervisor stalled"
                            );
                            child.stop(Duration::ZERO).await;
                            match self.restart("heartbeat lost", &cancel).await {
                                Some(next) => child = next,
                                None => return,
                            }
                        }
                        None => self.healthy(now),
                    }
                }
                result = &mut child.handle => {
                    let reason = match result {
                        Ok(()) if cancel.is_cancelled() => break,
                        Ok(()) => "supervisor exited".to_string(),
                        Err(e) if e.is_panic() => "supervisor panicked".to_string(),
                        Err(e) => format!("supervisor task failed: {}", e),
                    };
                    tracing::error!(reason = %reason, "supervisor died");
                    match self.restart(&reason, &cancel).await {
                        Some(next) => child = next,
                        None => return,
                    }
                }
            }
        }

        if !child.handle.is_finished() {
            child.stop(SHUTDOWN_GRACE).await;
        }
        tracing::info!("watchdog stopped");
    }

    /// Record the restart, wait out the backoff, then start a new incarnation.
    /// Returns `None` if shutdown arrived while waiting.
    async fn restart(&self, reason: &str, cancel: &CancellationToken) -> Option<Child> {
        let now = self.clock.now();
        let policy = self.settings.backoff;
        let (delay, restarts) = self.board.update(|health| {
            let delay = health.record_restart(now, reason, &policy);
            (delay, health.restarts)
        });

        tracing::warn!(
            restarts,
            backoff_ms = delay.as_millis() as u64,
            reason,
            "restarting supervisor"
        );
        self.events.emit(Event::SupervisorRestarted {
            restarts,
            backoff_ms: delay.as_millis() as u64,
            reason: reason.to_string(),
        });

        tokio::select! {
            _ = cancel.cancelled() => None,
            _ = tokio::time::sleep(delay) => Some(self.spawn_supervisor(cancel)),
        }
    }

    fn healthy(&mut self, now: std::time::Instant) {
        let policy = self.settings.backoff;
        if self.board.update(|health| health.maybe_reset(now, &policy)) {
            tracing::info!("backoff reset after sustained health");
        }
        self.touch_watchdog_file();
    }

    /// Enter or leave degraded mode from the fetch error rate
    fn check_degraded(&self) {
        let now = self.clock.now();
        let exceeded = self.board.fetch_errors_exceed(
            now,
            self.settings.fetch_error_threshold,
            self.settings.fetch_error_min_samples,
        );
        let changed = self.board.update(|health| {
            let changed = health.degraded != exceeded;
            health.degraded = exceeded;
            changed
        });
        if !changed {
            return;
        }

        self.scheduler.set_degraded(exceeded);
        if exceeded {
            let error_rate = self.board.fetch_stats(now).ratio();
            self.events.emit(Event::DegradedModeEntered { error_rate });
        } else {
            self.events.emit(Event::DegradedModeExited);
        }
    }

    fn touch_watchdog_file(&mut self) {
        let Some(path) = &self.settings.watchdog_file else {
            return;
        };
        let touched = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .and_then(|file| file.set_modified(SystemTime::now()));
        match touched {
            Ok(()) => self.touch_failed = false,
            Err(e) if !self.touch_failed => {
                self.touch_failed = true;
                tracing::warn!(path = %path.display(), error = %e, "failed to touch watchdog file");
            }
            Err(_) => {}
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
