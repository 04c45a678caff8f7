// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared health bookkeeping
//!
//! The supervisor writes heartbeats, the watchdog writes restart decisions
//! and the cache records fetch outcomes. Each write holds the lock for the
//! whole update, so the watchdog never decides on a half-written state.

use bb_core::{FetchErrorStats, FetchErrorWindow, HealthSnapshot, HealthState};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct HealthBoard {
    state: Mutex<HealthState>,
    fetches: Mutex<FetchErrorWindow>,
}

impl HealthBoard {
    pub fn new(now: Instant, fetch_window: Duration) -> Self {
        Self {
            state: Mutex::new(HealthState::new(now)),
            fetches: Mutex::new(FetchErrorWindow::new(fetch_window)),
        }
    }

    pub fn heartbeat(&self, now: Instant) {
        self.update(|state| state.record_heartbeat(now));
    }

    pub fn record_fetch(&self, now: Instant, ok: bool) {
        self.fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record(now, ok);
    }

    pub fn fetch_stats(&self, now: Instant) -> FetchErrorStats {
        self.fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .stats(now)
    }

    pub fn fetch_errors_exceed(&self, now: Instant, threshold: f64, min_samples: usize) -> bool {
        self.fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .exceeds(now, threshold, min_samples)
    }

    /// Apply one atomic update to the health state
    pub fn update<T>(&self, f: impl FnOnce(&mut HealthState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    pub fn is_degraded(&self) -> bool {
        self.update(|state| state.degraded)
    }

    pub fn snapshot(&self, now: Instant) -> HealthSnapshot {
        let fetch = self.fetch_stats(now);
        self.update(|state| state.snapshot(now, fetch))
    }
}
