// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor health tracking
//!
//! [`HealthState`] is the process-wide record the watchdog consults when
//! deciding whether to restart the playback supervisor and how long to wait
//! first. [`FetchErrorWindow`] aggregates cache fetch outcomes for the
//! degraded-mode decision.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Restart backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    /// Restarts closer together than this escalate the backoff
    pub restart_window: Duration,
    /// Healthy time after which the backoff resets
    pub healthy_reset_after: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
            restart_window: Duration::from_secs(120),
            healthy_reset_after: Duration::from_secs(300),
        }
    }
}

/// Process-wide supervisor health
#[derive(Debug, Clone)]
pub struct HealthState {
    pub last_heartbeat: Option<Instant>,
    /// Delay applied before the most recent restart; zero when reset
    pub backoff: Duration,
    pub restarts: u64,
    pub last_restart: Option<Instant>,
    pub last_error: Option<String>,
    pub degraded: bool,
    /// When the current supervisor incarnation started
    watch_started: Instant,
}

impl HealthState {
    pub fn new(now: Instant) -> Self {
        Self {
            last_heartbeat: None,
            backoff: Duration::ZERO,
            restarts: 0,
            last_restart: None,
            last_error: None,
            degraded: false,
            watch_started: now,
        }
    }

    pub fn record_heartbeat(&mut self, now: Instant) {
        self.last_heartbeat = Some(now);
    }

    /// Time since the last heartbeat, or since the supervisor started if it
    /// has not beaten yet
    pub fn silence(&self, now: Instant) -> Duration {
        let since = self.last_heartbeat.unwrap_or(self.watch_started);
        now.saturating_duration_since(since)
    }

    pub fn is_stalled(&self, now: Instant, grace: Duration) -> bool {
        self.silence(now) > grace
    }

    /// Record a restart decision and return the delay to wait before it.
    ///
    /// Restarts within `restart_window` of the previous one double the
    /// delay up to `max`; otherwise the delay starts over at `initial`.
    pub fn record_restart(
        &mut self,
        now: Instant,
        reason: impl Into<String>,
        policy: &BackoffPolicy,
    ) -> Duration {
        let delay = match self.last_restart {
            Some(prev)
                if !self.backoff.is_zero()
                    && now.saturating_duration_since(prev) <= policy.restart_window =>
            {
                self.backoff.saturating_mul(2).min(policy.max)
            }
            _ => policy.initial.min(policy.max),
        };
        self.backoff = delay;
        self.restarts += 1;
        self.last_restart = Some(now);
        self.last_error = Some(reason.into());
        self.last_heartbeat = None;
        self.watch_started = now + delay;
        delay
    }

    /// A new supervisor incarnation is running
    pub fn supervisor_started(&mut self, now: Instant) {
        self.watch_started = now;
        self.last_heartbeat = None;
    }

    /// Reset the backoff after a sustained healthy period.
    /// Returns true when a reset happened.
    pub fn maybe_reset(&mut self, now: Instant, policy: &BackoffPolicy) -> bool {
        let Some(last) = self.last_restart else {
            return false;
        };
        if self.backoff.is_zero() {
            return false;
        }
        if now.saturating_duration_since(last) >= policy.healthy_reset_after {
            self.backoff = Duration::ZERO;
            return true;
        }
        false
    }

    pub fn snapshot(&self, now: Instant, fetch: FetchErrorStats) -> HealthSnapshot {
        HealthSnapshot {
            last_heartbeat_ms: self
                .last_heartbeat
                .map(|hb| now.saturating_duration_since(hb).as_millis() as u64),
            backoff_ms: self.backoff.as_millis() as u64,
            restarts: self.restarts,
            last_error: self.last_error.clone(),
            degraded: self.degraded,
            fetch_errors: fetch.errors,
            fetch_attempts: fetch.attempts,
        }
    }
}

/// Outcome counts within the error window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchErrorStats {
    pub errors: usize,
    pub attempts: usize,
}

impl FetchErrorStats {
    pub fn ratio(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.errors as f64 / self.attempts as f64
        }
    }
}

/// Sliding window of fetch outcomes
#[derive(Debug, Clone)]
pub struct FetchErrorWindow {
    window: Duration,
    samples: VecDeque<(Instant, bool)>,
}

impl FetchErrorWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    pub fn record(&mut self, now: Instant, ok: bool) {
        self.prune(now);
        self.samples.push_back((now, ok));
    }

    pub fn stats(&mut self, now: Instant) -> FetchErrorStats {
        self.prune(now);
        FetchErrorStats {
            errors: self.samples.iter().filter(|(_, ok)| !ok).count(),
            attempts: self.samples.len(),
        }
    }

    /// Error ratio above `threshold` over at least `min_samples` attempts
    pub fn exceeds(&mut self, now: Instant, threshold: f64, min_samples: usize) -> bool {
        let stats = self.stats(now);
        stats.attempts >= min_samples.max(1) && stats.ratio() > threshold
    }

    fn prune(&mut self, now: Instant) {
        while let Some((at, _)) = self.samples.front() {
            if now.saturating_duration_since(*at) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Serializable view for the operational surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Milliseconds since the last supervisor heartbeat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_ms: Option<u64>,
    pub backoff_ms: u64,
    pub restarts: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub degraded: bool,
    pub fetch_errors: usize,
    pub fetch_attempts: usize,
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
