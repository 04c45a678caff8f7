// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Two notions of time are needed: a monotonic instant for deadlines and
//! heartbeats, and wall-clock UTC for active windows.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic time
    fn now(&self) -> Instant;

    /// Wall-clock time, used for active windows
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Real system clock
///
/// Monotonic time is read through tokio so that paused test runtimes
/// advance it together with their timers.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<(Instant, DateTime<Utc>)>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a clock whose wall time starts at `wall`
    pub fn at(wall: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new((Instant::now(), wall))),
        }
    }

    /// Advance both monotonic and wall time by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.0 += duration;
        current.1 += chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    }

    /// Set the wall time, leaving monotonic time untouched
    pub fn set_utc(&self, wall: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.1 = wall;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).0
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).1
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
