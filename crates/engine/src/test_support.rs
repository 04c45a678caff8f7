// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for engine tests

use bb_core::Clock;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Clock whose wall time moves with tokio's (possibly paused) clock
#[derive(Clone)]
pub struct TokioClock {
    base: Arc<Mutex<(tokio::time::Instant, DateTime<Utc>)>>,
}

impl TokioClock {
    pub fn at(wall: DateTime<Utc>) -> Self {
        Self {
            base: Arc::new(Mutex::new((tokio::time::Instant::now(), wall))),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let (started, wall) = *self.base.lock().unwrap();
        let elapsed = tokio::time::Instant::now().duration_since(started);
        wall + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

/// Poll `cond` every 10ms of (virtual) time until it holds
pub async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}
