// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine event fan-out

use bb_core::Event;
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 256;

/// Broadcasts engine events to any number of observers and logs each one
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    pub fn emit(&self, event: Event) {
        match event.asset_id() {
            Some(asset_id) => tracing::info!(event = event.name(), %asset_id, "{:?}", event),
            None => tracing::info!(event = event.name(), "{:?}", event),
        }
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
