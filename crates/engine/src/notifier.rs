// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change notification between the repository and its consumers
//!
//! Carries the latest repository epoch. Consumers only ever see the newest
//! value, so a burst of mutations collapses into one wake-up.

use tokio::sync::watch;

#[derive(Clone)]
pub struct ChangeNotifier {
    tx: watch::Sender<u64>,
}

impl ChangeNotifier {
    pub fn new(epoch: u64) -> Self {
        let (tx, _) = watch::channel(epoch);
        Self { tx }
    }

    /// Announce a new repository epoch. Older epochs are ignored.
    pub fn notify(&self, epoch: u64) -> bool {
        self.tx.send_if_modified(|current| {
            if epoch > *current {
                *current = epoch;
                true
            } else {
                false
            }
        })
    }

    pub fn epoch(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of a [`ChangeNotifier`]
pub struct ChangeSubscription {
    rx: watch::Receiver<u64>,
}

impl ChangeSubscription {
    /// Wait for an epoch newer than the last one seen.
    /// Returns `None` once the notifier is gone.
    pub async fn changed(&mut self) -> Option<u64> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
