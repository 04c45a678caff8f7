// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! billboard scheduling and playback engine

pub mod cache;
mod error;
mod events;
mod health;
mod monitor;
mod notifier;
mod repository;
mod runtime;
mod scheduler;
mod supervisor;

#[cfg(test)]
mod test_support;

pub use cache::{CacheEntry, CacheError, CacheIndex, CacheLease, CacheManager, CacheSettings};
pub use error::EngineError;
pub use events::EventBus;
pub use health::HealthBoard;
pub use monitor::{Watchdog, WatchdogSettings};
pub use notifier::{ChangeNotifier, ChangeSubscription};
pub use repository::{AssetRepository, RepoSnapshot, RepositoryError};
pub use runtime::{Runtime, RuntimeDeps};
pub use scheduler::{FailureRecord, Scheduler, SchedulerSettings};
pub use supervisor::{Control, Supervisor, SupervisorDeps, SupervisorSettings};
