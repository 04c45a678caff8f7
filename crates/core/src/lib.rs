// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bb-core: domain library for the billboard signage player
//!
//! This crate provides:
//! - Asset records and their validation
//! - Pure schedule computation and immutable playlists
//! - The playback session state machine and its effects
//! - Health and backoff bookkeeping
//! - Configuration types

pub mod asset;
pub mod clock;
pub mod config;
pub mod effect;
pub mod failures;
pub mod health;
pub mod id;
pub mod operation;
pub mod playlist;
pub mod schedule;
pub mod session;
pub mod traced;

pub use asset::{
    ActiveWindow, Asset, AssetId, AssetSource, Category, Integrity, PlaybackTarget,
    ValidationError,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError};
pub use effect::{Effect, Event};
pub use failures::FailureLedger;
pub use health::{BackoffPolicy, FetchErrorStats, FetchErrorWindow, HealthSnapshot, HealthState};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use operation::Operation;
pub use playlist::{Playlist, PlaylistCursor};
pub use schedule::{Schedule, ScheduleParams, ShuffleSeed};
pub use session::{
    FinishReason, InterruptReason, PlaybackFailure, PlaybackSession, SessionEvent,
    SessionSnapshot, SessionState, SessionTimings,
};
pub use traced::TracedEffect;
