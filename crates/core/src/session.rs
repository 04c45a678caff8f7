// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Playback session state machine
//!
//! A session is one in-progress display of a single asset:
//!
//! ```text
//! Idle -> Preparing -> Displaying -> Finishing -> Idle
//!             |             |
//!             +--> Error <--+-------------------> Idle
//! ```
//!
//! Transitions are pure. The supervisor feeds [`SessionEvent`]s in, executes
//! the returned [`Effect`]s, and drops the session once it is torn down.
//! Timeouts are evaluated on [`SessionEvent::Tick`] against the injected clock,
//! so every path can be exercised without a renderer or real time.

use crate::asset::{Asset, AssetId, Category, PlaybackTarget};
use crate::clock::Clock;
use crate::effect::{Effect, Event};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Time limits applied to every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Bound on obtaining a playable target from the cache
    pub prepare_timeout: Duration,
    /// Bound on the renderer reporting ready after a load
    pub ready_timeout: Duration,
    /// Ceiling for content that ends on its own
    pub max_self_terminating: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            prepare_timeout: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(10),
            max_self_terminating: Duration::from_secs(3 * 60 * 60),
        }
    }
}

/// Why a display ended early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptReason {
    /// A new playlist epoch superseded the session's
    PlaylistReplaced,
    /// Operator asked for another asset
    Skipped,
    /// Operator paused playback
    Paused,
    Shutdown,
}

/// How a session reached `Finishing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Declared duration elapsed
    Elapsed,
    /// Renderer reported the content ended
    Completed,
    Interrupted(InterruptReason),
}

impl FinishReason {
    /// Whether the asset played as intended
    pub fn is_success(self) -> bool {
        matches!(self, FinishReason::Elapsed | FinishReason::Completed)
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Elapsed => f.write_str("elapsed"),
            FinishReason::Completed => f.write_str("completed"),
            FinishReason::Interrupted(reason) => write!(f, "interrupted ({:?})", reason),
        }
    }
}

/// Per-asset playback failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackFailure {
    /// Cache could not produce a playable target
    Fetch(String),
    PrepareTimeout,
    ReadyTimeout,
    /// Renderer process died or rejected a command
    Renderer(String),
    /// Self-terminating content ran past the ceiling
    Unresponsive,
}

impl fmt::Display for PlaybackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackFailure::Fetch(reason) => write!(f, "fetch failed: {}", reason),
            PlaybackFailure::PrepareTimeout => f.write_str("prepare timed out"),
            PlaybackFailure::ReadyTimeout => f.write_str("renderer not ready in time"),
            PlaybackFailure::Renderer(reason) => write!(f, "renderer failed: {}", reason),
            PlaybackFailure::Unresponsive => f.write_str("renderer never finished"),
        }
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Preparing {
        since: Instant,
    },
    Displaying {
        /// Renderer acknowledged the load and was started
        ready: bool,
        deadline: Instant,
        /// No declared duration; waiting for `finished`
        open_ended: bool,
    },
    Finishing {
        reason: FinishReason,
    },
    Error {
        failure: PlaybackFailure,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Preparing { .. } => "preparing",
            SessionState::Displaying { .. } => "displaying",
            SessionState::Finishing { .. } => "finishing",
            SessionState::Error { .. } => "error",
        }
    }
}

/// Inputs to the session state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Begin,
    Prepared { target: PlaybackTarget },
    PrepareFailed { reason: String },
    RendererReady,
    RendererFinished,
    RendererCrashed { reason: String },
    Interrupt { reason: InterruptReason },
    /// Re-evaluate timeouts
    Tick,
    /// Teardown of the rendering surface completed
    TornDown,
}

/// One in-progress display of a single asset
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub asset_id: AssetId,
    pub name: String,
    pub category: Category,
    /// Playlist epoch the asset was taken from
    pub epoch: u64,
    /// `None` plays until the renderer reports completion
    pub duration: Option<Duration>,
    pub target: Option<PlaybackTarget>,
    pub state: SessionState,
    pub timings: SessionTimings,
    pub started_at: DateTime<Utc>,
    pub displayed_at: Option<DateTime<Utc>>,
    pub expected_end: Option<DateTime<Utc>>,
    /// Failures in a row for this asset, including this session's
    pub consecutive_failures: u32,
}

impl PlaybackSession {
    /// Create a session in `Idle`
    pub fn new(
        asset: &Asset,
        epoch: u64,
        consecutive_failures: u32,
        timings: SessionTimings,
        clock: &impl Clock,
    ) -> Self {
        Self {
            asset_id: asset.id.clone(),
            name: asset.name.clone(),
            category: asset.category,
            epoch,
            duration: asset.display_duration(),
            target: None,
            state: SessionState::Idle,
            timings,
            started_at: clock.utc_now(),
            displayed_at: None,
            expected_end: None,
            consecutive_failures,
        }
    }

    /// Apply an event, returning the next session and the effects to run
    pub fn transition(&self, event: SessionEvent, clock: &impl Clock) -> (Self, Vec<Effect>) {
        let now = clock.now();
        match (&self.state, event) {
            (SessionState::Idle, SessionEvent::Begin) => (
                self.with_state(SessionState::Preparing { since: now }),
                vec![
                    Effect::Prepare {
                        asset_id: self.asset_id.clone(),
                    },
                    Effect::Emit(Event::SessionPreparing {
                        asset_id: self.asset_id.clone(),
                        epoch: self.epoch,
                    }),
                ],
            ),

            (SessionState::Preparing { .. }, SessionEvent::Prepared { target }) => {
                let next = Self {
                    target: Some(target.clone()),
                    ..self.with_state(SessionState::Displaying {
                        ready: false,
                        deadline: now + self.timings.ready_timeout,
                        open_ended: self.duration.is_none(),
                    })
                };
                let effects = vec![Effect::Load {
                    asset_id: self.asset_id.clone(),
                    target,
                    category: self.category,
                }];
                (next, effects)
            }
            (SessionState::Preparing { .. }, SessionEvent::PrepareFailed { reason }) => {
                self.fail(PlaybackFailure::Fetch(reason), false)
            }
            (SessionState::Preparing { since }, SessionEvent::Tick) => {
                if now >= *since + self.timings.prepare_timeout {
                    self.fail(PlaybackFailure::PrepareTimeout, false)
                } else {
                    (self.clone(), vec![])
                }
            }
            (SessionState::Preparing { .. }, SessionEvent::Interrupt { reason }) => (
                self.with_state(SessionState::Finishing {
                    reason: FinishReason::Interrupted(reason),
                }),
                vec![],
            ),

            (
                SessionState::Displaying {
                    ready: false,
                    open_ended,
                    ..
                },
                SessionEvent::RendererReady,
            ) => {
                let run_for = self.duration.unwrap_or(self.timings.max_self_terminating);
                let wall = clock.utc_now();
                let next = Self {
                    displayed_at: Some(wall),
                    expected_end: self
                        .duration
                        .and_then(|d| chrono::Duration::from_std(d).ok())
                        .map(|d| wall + d),
                    ..self.with_state(SessionState::Displaying {
                        ready: true,
                        deadline: now + run_for,
                        open_ended: *open_ended,
                    })
                };
                let target = self
                    .target
                    .as_ref()
                    .map(PlaybackTarget::as_uri)
                    .unwrap_or_default();
                let effects = vec![
                    Effect::Start {
                        asset_id: self.asset_id.clone(),
                    },
                    Effect::Emit(Event::SessionDisplaying {
                        asset_id: self.asset_id.clone(),
                        epoch: self.epoch,
                        target,
                    }),
                ];
                (next, effects)
            }
            (
                SessionState::Displaying {
                    ready,
                    deadline,
                    open_ended,
                },
                SessionEvent::Tick,
            ) => {
                if now < *deadline {
                    return (self.clone(), vec![]);
                }
                match (ready, open_ended) {
                    (false, _) => self.fail(PlaybackFailure::ReadyTimeout, true),
                    (true, true) => self.fail(PlaybackFailure::Unresponsive, true),
                    (true, false) => self.finish(FinishReason::Elapsed),
                }
            }
            (SessionState::Displaying { .. }, SessionEvent::RendererFinished) => {
                self.finish(FinishReason::Completed)
            }
            (SessionState::Displaying { .. }, SessionEvent::RendererCrashed { reason }) => {
                self.fail(PlaybackFailure::Renderer(reason), true)
            }
            (SessionState::Displaying { .. }, SessionEvent::Interrupt { reason }) => {
                self.finish(FinishReason::Interrupted(reason))
            }

            (SessionState::Finishing { reason }, SessionEvent::TornDown) => {
                let mut effects = Vec::new();
                if reason.is_success() {
                    effects.push(Effect::RecordSuccess {
                        asset_id: self.asset_id.clone(),
                    });
                }
                effects.push(Effect::Emit(Event::SessionFinished {
                    asset_id: self.asset_id.clone(),
                    reason: reason.to_string(),
                }));
                (self.with_state(SessionState::Idle), effects)
            }
            (SessionState::Error { .. }, SessionEvent::TornDown) => {
                (self.with_state(SessionState::Idle), vec![])
            }

            // Late or duplicate signals are ignored
            _ => (self.clone(), vec![]),
        }
    }

    /// Next instant at which a `Tick` may change the state
    pub fn wake_at(&self) -> Option<Instant> {
        match &self.state {
            SessionState::Preparing { since } => Some(*since + self.timings.prepare_timeout),
            SessionState::Displaying { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Session reached `Finishing` or `Error` and awaits teardown
    pub fn is_ending(&self) -> bool {
        matches!(
            self.state,
            SessionState::Finishing { .. } | SessionState::Error { .. }
        )
    }

    /// Read-only view for the operational surface
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            asset_id: self.asset_id.clone(),
            name: self.name.clone(),
            category: self.category,
            epoch: self.epoch,
            state: self.state.name().to_string(),
            target: self.target.as_ref().map(PlaybackTarget::as_uri),
            started_at: self.started_at,
            displayed_at: self.displayed_at,
            expected_end: self.expected_end,
            consecutive_failures: self.consecutive_failures,
        }
    }

    fn finish(&self, reason: FinishReason) -> (Self, Vec<Effect>) {
        (
            self.with_state(SessionState::Finishing { reason }),
            vec![Effect::Stop {
                asset_id: self.asset_id.clone(),
            }],
        )
    }

    fn fail(&self, failure: PlaybackFailure, loaded: bool) -> (Self, Vec<Effect>) {
        let mut effects = Vec::new();
        if loaded {
            effects.push(Effect::Stop {
                asset_id: self.asset_id.clone(),
            });
        }
        effects.push(Effect::RecordFailure {
            asset_id: self.asset_id.clone(),
            reason: failure.to_string(),
        });
        effects.push(Effect::Emit(Event::SessionFailed {
            asset_id: self.asset_id.clone(),
            reason: failure.to_string(),
        }));
        let next = Self {
            consecutive_failures: self.consecutive_failures + 1,
            ..self.with_state(SessionState::Error { failure })
        };
        (next, effects)
    }

    fn with_state(&self, state: SessionState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

/// Serializable view of the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub asset_id: AssetId,
    pub name: String,
    pub category: Category,
    pub epoch: u64,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_end: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
