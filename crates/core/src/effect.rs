// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events for state machine orchestration

use crate::asset::{AssetId, Category, PlaybackTarget};
use crate::traced::TracedEffect;
use serde::{Deserialize, Serialize};

/// Side effects requested by the playback session state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Emit an event for other components to observe
    Emit(Event),
    /// Ask the cache for a playable target
    Prepare { asset_id: AssetId },
    /// Hand a target to the rendering surface
    Load {
        asset_id: AssetId,
        target: PlaybackTarget,
        category: Category,
    },
    /// Begin presenting the loaded content
    Start { asset_id: AssetId },
    /// Release the rendering surface
    Stop { asset_id: AssetId },
    /// Reset the asset's consecutive failure count
    RecordSuccess { asset_id: AssetId },
    /// Count a playback failure against the asset
    RecordFailure { asset_id: AssetId, reason: String },
}

impl TracedEffect for Effect {
    fn name(&self) -> &'static str {
        match self {
            Effect::Emit(_) => "emit",
            Effect::Prepare { .. } => "prepare",
            Effect::Load { .. } => "load",
            Effect::Start { .. } => "start",
            Effect::Stop { .. } => "stop",
            Effect::RecordSuccess { .. } => "record_success",
            Effect::RecordFailure { .. } => "record_failure",
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::Emit(event) => vec![("event", event.name().to_string())],
            Effect::Prepare { asset_id }
            | Effect::Start { asset_id }
            | Effect::Stop { asset_id }
            | Effect::RecordSuccess { asset_id } => vec![("asset_id", asset_id.to_string())],
            Effect::Load {
                asset_id,
                target,
                category,
            } => vec![
                ("asset_id", asset_id.to_string()),
                ("target", target.to_string()),
                ("category", category.to_string()),
            ],
            Effect::RecordFailure { asset_id, reason } => vec![
                ("asset_id", asset_id.to_string()),
                ("reason", reason.clone()),
            ],
        }
    }
}

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Schedule events
    PlaylistReplaced {
        epoch: u64,
        repo_epoch: u64,
        entries: usize,
        placeholder: bool,
    },
    AssetExcluded {
        asset_id: AssetId,
        failures: u32,
    },
    ExclusionsCleared {
        count: usize,
    },

    // Session events
    SessionPreparing {
        asset_id: AssetId,
        epoch: u64,
    },
    SessionDisplaying {
        asset_id: AssetId,
        epoch: u64,
        target: String,
    },
    SessionFinished {
        asset_id: AssetId,
        reason: String,
    },
    SessionFailed {
        asset_id: AssetId,
        reason: String,
    },

    // Cache events
    CacheFetched {
        asset_id: AssetId,
        bytes: u64,
    },
    CacheFetchFailed {
        asset_id: AssetId,
        reason: String,
    },
    CacheEvicted {
        asset_id: AssetId,
        bytes: u64,
    },

    // Health events
    SupervisorRestarted {
        restarts: u64,
        backoff_ms: u64,
        reason: String,
    },
    DegradedModeEntered {
        error_rate: f64,
    },
    DegradedModeExited,
}

impl Event {
    /// Event name for logs and filtering, formatted "category:action"
    pub fn name(&self) -> &'static str {
        match self {
            Event::PlaylistReplaced { .. } => "playlist:replaced",
            Event::AssetExcluded { .. } => "asset:excluded",
            Event::ExclusionsCleared { .. } => "asset:exclusions_cleared",

            Event::SessionPreparing { .. } => "session:preparing",
            Event::SessionDisplaying { .. } => "session:displaying",
            Event::SessionFinished { .. } => "session:finished",
            Event::SessionFailed { .. } => "session:failed",

            Event::CacheFetched { .. } => "cache:fetched",
            Event::CacheFetchFailed { .. } => "cache:fetch_failed",
            Event::CacheEvicted { .. } => "cache:evicted",

            Event::SupervisorRestarted { .. } => "health:restarted",
            Event::DegradedModeEntered { .. } => "health:degraded",
            Event::DegradedModeExited => "health:recovered",
        }
    }

    /// Asset the event concerns, if any
    pub fn asset_id(&self) -> Option<&AssetId> {
        match self {
            Event::AssetExcluded { asset_id, .. }
            | Event::SessionPreparing { asset_id, .. }
            | Event::SessionDisplaying { asset_id, .. }
            | Event::SessionFinished { asset_id, .. }
            | Event::SessionFailed { asset_id, .. }
            | Event::CacheFetched { asset_id, .. }
            | Event::CacheFetchFailed { asset_id, .. }
            | Event::CacheEvicted { asset_id, .. } => Some(asset_id),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
