// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Playlists and the playback cursor
//!
//! A [`Playlist`] is an immutable, ordered view over asset ids for one
//! schedule epoch. It is replaced wholesale, never edited. The
//! [`PlaylistCursor`] walks it and survives replacement.

use crate::asset::{Asset, AssetId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ordered, immutable playback sequence valid for one schedule epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    /// Schedule epoch; strictly increasing across published playlists
    pub epoch: u64,
    /// Repository epoch the playlist was computed from
    pub repo_epoch: u64,
    pub computed_at: DateTime<Utc>,
    pub entries: Vec<AssetId>,
    /// Set when nothing is eligible; `entries` is then `[placeholder id]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<Asset>,
    /// Next instant at which an active window opens or closes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_boundary: Option<DateTime<Utc>>,
}

impl Playlist {
    /// Empty playlist used before the first computation
    pub fn initial(placeholder: Asset, at: DateTime<Utc>) -> Self {
        Self {
            epoch: 0,
            repo_epoch: 0,
            computed_at: at,
            entries: vec![placeholder.id.clone()],
            placeholder: Some(placeholder),
            next_boundary: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.entries.contains(id)
    }

    /// Whether two playlists would play the same thing in the same order.
    /// Epoch numbers and timestamps are ignored.
    pub fn same_sequence(&self, other: &Playlist) -> bool {
        self.entries == other.entries && self.placeholder == other.placeholder
    }
}

/// Position within the current playlist
#[derive(Debug, Clone, Default)]
pub struct PlaylistCursor {
    index: usize,
    last: Option<AssetId>,
    passes: u64,
    epoch: u64,
    /// The final entry was handed out; the next pass starts at the top of
    /// whichever playlist is current by then
    wrapped: bool,
}

impl PlaylistCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed passes over the playlist
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn last(&self) -> Option<&AssetId> {
        self.last.as_ref()
    }

    /// True between handing out the final entry and starting the next pass
    pub fn pass_complete(&self) -> bool {
        self.wrapped
    }

    /// Take the next entry, wrapping at the end
    pub fn next(&mut self, playlist: &Playlist) -> Option<AssetId> {
        self.rebase(playlist);
        if playlist.is_empty() {
            return None;
        }
        if std::mem::take(&mut self.wrapped) {
            self.index = 0;
        }
        let index = self.index % playlist.len();
        let id = playlist.entries[index].clone();
        self.index = (index + 1) % playlist.len();
        if self.index == 0 {
            self.passes += 1;
            self.wrapped = true;
        }
        self.last = Some(id.clone());
        Some(id)
    }

    /// Make the following `next` return the entry before the last one played
    pub fn step_back(&mut self, playlist: &Playlist) {
        self.rebase(playlist);
        let len = playlist.len();
        if len == 0 {
            return;
        }
        self.wrapped = false;
        self.index = (self.index + 2 * len - 2) % len;
    }

    /// Adopt a replacement playlist, resuming after the last played asset
    /// when it survived, otherwise at the same index modulo the new length.
    pub fn rebase(&mut self, playlist: &Playlist) {
        if playlist.epoch == self.epoch {
            return;
        }
        self.epoch = playlist.epoch;
        if playlist.is_empty() || self.wrapped {
            self.index = 0;
            return;
        }
        let resumed = self
            .last
            .as_ref()
            .and_then(|last| playlist.entries.iter().position(|id| id == last));
        self.index = match resumed {
            Some(pos) => (pos + 1) % playlist.len(),
            None => self.index % playlist.len(),
        };
    }
}

#[cfg(test)]
#[path = "playlist_tests.rs"]
mod tests;
