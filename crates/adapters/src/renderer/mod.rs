// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering surface adapters
//!
//! The supervisor issues `load`, `start` and `stop`. The surface answers
//! asynchronously with [`RendererSignal`]s on a channel handed to the adapter
//! at construction. Every signal carries the [`LoadId`] it belongs to, so a
//! late signal from an earlier load can be told apart from the current one.

mod process;

pub use process::ProcessRenderer;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRenderer, RenderCall};

use async_trait::async_trait;
use bb_core::{Category, PlaybackTarget};
use thiserror::Error;

/// Handle for one load on the rendering surface
pub type LoadId = u64;

/// Errors from renderer commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("no renderer configured for {0}")]
    NoCommand(Category),
    #[error("failed to launch renderer: {0}")]
    SpawnFailed(String),
    #[error("unknown load {0}")]
    UnknownLoad(LoadId),
    #[error("renderer command failed: {0}")]
    CommandFailed(String),
}

/// Asynchronous notification from the rendering surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKind {
    /// Content loaded and ready to be shown
    Ready,
    /// Content ended on its own
    Finished,
    /// Surface died or stopped responding
    Crashed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererSignal {
    pub load: LoadId,
    pub kind: SignalKind,
}

/// Control surface of an external renderer
#[async_trait]
pub trait RendererAdapter: Clone + Send + Sync + 'static {
    /// Hand content to the surface. `Ready` follows when it can be shown.
    async fn load(&self, target: &PlaybackTarget, category: Category)
        -> Result<LoadId, RenderError>;

    /// Begin presenting a loaded target
    async fn start(&self, load: LoadId) -> Result<(), RenderError>;

    /// Release the surface. Stopping an unknown or finished load succeeds.
    async fn stop(&self, load: LoadId) -> Result<(), RenderError>;
}
