// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use crate::repository::RepositoryError;
use bb_core::AssetId;
use thiserror::Error;

/// Errors surfaced by the runtime to its host
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Repository(RepositoryError),
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),
    #[error("asset disabled: {0}")]
    AssetDisabled(AssetId),
    #[error("playback supervisor is not running")]
    SupervisorGone,
    /// Unrecoverable; the host should stop
    #[error("fatal: {0}")]
    Fatal(String),
}

impl EngineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Fatal(_))
    }
}

/// A log write that failed leaves the repository unable to persist further
/// changes, so storage errors are fatal. Rejected input is not.
impl From<RepositoryError> for EngineError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Storage(_) => EngineError::Fatal(e.to_string()),
            other => EngineError::Repository(other),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
