// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local content cache
//!
//! Layout under the cache root:
//!
//! ```text
//! index.json        entry index, replaced atomically
//! assets/<id>       published content, only ever created by rename
//! tmp/              in-flight downloads
//! ```
//!
//! An external cleanup tool may delete anything under `tmp/` or remove
//! files under `assets/`; missing files are treated as cache misses.

mod index;
mod manager;
mod prefetch;

pub use index::{CacheEntry, CacheIndex};
pub use manager::{CacheLease, CacheManager, CacheSettings};

use bb_adapters::FetchError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("integrity mismatch: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },
    #[error("local file not found: {}", .0.display())]
    MissingLocal(PathBuf),
    #[error("cache io error: {0}")]
    Io(String),
    #[error("cache is shutting down")]
    Closed,
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Io(e.to_string())
    }
}
