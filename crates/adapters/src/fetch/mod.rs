// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content origin adapters
//!
//! A [`Fetcher`] writes remote content to a caller-chosen path. It never
//! publishes anything; the cache decides what becomes visible.

mod http;

pub use http::HttpFetcher;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeFetcher, FetchCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from content origins
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("origin returned status {0}")]
    Status(u16),
    #[error("io error: {0}")]
    Io(String),
    #[error("fetch timed out")]
    Timeout,
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e.to_string())
    }
}

/// Result of a conditional download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Body written to the destination
    Downloaded { etag: Option<String>, bytes: u64 },
    /// The origin confirmed the validator; nothing was written
    NotModified,
}

/// Source of remote content
#[async_trait]
pub trait Fetcher: Clone + Send + Sync + 'static {
    /// Download `uri` into `dest`, overwriting it.
    ///
    /// With a `validator` the request is conditional and may come back
    /// [`FetchOutcome::NotModified`].
    async fn fetch(
        &self,
        uri: &str,
        dest: &Path,
        validator: Option<&str>,
    ) -> Result<FetchOutcome, FetchError>;

    /// Check that `uri` answers without downloading it
    async fn probe(&self, uri: &str) -> Result<(), FetchError>;
}
