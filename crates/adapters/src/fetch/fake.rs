// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake fetcher for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{FetchError, FetchOutcome, Fetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded fetcher call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCall {
    Fetch {
        uri: String,
        dest: PathBuf,
        validator: Option<String>,
    },
    Probe {
        uri: String,
    },
}

#[derive(Debug, Clone)]
struct Resource {
    body: Vec<u8>,
    etag: Option<String>,
}

#[derive(Default)]
struct State {
    calls: Vec<FetchCall>,
    resources: HashMap<String, Resource>,
    failures: HashMap<String, FetchError>,
}

/// In-memory origin
///
/// Serves registered bodies, honours `If-None-Match` against the registered
/// etag and fails with scripted errors. Unknown URIs answer 404.
#[derive(Clone, Default)]
pub struct FakeFetcher {
    state: Arc<Mutex<State>>,
    delay: Option<Duration>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request sleeps for `delay` first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serve `body` at `uri`
    pub fn serve(&self, uri: &str, body: impl Into<Vec<u8>>) {
        self.serve_with_etag(uri, body, None);
    }

    pub fn serve_with_etag(&self, uri: &str, body: impl Into<Vec<u8>>, etag: Option<&str>) {
        let mut state = self.state();
        state.failures.remove(uri);
        state.resources.insert(
            uri.to_string(),
            Resource {
                body: body.into(),
                etag: etag.map(str::to_string),
            },
        );
    }

    /// Fail every request for `uri` until it is served again
    pub fn fail(&self, uri: &str, error: FetchError) {
        self.state().failures.insert(uri.to_string(), error);
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.state().calls.clone()
    }

    /// Number of downloads attempted for `uri`
    pub fn fetch_count(&self, uri: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, FetchCall::Fetch { uri: u, .. } if u == uri))
            .count()
    }

    fn lookup(&self, uri: &str) -> Result<Resource, FetchError> {
        let state = self.state();
        if let Some(error) = state.failures.get(uri) {
            return Err(error.clone());
        }
        state
            .resources
            .get(uri)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(
        &self,
        uri: &str,
        dest: &Path,
        validator: Option<&str>,
    ) -> Result<FetchOutcome, FetchError> {
        self.state().calls.push(FetchCall::Fetch {
            uri: uri.to_string(),
            dest: dest.to_path_buf(),
            validator: validator.map(str::to_string),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let resource = self.lookup(uri)?;
        if validator.is_some() && validator == resource.etag.as_deref() {
            return Ok(FetchOutcome::NotModified);
        }

        tokio::fs::write(dest, &resource.body).await?;
        Ok(FetchOutcome::Downloaded {
            etag: resource.etag,
            bytes: resource.body.len() as u64,
        })
    }

    async fn probe(&self, uri: &str) -> Result<(), FetchError> {
        self.state().calls.push(FetchCall::Probe {
            uri: uri.to_string(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.lookup(uri).map(|_| ())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
