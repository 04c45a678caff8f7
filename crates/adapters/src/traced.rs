// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::fetch::{FetchError, FetchOutcome, Fetcher};
use crate::renderer::{LoadId, RenderError, RendererAdapter};
use async_trait::async_trait;
use bb_core::{Category, PlaybackTarget};
use std::path::Path;
use tracing::Instrument;

/// Wrapper that adds tracing to any RendererAdapter
#[derive(Clone)]
pub struct TracedRenderer<R> {
    inner: R,
}

impl<R> TracedRenderer<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: RendererAdapter> RendererAdapter for TracedRenderer<R> {
    async fn load(
        &self,
        target: &PlaybackTarget,
        category: Category,
    ) -> Result<LoadId, RenderError> {
        let span = tracing::info_span!("renderer.load", %target, %category);

        async move {
            tracing::info!("loading");

            // Precondition: local content must exist before the surface sees it
            if let PlaybackTarget::File(path) = target {
                if !path.exists() {
                    tracing::error!("target file does not exist");
                    return Err(RenderError::SpawnFailed(format!(
                        "target file does not exist: {}",
                        path.display()
                    )));
                }
            }

            let start = std::time::Instant::now();
            let result = self.inner.load(target, category).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(load) => tracing::info!(
                    load,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "loaded"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "load failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn start(&self, load: LoadId) -> Result<(), RenderError> {
        let span = tracing::info_span!("renderer.start", load);

        async move {
            let result = self.inner.start(load).await;
            match &result {
                Ok(()) => tracing::debug!("started"),
                Err(e) => tracing::error!(error = %e, "start failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn stop(&self, load: LoadId) -> Result<(), RenderError> {
        let span = tracing::info_span!("renderer.stop", load);

        async move {
            let result = self.inner.stop(load).await;
            // stop() failing is tolerable (surface already gone)
            match &result {
                Ok(()) => tracing::info!("stopped"),
                Err(e) => tracing::warn!(error = %e, "stop failed (may be expected)"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any Fetcher
#[derive(Clone)]
pub struct TracedFetcher<F> {
    inner: F,
}

impl<F> TracedFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for TracedFetcher<F> {
    async fn fetch(
        &self,
        uri: &str,
        dest: &Path,
        validator: Option<&str>,
    ) -> Result<FetchOutcome, FetchError> {
        let span = tracing::info_span!("fetch.get", uri, dest = %dest.display());

        async move {
            tracing::info!(conditional = validator.is_some(), "starting");

            // Precondition: destination directory must exist
            if let Some(parent) = dest.parent() {
                if !parent.exists() {
                    tracing::error!("destination directory does not exist");
                    return Err(FetchError::Io(format!(
                        "destination directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            let start = std::time::Instant::now();
            let result = self.inner.fetch(uri, dest, validator).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(FetchOutcome::Downloaded { bytes, etag }) => tracing::info!(
                    bytes,
                    etag = etag.as_deref().unwrap_or("-"),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "downloaded"
                ),
                Ok(FetchOutcome::NotModified) => tracing::info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "not modified"
                ),
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "fetch failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn probe(&self, uri: &str) -> Result<(), FetchError> {
        let span = tracing::info_span!("fetch.probe", uri);

        async move {
            let result = self.inner.probe(uri).await;
            match &result {
                Ok(()) => tracing::debug!("reachable"),
                Err(e) => tracing::warn!(error = %e, "unreachable"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
