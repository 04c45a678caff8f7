// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP fetcher backed by ureq

use super::{FetchError, FetchOutcome, Fetcher};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ureq::Agent;

/// Blocking HTTP client run on tokio's blocking pool
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: Agent::new_with_config(config),
        }
    }
}

fn map_error(e: ureq::Error) -> FetchError {
    match e {
        ureq::Error::Timeout(_) => FetchError::Timeout,
        ureq::Error::Io(io) => FetchError::Io(io.to_string()),
        other => FetchError::Network(other.to_string()),
    }
}

/// Set once the awaiting fetch is dropped. The blocking download keeps
/// running after an abort, so it checks this before touching `dest`.
struct Abandoned(Arc<AtomicBool>);

impl Drop for Abandoned {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

fn abandoned() -> FetchError {
    FetchError::Io("fetch abandoned".to_string())
}

fn download(
    agent: &Agent,
    uri: &str,
    dest: &Path,
    validator: Option<&str>,
    abandoned_flag: &AtomicBool,
) -> Result<FetchOutcome, FetchError> {
    let mut request = agent.get(uri);
    if let Some(tag) = validator {
        request = request.header("If-None-Match", tag);
    }
    let mut response = request.call().map_err(map_error)?;

    let status = response.status().as_u16();
    if status == 304 && validator.is_some() {
        return Ok(FetchOutcome::NotModified);
    }
    if !(200..300).contains(&status) {
        return Err(FetchError::Status(status));
    }

    let etag = response
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if abandoned_flag.load(Ordering::Acquire) {
        return Err(abandoned());
    }
    let result = write_body(&mut response.body_mut().as_reader(), dest, abandoned_flag)
        .and_then(|bytes| {
            if abandoned_flag.load(Ordering::Acquire) {
                Err(abandoned())
            } else {
                Ok(bytes)
            }
        });
    if result.is_err() {
        let _ = std::fs::remove_file(dest);
    }

    Ok(FetchOutcome::Downloaded {
        etag,
        bytes: result?,
    })
}

fn write_body(
    body: &mut impl Read,
    dest: &Path,
    abandoned_flag: &AtomicBool,
) -> Result<u64, FetchError> {
    let mut out = BufWriter::new(File::create(dest)?);
    let mut buf = vec![0u8; 64 * 1024];
    let mut bytes = 0u64;
    loop {
        if abandoned_flag.load(Ordering::Acquire) {
            return Err(abandoned());
        }
        let n = body.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        bytes += n as u64;
    }
    let file = out
        .into_inner()
        .map_err(|e| FetchError::Io(e.error().to_string()))?;
    file.sync_all()?;
    Ok(bytes)
}

fn head(agent: &Agent, uri: &str) -> Result<(), FetchError> {
    let response = agent.head(uri).call().map_err(map_error)?;
    let status = response.status().as_u16();
    if status < 400 {
        Ok(())
    } else {
        Err(FetchError::Status(status))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        uri: &str,
        dest: &Path,
        validator: Option<&str>,
    ) -> Result<FetchOutcome, FetchError> {
        let agent = self.agent.clone();
        let uri = uri.to_string();
        let dest: PathBuf = dest.to_path_buf();
        let validator = validator.map(str::to_string);
        let guard = Abandoned(Arc::new(AtomicBool::new(false)));
        let flag = Arc::clone(&guard.0);

        let result = tokio::task::spawn_blocking(move || {
            download(&agent, &uri, &dest, validator.as_deref(), &flag)
        })
        .await;
        drop(guard);
        result.map_err(|e| FetchError::Io(format!("fetch task failed: {}", e)))?
    }

    async fn probe(&self, uri: &str) -> Result<(), FetchError> {
        let agent = self.agent.clone();
        let uri = uri.to_string();

        tokio::task::spawn_blocking(move || head(&agent, &uri))
            .await
            .map_err(|e| FetchError::Io(format!("probe task failed: {}", e)))?
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
