// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use bb_adapters::{HttpFetcher, ProcessRenderer, TracedFetcher, TracedRenderer};
use bb_core::config::default_config_path;
use bb_core::{Config, ConfigError, SystemClock, UuidIdGen};
use bb_engine::{EngineError, Runtime, RuntimeDeps};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Daemon runtime with concrete adapter types (wrapped with tracing)
pub type DaemonRuntime = Runtime<
    TracedRenderer<ProcessRenderer>,
    TracedFetcher<HttpFetcher>,
    SystemClock,
    UuidIdGen,
>;

/// Player configuration plus the daemon's own files
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub config: Config,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
}

impl DaemonConfig {
    /// Load the config file at `path`, else `BB_CONFIG`, else the default
    /// location. A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, LifecycleError> {
        let config = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => Config::load(&path)?,
            None => {
                let config = Config::default();
                config.validate()?;
                config
            }
        };
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, LifecycleError> {
        let state_dir = config.state_dir()?;
        Ok(Self {
            socket_path: config.socket_path(),
            lock_path: state_dir.join("bbd.pid"),
            version_path: state_dir.join("bbd.version"),
            log_path: state_dir.join("bbd.log"),
            config,
        })
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: DaemonConfig,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    pub runtime: DaemonRuntime,
    /// When daemon started
    pub start_time: Instant,
    /// Shutdown requested flag
    pub shutdown_requested: bool,
}

impl DaemonState {
    /// Stop playback and remove the daemon's files
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        self.runtime.shutdown().await;

        for path in [
            &self.config.socket_path,
            &self.config.lock_path,
            &self.config.version_path,
        ] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }

        // Lock is released when self.lock_file is dropped
        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not determine log directory")]
    NoLogDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon. Playback does not begin until `runtime.start()`.
pub async fn startup(config: &DaemonConfig) -> Result<DaemonState, LifecycleError> {
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Lock FIRST; a losing instance must not touch the winner's files
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    match startup_inner(config, &mut lock_file).await {
        Ok((listener, runtime)) => Ok(DaemonState {
            config: config.clone(),
            lock_file,
            listener,
            runtime,
            start_time: Instant::now(),
            shutdown_requested: false,
        }),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Everything after the lock; cleanup_on_failure runs if this fails
async fn startup_inner(
    config: &DaemonConfig,
    lock_file: &mut File,
) -> Result<(UnixListener, DaemonRuntime), LifecycleError> {
    use std::io::Write;

    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // Open durable state BEFORE binding the socket (fail fast)
    let (signal_tx, signals) = mpsc::unbounded_channel();
    let runtime = Runtime::new(
        &config.config,
        RuntimeDeps {
            renderer: TracedRenderer::new(ProcessRenderer::new(
                config.config.renderer.clone(),
                signal_tx,
            )),
            signals,
            fetcher: TracedFetcher::new(HttpFetcher::new(config.config.cache.fetch_timeout)),
            clock: SystemClock,
            id_gen: UuidIdGen,
        },
    )?;

    info!(
        assets = runtime.list_assets().assets.len(),
        epoch = runtime.repo_epoch(),
        "loaded asset repository"
    );

    // Remove stale socket and bind (LAST - only after all validation passes)
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    Ok((listener, runtime))
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &DaemonConfig) {
    for path in [&config.socket_path, &config.version_path, &config.lock_path] {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
