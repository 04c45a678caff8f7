// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use bb_core::config::default_config_path;
use bb_core::{Asset, AssetId, Config, ConfigError, HealthSnapshot, Playlist, SessionSnapshot};
use bb_daemon::protocol::{self, ProtocolError};
use bb_daemon::{
    CacheEntry, Control, FailureRecord, Query, Request, Response, StatusSummary,
    STARTUP_MARKER_PREFIX,
};
use thiserror::Error;
use tokio::net::UnixStream;

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for IPC requests
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("BB_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    parse_duration_ms("BB_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    parse_duration_ms("BB_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

/// Polling interval for retries
pub fn poll_interval() -> Duration {
    parse_duration_ms("BB_POLL_INTERVAL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Where the daemon's socket and state files are, per the player config
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    /// Config file passed on to a daemon we start
    pub config_path: Option<PathBuf>,
    pub socket_path: PathBuf,
    pub state_dir: PathBuf,
}

impl DaemonPaths {
    /// Read the same config the daemon reads: `--config`, else `BB_CONFIG`,
    /// else the default location
    pub fn resolve(config_path: Option<&Path>) -> Result<Self, ClientError> {
        let config_path = config_path.map(Path::to_path_buf).or_else(default_config_path);
        let config = match &config_path {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        Ok(Self {
            socket_path: config.socket_path(),
            state_dir: config.state_dir()?,
            config_path,
        })
    }

    pub fn pid_path(&self) -> PathBuf {
        self.state_dir.join("bbd.pid")
    }

    pub fn version_path(&self) -> PathBuf {
        self.state_dir.join("bbd.version")
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join("bbd.log")
    }
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to existing daemon (no auto-start)
    pub fn connect(paths: &DaemonPaths) -> Result<Self, ClientError> {
        if !paths.socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(Self {
            socket_path: paths.socket_path.clone(),
        })
    }

    async fn connect_with_retry(
        paths: &DaemonPaths,
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // Check if daemon process exited early (startup failure)
            if let Ok(Some(status)) = child.try_wait() {
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error(paths) {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    tokio::time::sleep(poll_interval()).await;
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            if let Ok(client) = Self::connect(paths) {
                if client.ping().await.is_ok() {
                    return Ok(client);
                }
            }
            tokio::time::sleep(poll_interval()).await;
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout, paths))
    }

    /// Send a request and receive a response with specific timeouts
    async fn send_with_timeout(
        &self,
        request: Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        tracing::debug!(?request, socket = %self.socket_path.display(), "sending request");
        let stream = match UnixStream::connect(&self.socket_path).await {
            Ok(stream) => stream,
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                return Err(ClientError::DaemonNotRunning)
            }
            Err(e) => return Err(e.into()),
        };
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(&request)?;
        tokio::time::timeout(write_timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let response_bytes =
            tokio::time::timeout(read_timeout, protocol::read_message(&mut reader))
                .await
                .map_err(|_| ProtocolError::Timeout)??;

        let response: Response = protocol::decode(&response_bytes)?;
        Ok(response)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        self.send_with_timeout(request, timeout_ipc(), timeout_ipc())
            .await
    }

    async fn query(&self, query: Query) -> Result<Response, ClientError> {
        match self.send(Request::Query { query }).await? {
            Response::Error { message } => Err(ClientError::Rejected(message)),
            other => Ok(other),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(Request::Ping).await? {
            Response::Pong => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon protocol version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(Request::Hello {
                version: bb_daemon::PROTOCOL_VERSION.to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn status(&self) -> Result<StatusSummary, ClientError> {
        match self.send(Request::Status).await? {
            Response::Status(status) => Ok(*status),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// All assets with the repository epoch they were read at
    pub async fn list_assets(&self) -> Result<(u64, Vec<Asset>), ClientError> {
        match self.query(Query::ListAssets).await? {
            Response::Assets { epoch, assets } => Ok((epoch, assets)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn get_asset(&self, id: &AssetId) -> Result<Asset, ClientError> {
        match self.query(Query::GetAsset { id: id.clone() }).await? {
            Response::Asset { asset } => Ok(*asset),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn playlist(&self) -> Result<Playlist, ClientError> {
        match self.query(Query::Playlist).await? {
            Response::Playlist { playlist } => Ok(*playlist),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn session(&self) -> Result<Option<SessionSnapshot>, ClientError> {
        match self.query(Query::Session).await? {
            Response::Session { session } => Ok(session.map(|s| *s)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn health(&self) -> Result<HealthSnapshot, ClientError> {
        match self.query(Query::Health).await? {
            Response::Health { health } => Ok(health),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn failures(&self) -> Result<Vec<FailureRecord>, ClientError> {
        match self.query(Query::Failures).await? {
            Response::Failures { failures } => Ok(failures),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn cache(&self) -> Result<Vec<CacheEntry>, ClientError> {
        match self.query(Query::Cache).await? {
            Response::Cache { entries } => Ok(entries),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Store an asset. Returns the new repository epoch and the asset id.
    pub async fn upsert_asset(&self, asset: Asset) -> Result<(u64, AssetId), ClientError> {
        match self
            .send(Request::UpsertAsset {
                asset: Box::new(asset),
            })
            .await?
        {
            Response::Mutated { epoch, id } => Ok((epoch, id)),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn remove_asset(&self, id: &AssetId) -> Result<u64, ClientError> {
        match self.send(Request::RemoveAsset { id: id.clone() }).await? {
            Response::Mutated { epoch, .. } => Ok(epoch),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn control(&self, control: Control) -> Result<(), ClientError> {
        match self.send(Request::Control { control }).await? {
            Response::Ok => Ok(()),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

/// Start the daemon in the background and wait until it answers.
/// Returns false if one was already running.
pub async fn daemon_start(paths: &DaemonPaths) -> Result<bool, ClientError> {
    if let Ok(client) = DaemonClient::connect(paths) {
        if client.ping().await.is_ok() {
            return Ok(false);
        }
    }

    let child = start_daemon_background(paths)?;
    DaemonClient::connect_with_retry(paths, timeout_connect(), child).await?;
    Ok(true)
}

/// Start the daemon in the background, returning the child process handle
fn start_daemon_background(paths: &DaemonPaths) -> Result<std::process::Child, ClientError> {
    let bbd_path = find_bbd_binary();

    let mut command = Command::new(&bbd_path);
    if let Some(config) = &paths.config_path {
        command.arg("--config").arg(config);
    }
    command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {}", bbd_path.display(), e)))
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop(paths: &DaemonPaths) -> Result<bool, ClientError> {
    let client = match DaemonClient::connect(paths) {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            cleanup_stale_pid(paths);
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let shutdown_result = client.shutdown().await;
    if matches!(shutdown_result, Err(ClientError::DaemonNotRunning)) {
        cleanup_stale_pid(paths);
        return Ok(false);
    }

    if let Some(pid) = read_daemon_pid(paths) {
        if shutdown_result.is_ok() {
            wait_for_exit(pid, timeout_exit()).await;
        }

        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    }

    cleanup_stale_pid(paths);
    Ok(true)
}

/// Wait for a process to exit
async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    false
}

/// Find the bbd binary
fn find_bbd_binary() -> PathBuf {
    // Explicit override (used by tests to ensure correct binary)
    if let Ok(path) = std::env::var("BB_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    // Check current executable's directory
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("bbd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    // Fall back to PATH lookup
    PathBuf::from("bbd")
}

/// Remove a PID file left behind by a daemon that is no longer running
fn cleanup_stale_pid(paths: &DaemonPaths) {
    let pid_path = paths.pid_path();
    if let Some(pid) = read_daemon_pid(paths) {
        if process_exists(pid) {
            return;
        }
    }
    if pid_path.exists() {
        let _ = std::fs::remove_file(&pid_path);
    }
}

/// Get the PID from the daemon PID file, if it exists
pub fn read_daemon_pid(paths: &DaemonPaths) -> Option<u32> {
    std::fs::read_to_string(paths.pid_path())
        .ok()
        .and_then(|content| content.trim().parse::<u32>().ok())
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    // Use kill -0 to check if process exists without sending a signal
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Force kill a daemon process
pub fn force_kill_daemon(pid: u32) -> bool {
    Command::new("kill")
        .args(["-9", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Read daemon log from the last startup marker, looking for errors.
pub fn read_startup_error(paths: &DaemonPaths) -> Option<String> {
    let content = std::fs::read_to_string(paths.log_path()).ok()?;
    parse_startup_error(&content)
}

fn parse_startup_error(log: &str) -> Option<String> {
    let start_pos = log.rfind(STARTUP_MARKER_PREFIX)?;

    let messages: Vec<String> = log[start_pos..]
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .filter_map(|line| line.split_once(": ").map(|(_, msg)| msg.to_string()))
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

/// Attach a startup error from the log, if one exists
fn wrap_with_startup_error(err: ClientError, paths: &DaemonPaths) -> ClientError {
    match read_startup_error(paths) {
        Some(msg) => ClientError::DaemonStartFailed(msg),
        None => err,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
