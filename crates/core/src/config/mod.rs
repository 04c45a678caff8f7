// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Player configuration
//!
//! Loaded from a TOML file. Every field has a default, so an empty file (or
//! no file at all) is a valid configuration.

mod renderer;

pub use renderer::RendererConfig;

use crate::asset::Asset;
use crate::health::BackoffPolicy;
use crate::session::SessionTimings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("could not determine state directory (set XDG_STATE_HOME or HOME)")]
    NoStateDir,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub schedule: ScheduleConfig,
    pub cache: CacheConfig,
    pub playback: PlaybackConfig,
    pub health: HealthConfig,
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// WAL, logs and lock file; defaults to the XDG state directory
    pub state_dir: Option<PathBuf>,
    /// Defaults to `<state_dir>/cache`
    pub cache_dir: Option<PathBuf>,
    /// Defaults to `/tmp/billboard/bbd.sock`
    pub socket_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Shown when nothing is eligible
    pub placeholder_uri: String,
    #[serde(with = "humantime_serde")]
    pub placeholder_duration: Duration,
    pub shuffle: bool,
    /// Completed passes between reshuffles
    pub reshuffle_every: u64,
    /// Consecutive failures before an asset is excluded
    pub failure_threshold: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            placeholder_uri: "/usr/share/billboard/loading.png".to_string(),
            placeholder_duration: Duration::from_secs(5),
            shuffle: false,
            reshuffle_every: 5,
            failure_threshold: 3,
        }
    }
}

impl ScheduleConfig {
    pub fn placeholder(&self) -> Asset {
        Asset::placeholder(self.placeholder_uri.clone(), self.placeholder_duration)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub budget_bytes: u64,
    /// Age after which a cached copy is revalidated
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    pub fetch_workers: usize,
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            budget_bytes: 2 * 1024 * 1024 * 1024,
            ttl: Duration::from_secs(60 * 60),
            fetch_workers: 2,
            fetch_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    #[serde(with = "humantime_serde")]
    pub prepare_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub ready_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub max_self_terminating: Duration,
    #[serde(with = "humantime_serde")]
    pub heartbeat_interval: Duration,
    pub splash_uri: Option<String>,
    #[serde(with = "humantime_serde")]
    pub splash_duration: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            prepare_timeout: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(10),
            max_self_terminating: Duration::from_secs(3 * 60 * 60),
            heartbeat_interval: Duration::from_secs(1),
            splash_uri: None,
            splash_duration: Duration::from_secs(60),
        }
    }
}

impl PlaybackConfig {
    pub fn timings(&self) -> SessionTimings {
        SessionTimings {
            prepare_timeout: self.prepare_timeout,
            ready_timeout: self.ready_timeout,
            max_self_terminating: self.max_self_terminating,
        }
    }

    /// Start-up splash, if configured
    pub fn splash(&self) -> Option<Asset> {
        self.splash_uri.as_ref().map(|uri| {
            Asset::new("splash", uri.clone(), crate::asset::Category::WebPage)
                .with_name("splash")
                .with_duration(self.splash_duration)
                .trusted()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthConfig {
    #[serde(with = "humantime_serde")]
    pub heartbeat_grace: Duration,
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub backoff_initial: Duration,
    #[serde(with = "humantime_serde")]
    pub backoff_max: Duration,
    #[serde(with = "humantime_serde")]
    pub restart_window: Duration,
    #[serde(with = "humantime_serde")]
    pub healthy_reset_after: Duration,
    #[serde(with = "humantime_serde")]
    pub fetch_error_window: Duration,
    /// Error ratio above which only cached content is scheduled
    pub fetch_error_threshold: f64,
    pub fetch_error_min_samples: usize,
    /// Touched on every healthy check, for a hardware watchdog
    pub watchdog_file: Option<PathBuf>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            heartbeat_grace: Duration::from_secs(45),
            check_interval: Duration::from_secs(1),
            backoff_initial: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            restart_window: Duration::from_secs(120),
            healthy_reset_after: Duration::from_secs(300),
            fetch_error_window: Duration::from_secs(300),
            fetch_error_threshold: 0.5,
            fetch_error_min_samples: 4,
            watchdog_file: None,
        }
    }
}

impl HealthConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: self.backoff_initial,
            max: self.backoff_max,
            restart_window: self.restart_window,
            healthy_reset_after: self.healthy_reset_after,
        }
    }
}

impl Config {
    /// Parse a TOML document and validate it
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        let health = &self.health;
        let playback = &self.playback;

        if health.heartbeat_grace <= playback.prepare_timeout {
            return invalid(format!(
                "health.heartbeat_grace ({:?}) must exceed playback.prepare_timeout ({:?})",
                health.heartbeat_grace, playback.prepare_timeout
            ));
        }
        if playback.heartbeat_interval.is_zero()
            || playback.heartbeat_interval >= health.heartbeat_grace
        {
            return invalid(
                "playback.heartbeat_interval must be non-zero and below health.heartbeat_grace"
                    .to_string(),
            );
        }
        if health.check_interval.is_zero() {
            return invalid("health.check_interval must be non-zero".to_string());
        }
        if health.backoff_initial > health.backoff_max {
            return invalid("health.backoff_initial must not exceed health.backoff_max".to_string());
        }
        if !(health.fetch_error_threshold > 0.0 && health.fetch_error_threshold <= 1.0) {
            return invalid("health.fetch_error_threshold must be in (0, 1]".to_string());
        }
        if self.cache.fetch_workers == 0 {
            return invalid("cache.fetch_workers must be at least 1".to_string());
        }
        if self.schedule.failure_threshold == 0 {
            return invalid("schedule.failure_threshold must be at least 1".to_string());
        }
        if self.schedule.placeholder_duration.is_zero() {
            return invalid("schedule.placeholder_duration must be non-zero".to_string());
        }
        if self.schedule.reshuffle_every == 0 {
            return invalid("schedule.reshuffle_every must be at least 1".to_string());
        }
        self.renderer.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }

    pub fn state_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.paths.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_state_dir(),
        }
    }

    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.paths.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.state_dir()?.join("cache")),
        }
    }

    /// `BB_SOCKET_PATH` wins over the file, which wins over the default
    pub fn socket_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var("BB_SOCKET_PATH") {
            return PathBuf::from(path);
        }
        self.paths
            .socket_path
            .clone()
            .unwrap_or_else(default_socket_path)
    }
}

/// `$XDG_STATE_HOME/billboard`, else `~/.local/state/billboard`
pub fn default_state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("billboard"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/billboard"))
}

/// Kept under /tmp so the path stays short (macOS SUN_LEN = 104)
pub fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/billboard/bbd.sock")
}

/// `BB_CONFIG`, else `$XDG_CONFIG_HOME/billboard/billboard.toml`,
/// else `~/.config/billboard/billboard.toml`
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("BB_CONFIG") {
        return Some(PathBuf::from(path));
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("billboard/billboard.toml"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/billboard/billboard.toml"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
