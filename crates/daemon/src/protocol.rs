// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between `bb` and `bbd`
//!
//! Each connection carries one request and one response. A frame is a
//! big-endian `u32` length followed by that many bytes of JSON.

use bb_core::{Asset, AssetId, HealthSnapshot, Playlist, SessionSnapshot};
use bb_engine::{CacheEntry, Control, FailureRecord};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Bumped when a request or response shape changes incompatibly
pub const PROTOCOL_VERSION: &str = "1";

/// Per-frame read/write bound on the daemon side
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames above this are rejected before allocation
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message of {0} bytes exceeds the frame limit")]
    TooLarge(usize),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Ping,
    Hello {
        version: String,
    },
    Status,
    Query {
        query: Query,
    },
    /// Insert or replace; an empty id asks the daemon to generate one
    UpsertAsset {
        asset: Box<Asset>,
    },
    RemoveAsset {
        id: AssetId,
    },
    Control {
        control: Control,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Query {
    ListAssets,
    GetAsset { id: AssetId },
    Playlist,
    Session,
    Health,
    Failures,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Hello {
        version: String,
    },
    Status(Box<StatusSummary>),
    Assets {
        epoch: u64,
        assets: Vec<Asset>,
    },
    Asset {
        asset: Box<Asset>,
    },
    Playlist {
        playlist: Box<Playlist>,
    },
    Session {
        session: Option<Box<SessionSnapshot>>,
    },
    Health {
        health: HealthSnapshot,
    },
    Failures {
        failures: Vec<FailureRecord>,
    },
    Cache {
        entries: Vec<CacheEntry>,
    },
    /// A repository mutation succeeded; `epoch` is the change marker
    Mutated {
        epoch: u64,
        id: AssetId,
    },
    Ok,
    Error {
        message: String,
    },
    ShuttingDown,
}

/// Overview returned by `Status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub uptime_secs: u64,
    pub repo_epoch: u64,
    pub playlist_epoch: u64,
    pub playlist_entries: usize,
    pub placeholder: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_asset: Option<AssetId>,
    pub paused: bool,
    pub degraded: bool,
    pub restarts: u64,
}

/// Serialize to JSON without framing
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(msg)?)
}

pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write one length-prefixed frame
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(data.len()));
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len = [0u8; 4];
    match reader.read_exact(&mut len).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
