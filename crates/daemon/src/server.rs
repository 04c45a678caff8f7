// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use bb_daemon::protocol::{
    self, Query, Request, Response, StatusSummary, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};
use bb_engine::EngineError;
use tokio::net::UnixStream;
use tracing::{debug, error, info};

use crate::lifecycle::DaemonState;

/// Handle a single client connection
pub async fn handle_connection(
    daemon: &mut DaemonState,
    stream: UnixStream,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    let response = handle_request(daemon, request).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
pub async fn handle_request(daemon: &mut DaemonState, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => {
            let runtime = &daemon.runtime;
            let playlist = runtime.playlist();
            let health = runtime.health();
            Response::Status(Box::new(StatusSummary {
                uptime_secs: daemon.start_time.elapsed().as_secs(),
                repo_epoch: runtime.repo_epoch(),
                playlist_epoch: playlist.epoch,
                playlist_entries: playlist.len(),
                placeholder: playlist.is_placeholder(),
                current_asset: runtime.current_asset(),
                paused: runtime.is_paused(),
                degraded: health.degraded,
                restarts: health.restarts,
            }))
        }

        Request::Query { query } => handle_query(daemon, query),

        Request::UpsertAsset { asset } => match daemon.runtime.upsert_asset(*asset) {
            Ok((epoch, id)) => {
                info!(asset_id = %id, epoch, "asset stored");
                Response::Mutated { epoch, id }
            }
            Err(e) => engine_error(daemon, e),
        },

        Request::RemoveAsset { id } => match daemon.runtime.remove_asset(&id) {
            Ok(epoch) => {
                info!(asset_id = %id, epoch, "asset removed");
                Response::Mutated { epoch, id }
            }
            Err(e) => engine_error(daemon, e),
        },

        Request::Control { control } => {
            info!(?control, "playback control");
            match daemon.runtime.control(control).await {
                Ok(()) => Response::Ok,
                Err(e) => engine_error(daemon, e),
            }
        }

        Request::Shutdown => {
            daemon.shutdown_requested = true;
            Response::ShuttingDown
        }
    }
}

/// Handle query requests
fn handle_query(daemon: &DaemonState, query: Query) -> Response {
    let runtime = &daemon.runtime;
    match query {
        Query::ListAssets => {
            let snapshot = runtime.list_assets();
            Response::Assets {
                epoch: snapshot.epoch,
                assets: snapshot.assets,
            }
        }

        Query::GetAsset { id } => match runtime.get_asset(&id) {
            Ok(asset) => Response::Asset {
                asset: Box::new(asset),
            },
            Err(e) => error_response(e),
        },

        Query::Playlist => Response::Playlist {
            playlist: Box::new(runtime.playlist().as_ref().clone()),
        },

        Query::Session => Response::Session {
            session: runtime.session().map(Box::new),
        },

        Query::Health => Response::Health {
            health: runtime.health(),
        },

        Query::Failures => Response::Failures {
            failures: runtime.failures(),
        },

        Query::Cache => Response::Cache {
            entries: runtime.cache_entries(),
        },
    }
}

/// Report `e` to the client; a fatal error also stops the daemon
fn engine_error(daemon: &mut DaemonState, e: EngineError) -> Response {
    if e.is_fatal() {
        error!(error = %e, "unrecoverable engine error, shutting down");
        daemon.shutdown_requested = true;
    }
    error_response(e)
}

fn error_response(e: impl std::fmt::Display) -> Response {
    Response::Error {
        message: e.to_string(),
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
